//! Structural rules for the supported stylesheet grammar versions.

use crate::dom::{Element, NodeId, QName, SheetDocument};

/// Namespace of the transformation vocabulary.
pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

/// Namespace the injected debug callbacks resolve against.
pub const PROBE_NAMESPACE: &str = "urn:xslt-debug:probe";

/// Prefix bound to [`PROBE_NAMESPACE`] in rewritten documents.
pub const PROBE_PREFIX: &str = "dbg";

/// Grammar version a set of rules targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// The 1.0 grammar: permissive content models, value-producing probes.
    V1,
    /// The 3.0 grammar: restrictive content models, marker-tagged probes.
    V3,
}

/// Classified element kinds the planner reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XslKind {
    Stylesheet,
    Template,
    Function,
    Param,
    Variable,
    Import,
    Include,
    Output,
    Key,
    DecimalFormat,
    AttributeSet,
    NamespaceAlias,
    StripSpace,
    PreserveSpace,
    CharacterMap,
    Mode,
    Accumulator,
    AccumulatorRule,
    ApplyTemplates,
    ApplyImports,
    NextMatch,
    CallTemplate,
    WithParam,
    Sort,
    ForEach,
    ForEachGroup,
    Iterate,
    NextIteration,
    IterateBreak,
    OnCompletion,
    Choose,
    When,
    Otherwise,
    If,
    ValueOf,
    Sequence,
    TextCtor,
    Message,
    CommentCtor,
    PiCtor,
    AttributeCtor,
    NamespaceCtor,
    ElementCtor,
    Copy,
    CopyOf,
    Number,
    ResultDocument,
    Try,
    Catch,
    Merge,
    MergeSource,
    MergeAction,
    MergeKey,
    AnalyzeString,
    MatchingSubstring,
    NonMatchingSubstring,
    Fallback,
    /// Element outside the transformation namespace inside a template body.
    LiteralResult,
    /// Namespaced like an instruction but not recognized.
    Unknown,
}

/// Classify an element by namespace and local name.
#[must_use]
pub fn classify(element: &Element) -> XslKind {
    if element.namespace.as_deref() != Some(XSLT_NAMESPACE) {
        return XslKind::LiteralResult;
    }
    match element.name.local.as_str() {
        "stylesheet" | "transform" => XslKind::Stylesheet,
        "template" => XslKind::Template,
        "function" => XslKind::Function,
        "param" => XslKind::Param,
        "variable" => XslKind::Variable,
        "import" => XslKind::Import,
        "include" => XslKind::Include,
        "output" => XslKind::Output,
        "key" => XslKind::Key,
        "decimal-format" => XslKind::DecimalFormat,
        "attribute-set" => XslKind::AttributeSet,
        "namespace-alias" => XslKind::NamespaceAlias,
        "strip-space" => XslKind::StripSpace,
        "preserve-space" => XslKind::PreserveSpace,
        "character-map" => XslKind::CharacterMap,
        "mode" => XslKind::Mode,
        "accumulator" => XslKind::Accumulator,
        "accumulator-rule" => XslKind::AccumulatorRule,
        "apply-templates" => XslKind::ApplyTemplates,
        "apply-imports" => XslKind::ApplyImports,
        "next-match" => XslKind::NextMatch,
        "call-template" => XslKind::CallTemplate,
        "with-param" => XslKind::WithParam,
        "sort" => XslKind::Sort,
        "for-each" => XslKind::ForEach,
        "for-each-group" => XslKind::ForEachGroup,
        "iterate" => XslKind::Iterate,
        "next-iteration" => XslKind::NextIteration,
        "break" => XslKind::IterateBreak,
        "on-completion" => XslKind::OnCompletion,
        "choose" => XslKind::Choose,
        "when" => XslKind::When,
        "otherwise" => XslKind::Otherwise,
        "if" => XslKind::If,
        "value-of" => XslKind::ValueOf,
        "sequence" => XslKind::Sequence,
        "text" => XslKind::TextCtor,
        "message" => XslKind::Message,
        "comment" => XslKind::CommentCtor,
        "processing-instruction" => XslKind::PiCtor,
        "attribute" => XslKind::AttributeCtor,
        "namespace" => XslKind::NamespaceCtor,
        "element" => XslKind::ElementCtor,
        "copy" => XslKind::Copy,
        "copy-of" => XslKind::CopyOf,
        "number" => XslKind::Number,
        "result-document" => XslKind::ResultDocument,
        "try" => XslKind::Try,
        "catch" => XslKind::Catch,
        "merge" => XslKind::Merge,
        "merge-source" => XslKind::MergeSource,
        "merge-action" => XslKind::MergeAction,
        "merge-key" => XslKind::MergeKey,
        "analyze-string" => XslKind::AnalyzeString,
        "matching-substring" => XslKind::MatchingSubstring,
        "non-matching-substring" => XslKind::NonMatchingSubstring,
        "fallback" => XslKind::Fallback,
        _ => XslKind::Unknown,
    }
}

/// The purpose a synthesized probe serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Plain break probe reporting a line and the current node.
    Break,
    /// Entry marker for a named template or function body.
    ScopeEntry,
    /// Exit marker appended as the last child of a named scope.
    ScopeExit,
    /// 1-based iteration position inside a repetition construct.
    Position,
    /// Name/value trace for a local declaration.
    TraceVar,
}

impl ProbeKind {
    fn function(self) -> &'static str {
        match self {
            ProbeKind::Break => "break",
            ProbeKind::ScopeEntry => "enter",
            ProbeKind::ScopeExit => "leave",
            ProbeKind::Position => "position",
            ProbeKind::TraceVar => "trace",
        }
    }
}

/// Structural rules for one grammar version.
#[derive(Debug, Clone, Copy)]
pub struct DialectRules {
    pub dialect: Dialect,
    /// Containers whose entire subtree is off limits for instrumentation.
    excluded_subtrees: &'static [XslKind],
    /// Containers with a fixed child schema: no sibling injection inside.
    fixed_content: &'static [XslKind],
}

impl DialectRules {
    /// Rules for the 1.0 grammar.
    #[must_use]
    pub fn v1() -> Self {
        Self {
            dialect: Dialect::V1,
            excluded_subtrees: &[
                XslKind::AttributeCtor,
                XslKind::CommentCtor,
                XslKind::PiCtor,
                XslKind::NamespaceCtor,
                XslKind::Message,
            ],
            fixed_content: &[
                XslKind::Choose,
                XslKind::ApplyTemplates,
                XslKind::ApplyImports,
                XslKind::CallTemplate,
                XslKind::Unknown,
            ],
        }
    }

    /// Rules for the 3.0 grammar. The stricter content models exclude
    /// iteration, accumulator, grouping, try/catch, and merge subtrees
    /// entirely, and more containers reject injected siblings.
    #[must_use]
    pub fn v3() -> Self {
        Self {
            dialect: Dialect::V3,
            excluded_subtrees: &[
                XslKind::AttributeCtor,
                XslKind::CommentCtor,
                XslKind::PiCtor,
                XslKind::NamespaceCtor,
                XslKind::Message,
                XslKind::Iterate,
                XslKind::Accumulator,
                XslKind::AccumulatorRule,
                XslKind::ForEachGroup,
                XslKind::Try,
                XslKind::Merge,
            ],
            fixed_content: &[
                XslKind::Choose,
                XslKind::ApplyTemplates,
                XslKind::ApplyImports,
                XslKind::CallTemplate,
                XslKind::NextMatch,
                XslKind::AnalyzeString,
                XslKind::Merge,
                XslKind::MergeSource,
                XslKind::Unknown,
            ],
        }
    }

    #[must_use]
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::V1 => Self::v1(),
            Dialect::V3 => Self::v3(),
        }
    }

    /// Whether instrumentation must skip the whole subtree under `kind`.
    #[must_use]
    pub fn excludes_subtree(&self, kind: XslKind) -> bool {
        self.excluded_subtrees.contains(&kind)
    }

    /// Whether `kind` rejects injected children that are not in its schema.
    #[must_use]
    pub fn has_fixed_content(&self, kind: XslKind) -> bool {
        self.fixed_content.contains(&kind)
    }

    /// Whether a probe may be injected as the leading child of `kind`.
    #[must_use]
    pub fn hosts_leading_probe(&self, kind: XslKind) -> bool {
        matches!(
            kind,
            XslKind::Template
                | XslKind::Function
                | XslKind::ForEach
                | XslKind::ForEachGroup
                | XslKind::Iterate
                | XslKind::If
                | XslKind::When
                | XslKind::Otherwise
                | XslKind::Catch
                | XslKind::MatchingSubstring
                | XslKind::NonMatchingSubstring
                | XslKind::OnCompletion
                | XslKind::MergeAction
                | XslKind::ElementCtor
                | XslKind::Copy
                | XslKind::ResultDocument
                | XslKind::LiteralResult
        ) && !self.excludes_subtree(kind)
    }

    /// Whether `kind` is a repetition construct with positional context.
    /// Grouping and iteration constructs are excluded subtrees in 3.0, so
    /// both grammars share the same positional construct.
    #[must_use]
    pub fn is_repetition(&self, kind: XslKind) -> bool {
        matches!(kind, XslKind::ForEach)
    }

    /// Whether `kind` is an executable instruction eligible for a probe.
    /// Declarations, branch containers, and message/trace nodes are not.
    #[must_use]
    pub fn is_candidate(&self, kind: XslKind) -> bool {
        !matches!(
            kind,
            XslKind::Stylesheet
                | XslKind::Template
                | XslKind::Function
                | XslKind::Param
                | XslKind::Variable
                | XslKind::Import
                | XslKind::Include
                | XslKind::Output
                | XslKind::Key
                | XslKind::DecimalFormat
                | XslKind::AttributeSet
                | XslKind::NamespaceAlias
                | XslKind::StripSpace
                | XslKind::PreserveSpace
                | XslKind::CharacterMap
                | XslKind::Mode
                | XslKind::Accumulator
                | XslKind::AccumulatorRule
                | XslKind::Choose
                | XslKind::Sort
                | XslKind::WithParam
                | XslKind::MergeKey
                | XslKind::Message
                | XslKind::Fallback
                | XslKind::Unknown
        )
    }

    /// Ordering-sensitive children that must stay ahead of any probe.
    #[must_use]
    pub fn is_ordered_prefix(&self, kind: XslKind) -> bool {
        matches!(
            kind,
            XslKind::Sort | XslKind::Param | XslKind::AttributeCtor | XslKind::NamespaceCtor
        )
    }

    /// Build the dialect-shaped probe element. `xsl_prefix` is the prefix
    /// the document binds to the transformation namespace, or `None` when
    /// the namespace is the default one.
    #[must_use]
    pub fn probe_element(
        &self,
        xsl_prefix: Option<&str>,
        kind: ProbeKind,
        line: u32,
        name: &str,
    ) -> Element {
        let select = match kind {
            ProbeKind::Break | ProbeKind::ScopeEntry | ProbeKind::ScopeExit => {
                format!("{PROBE_PREFIX}:{}({line}, .)", kind.function())
            }
            ProbeKind::Position => {
                format!("{PROBE_PREFIX}:position({line}, position())")
            }
            ProbeKind::TraceVar => format!("{PROBE_PREFIX}:trace('{name}', ${name})"),
        };
        let instruction = match self.dialect {
            Dialect::V1 => "value-of",
            Dialect::V3 => "sequence",
        };
        let mut element = Element {
            name: QName::new(xsl_prefix, instruction),
            namespace: Some(XSLT_NAMESPACE.into()),
            attributes: Vec::new(),
            children: Vec::new(),
            line: None,
        };
        element.set_attribute(QName::local("select"), select);
        if self.dialect == Dialect::V3 {
            element.set_attribute(
                QName::new(Some(PROBE_PREFIX), "probe"),
                probe_marker(kind, line, name),
            );
        }
        element
    }

    /// The identity marker a probe of this shape carries, used to guard
    /// against duplicate insertion.
    #[must_use]
    pub fn marker_of(&self, element: &Element) -> Option<String> {
        if let Some(marker) = element.prefixed_attribute(PROBE_PREFIX, "probe") {
            return Some(marker.to_string());
        }
        let select = element.attribute("select")?;
        let call = select.strip_prefix(&format!("{PROBE_PREFIX}:"))?;
        let function = call.split('(').next()?;
        let kind = match function {
            "break" => ProbeKind::Break,
            "enter" => ProbeKind::ScopeEntry,
            "leave" => ProbeKind::ScopeExit,
            "position" => ProbeKind::Position,
            "trace" => ProbeKind::TraceVar,
            _ => return None,
        };
        if kind == ProbeKind::TraceVar {
            let name = call.split('\'').nth(1).unwrap_or_default();
            return Some(probe_marker(kind, 0, name));
        }
        let line = call
            .split('(')
            .nth(1)?
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok()?;
        Some(probe_marker(kind, line, ""))
    }

    /// Whether `element` is a probe synthesized by this planner.
    #[must_use]
    pub fn is_probe(&self, element: &Element) -> bool {
        self.marker_of(element).is_some()
    }
}

fn probe_marker(kind: ProbeKind, line: u32, name: &str) -> String {
    match kind {
        ProbeKind::TraceVar => format!("trace:{name}"),
        _ => format!("{}:{line}", kind.function()),
    }
}

/// The `version` attribute of the stylesheet root, if present.
#[must_use]
pub fn stylesheet_version(doc: &SheetDocument) -> Option<&str> {
    let root = doc.element(doc.root());
    (classify(root) == XslKind::Stylesheet)
        .then(|| root.attribute("version"))
        .flatten()
}

/// Whether the document root is a stylesheet/transform element.
#[must_use]
pub fn is_stylesheet_root(doc: &SheetDocument) -> bool {
    classify(doc.element(doc.root())) == XslKind::Stylesheet
}

/// First top-level embedded-script block (vendor extension elements named
/// `script` outside the transformation namespace), with its line.
#[must_use]
pub fn find_embedded_script(doc: &SheetDocument) -> Option<(NodeId, u32)> {
    for id in doc.child_elements(doc.root()) {
        let element = doc.element(id);
        if element.namespace.as_deref() != Some(XSLT_NAMESPACE)
            && element.name.local == "script"
        {
            return Some((id, element.line.unwrap_or(0)));
        }
    }
    None
}
