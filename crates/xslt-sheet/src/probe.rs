//! Probe placement planner.
//!
//! Rewrites a parsed stylesheet so that every executable instruction reports
//! its source line through a callback before it runs, without producing a
//! document the grammar would reject. Placement follows three special rules,
//! applied in this order: branch arms receive their probe as a leading child
//! (never as a sibling of the branch container), repetition constructs keep
//! ordering-sensitive children first and gain an iteration-position trace,
//! and named scopes bracket their body with entry/exit markers while keeping
//! declarations ahead of everything injected.

use std::collections::BTreeSet;

use smol_str::SmolStr;

use crate::dialect::{
    classify, is_stylesheet_root, DialectRules, ProbeKind, XslKind, PROBE_NAMESPACE, PROBE_PREFIX,
};
use crate::dom::{NodeId, QName, SheetDocument, SheetNode};

/// Planner failure.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("document root is not a stylesheet or transform element")]
    NotAStylesheet,
}

/// Summary of one planning pass.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    /// Number of probes inserted by this pass.
    pub inserted: usize,
    /// Source lines that now carry a break or scope-entry probe.
    pub instrumented_lines: BTreeSet<u32>,
}

impl PlanReport {
    /// Whether a breakpoint on `line` can ever be hit.
    #[must_use]
    pub fn covers_line(&self, line: u32) -> bool {
        self.instrumented_lines.contains(&line)
    }
}

/// Rewrite `doc` in place, injecting probes according to `rules`.
///
/// The pass is idempotent: each probe carries an identity marker, at most
/// one probe per (line, kind) exists within a parent, and a second run over
/// an already-instrumented document inserts nothing new. Elements without
/// source line information are skipped silently.
pub fn plan(doc: &mut SheetDocument, rules: &DialectRules) -> Result<PlanReport, PlanError> {
    if !is_stylesheet_root(doc) {
        return Err(PlanError::NotAStylesheet);
    }

    let root = doc.root();
    let xsl_prefix = doc.element(root).name.prefix.clone();
    if !doc.element(root).declares_prefix(PROBE_PREFIX) {
        doc.element_mut(root)
            .set_attribute(QName::new(Some("xmlns"), PROBE_PREFIX), PROBE_NAMESPACE);
    }

    let mut planner = Planner {
        rules,
        xsl_prefix,
        report: PlanReport::default(),
    };

    let top_level: Vec<NodeId> = doc.child_elements(root).collect();
    for id in top_level {
        let kind = classify(doc.element(id));
        if matches!(kind, XslKind::Template | XslKind::Function) {
            planner.instrument_element(doc, id, kind);
        }
    }

    tracing::debug!(
        probes = planner.report.inserted,
        lines = planner.report.instrumented_lines.len(),
        "instrumentation planned"
    );
    Ok(planner.report)
}

struct Planner<'r> {
    rules: &'r DialectRules,
    xsl_prefix: Option<SmolStr>,
    report: PlanReport,
}

impl Planner<'_> {
    fn instrument_element(&mut self, doc: &mut SheetDocument, id: NodeId, kind: XslKind) {
        if self.rules.excludes_subtree(kind) {
            return;
        }
        self.rebuild_children(doc, id, kind);
    }

    /// Rebuild the child list of `parent`: keep the ordering-sensitive
    /// prefix, insert the parent's own header probes, inject sibling probes
    /// for eligible children, recurse, then cluster declaration traces after
    /// the last declaration and close named scopes with an exit marker.
    fn rebuild_children(&mut self, doc: &mut SheetDocument, parent: NodeId, parent_kind: XslKind) {
        let old = doc.element(parent).children.clone();
        let fixed = self.rules.has_fixed_content(parent_kind);

        // Existing probe markers among direct children; one probe per
        // (line, kind) within a parent keeps repeated planning idempotent.
        let mut markers: BTreeSet<String> = old
            .iter()
            .filter_map(|id| doc.node(*id).as_element())
            .filter_map(|element| self.rules.marker_of(element))
            .collect();

        let prefix_end = self.ordered_prefix_end(doc, &old, parent_kind);
        let mut rebuilt: Vec<NodeId> = old[..prefix_end].to_vec();

        self.insert_header_probes(doc, parent, parent_kind, &mut markers, &mut rebuilt);

        for &child in &old[prefix_end..] {
            let info = doc
                .node(child)
                .as_element()
                .map(|element| (classify(element), element.line, self.rules.is_probe(element)));
            if let Some((child_kind, line, is_probe)) = info {
                if !is_probe {
                    if let Some(line) = line {
                        let wants_sibling_probe = self.rules.is_candidate(child_kind)
                            && !self.rules.hosts_leading_probe(child_kind)
                            && !fixed;
                        if wants_sibling_probe {
                            if let Some(probe) =
                                self.make_probe(doc, &mut markers, ProbeKind::Break, line, "")
                            {
                                rebuilt.push(probe);
                            }
                            self.report.instrumented_lines.insert(line);
                        }
                    }
                    self.instrument_element(doc, child, child_kind);
                }
            }
            rebuilt.push(child);
        }

        doc.element_mut(parent).children = rebuilt;

        if !fixed {
            self.insert_declaration_traces(doc, parent, &mut markers);
        }

        if self.is_named_scope(doc, parent, parent_kind) {
            self.append_scope_exit(doc, parent, &mut markers);
        }
    }

    /// Index one past the ordering-sensitive leading run: sort keys, leading
    /// attribute/namespace constructors, and (for scopes) the declaration
    /// block that must stay ahead of any injected probe.
    fn ordered_prefix_end(
        &self,
        doc: &SheetDocument,
        children: &[NodeId],
        parent_kind: XslKind,
    ) -> usize {
        let scope = matches!(parent_kind, XslKind::Template | XslKind::Function);
        let mut end = 0;
        for (index, id) in children.iter().enumerate() {
            match doc.node(*id) {
                SheetNode::Element(element) => {
                    let kind = classify(element);
                    let ordered = self.rules.is_ordered_prefix(kind)
                        || (scope && matches!(kind, XslKind::Variable));
                    if ordered {
                        end = index + 1;
                    } else {
                        break;
                    }
                }
                // Whitespace and comments do not end the declaration run.
                SheetNode::Text(_) | SheetNode::Comment(_) => {}
                SheetNode::ProcessingInstruction { .. } => break,
            }
        }
        end
    }

    fn insert_header_probes(
        &mut self,
        doc: &mut SheetDocument,
        parent: NodeId,
        parent_kind: XslKind,
        markers: &mut BTreeSet<String>,
        rebuilt: &mut Vec<NodeId>,
    ) {
        let named_scope = self.is_named_scope(doc, parent, parent_kind);
        let header_eligible = named_scope
            || matches!(parent_kind, XslKind::Template)
            || (self.rules.is_candidate(parent_kind)
                && self.rules.hosts_leading_probe(parent_kind));
        if !header_eligible {
            return;
        }
        let Some(line) = doc.element(parent).line else {
            return;
        };

        let kind = if named_scope {
            ProbeKind::ScopeEntry
        } else {
            ProbeKind::Break
        };
        if let Some(probe) = self.make_probe(doc, markers, kind, line, "") {
            rebuilt.push(probe);
        }
        self.report.instrumented_lines.insert(line);

        if self.rules.is_repetition(parent_kind) {
            if let Some(probe) = self.make_probe(doc, markers, ProbeKind::Position, line, "") {
                rebuilt.push(probe);
            }
        }
    }

    /// Cluster one trace probe per local declaration after the last
    /// declaration in this scope, never between two declarations.
    fn insert_declaration_traces(
        &mut self,
        doc: &mut SheetDocument,
        parent: NodeId,
        markers: &mut BTreeSet<String>,
    ) {
        let children = doc.element(parent).children.clone();
        let mut names: Vec<SmolStr> = Vec::new();
        let mut last_declaration = None;
        for (index, id) in children.iter().enumerate() {
            if let Some(element) = doc.node(*id).as_element() {
                if matches!(classify(element), XslKind::Param | XslKind::Variable) {
                    if let Some(name) = element.attribute("name") {
                        names.push(SmolStr::new(name));
                    }
                    last_declaration = Some(index);
                }
            }
        }
        let Some(last) = last_declaration else {
            return;
        };

        let mut insert_at = last + 1;
        for name in names {
            if let Some(probe) = self.make_probe(doc, markers, ProbeKind::TraceVar, 0, &name) {
                doc.insert_child(parent, insert_at, probe);
                insert_at += 1;
            }
        }
    }

    fn append_scope_exit(
        &mut self,
        doc: &mut SheetDocument,
        parent: NodeId,
        markers: &mut BTreeSet<String>,
    ) {
        let Some(line) = doc.element(parent).line else {
            return;
        };
        if let Some(probe) = self.make_probe(doc, markers, ProbeKind::ScopeExit, line, "") {
            doc.append_child(parent, probe);
        }
    }

    fn is_named_scope(&self, doc: &SheetDocument, id: NodeId, kind: XslKind) -> bool {
        match kind {
            XslKind::Function => true,
            XslKind::Template => doc.element(id).attribute("name").is_some(),
            _ => false,
        }
    }

    /// Synthesize a probe node unless an identical marker already exists in
    /// this parent. Returns the new node id when one was created.
    fn make_probe(
        &mut self,
        doc: &mut SheetDocument,
        markers: &mut BTreeSet<String>,
        kind: ProbeKind,
        line: u32,
        name: &str,
    ) -> Option<NodeId> {
        let marker = match kind {
            ProbeKind::Break => format!("break:{line}"),
            ProbeKind::ScopeEntry => format!("enter:{line}"),
            ProbeKind::ScopeExit => format!("leave:{line}"),
            ProbeKind::Position => format!("position:{line}"),
            ProbeKind::TraceVar => format!("trace:{name}"),
        };
        if !markers.insert(marker) {
            return None;
        }
        let element = self
            .rules
            .probe_element(self.xsl_prefix.as_deref(), kind, line, name);
        self.report.inserted += 1;
        Some(doc.push_node(SheetNode::Element(element)))
    }
}
