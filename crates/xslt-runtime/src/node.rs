//! Engine-independent node snapshots.
//!
//! The two engines keep their current node in incompatible native trees, so
//! the adapter converts through a serialize → reparse → re-locate step: the
//! engine reports an absolute position, and the position is re-resolved
//! against a fresh parse of the same input document. Conversion failure
//! degrades to a shallow snapshot, never into a run abort.

use smol_str::SmolStr;

use xslt_sheet::{parse_document, NodeId, SheetDocument, SheetNode};

use crate::engine::EngineNode;

/// Clonable, lock-free snapshot of a document position.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    pub name: Option<SmolStr>,
    /// Node kind keyword: `element`, `attribute`, `text`, `document`.
    pub kind: SmolStr,
    pub value: String,
    /// Absolute position the snapshot was resolved from, when known.
    pub path: Option<String>,
    pub attributes: Vec<(SmolStr, String)>,
    pub children: Vec<NodeHandle>,
}

impl NodeHandle {
    /// Re-locate `node` inside `document_text` and capture its subtree.
    /// Falls back to a shallow, childless snapshot when the path does not
    /// resolve or the document does not parse.
    #[must_use]
    pub fn rehome(node: &dyn EngineNode, document_text: &str) -> Self {
        let path = node.absolute_path();
        if let Some(path) = path.as_deref() {
            if let Ok(doc) = parse_document(document_text) {
                if let Some(id) = resolve_path(&doc, path) {
                    let mut handle = snapshot(&doc, id);
                    handle.path = Some(path.to_string());
                    return handle;
                }
            }
            tracing::debug!(path, "node path did not re-resolve; using shallow snapshot");
        }
        Self::shallow(node)
    }

    /// Snapshot carrying only what the engine exposes directly.
    #[must_use]
    pub fn shallow(node: &dyn EngineNode) -> Self {
        Self {
            name: node.name().map(SmolStr::new),
            kind: SmolStr::new(node.node_kind()),
            value: node.string_value(),
            path: node.absolute_path(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Evaluate a minimal relative path against this snapshot: `.`,
    /// `name()`, `text()`, `@attr`, and `/`-separated child-name steps.
    /// Anything unsupported yields `None` rather than an error.
    #[must_use]
    pub fn select(&self, expression: &str) -> Option<String> {
        let expression = expression.trim();
        match expression {
            "." => return Some(self.value.clone()),
            "name()" => return self.name.as_ref().map(ToString::to_string),
            "text()" => {
                return Some(
                    self.children
                        .iter()
                        .filter(|child| child.kind == "text")
                        .map(|child| child.value.as_str())
                        .collect(),
                );
            }
            _ => {}
        }
        if let Some(attr) = expression.strip_prefix('@') {
            return self
                .attributes
                .iter()
                .find(|(name, _)| name == attr)
                .map(|(_, value)| value.clone());
        }

        let mut current = self;
        for step in expression.split('/') {
            if step.is_empty() {
                return None;
            }
            if let Some(attr) = step.strip_prefix('@') {
                return current
                    .attributes
                    .iter()
                    .find(|(name, _)| name == attr)
                    .map(|(_, value)| value.clone());
            }
            let (name, index) = parse_step(step)?;
            current = current
                .children
                .iter()
                .filter(|child| child.name.as_deref() == Some(name))
                .nth(index.saturating_sub(1))?;
        }
        Some(current.value.clone())
    }
}

fn snapshot(doc: &SheetDocument, id: NodeId) -> NodeHandle {
    match doc.node(id) {
        SheetNode::Element(element) => NodeHandle {
            name: Some(SmolStr::new(element.name.to_string())),
            kind: SmolStr::new("element"),
            value: doc.text_content(id),
            path: None,
            attributes: element
                .attributes
                .iter()
                .map(|attr| (SmolStr::new(attr.name.to_string()), attr.value.clone()))
                .collect(),
            children: element
                .children
                .iter()
                .map(|child| snapshot(doc, *child))
                .collect(),
        },
        SheetNode::Text(text) => NodeHandle {
            name: None,
            kind: SmolStr::new("text"),
            value: text.clone(),
            path: None,
            attributes: Vec::new(),
            children: Vec::new(),
        },
        SheetNode::Comment(text) => NodeHandle {
            name: None,
            kind: SmolStr::new("comment"),
            value: text.clone(),
            path: None,
            attributes: Vec::new(),
            children: Vec::new(),
        },
        SheetNode::ProcessingInstruction { target, data } => NodeHandle {
            name: Some(target.clone()),
            kind: SmolStr::new("processing-instruction"),
            value: data.clone(),
            path: None,
            attributes: Vec::new(),
            children: Vec::new(),
        },
    }
}

/// Resolve `/name[i]/name[i]/...` against the parsed document. The leading
/// step must match the root element.
fn resolve_path(doc: &SheetDocument, path: &str) -> Option<NodeId> {
    let mut steps = path.strip_prefix('/')?.split('/');
    let first = steps.next()?;
    let (name, index) = parse_step(first)?;
    let root = doc.root();
    if index != 1 || doc.element(root).name.local != name {
        return None;
    }

    let mut current = root;
    for step in steps {
        let (name, index) = parse_step(step)?;
        current = doc
            .child_elements(current)
            .filter(|id| doc.element(*id).name.local == name)
            .nth(index.saturating_sub(1))?;
    }
    Some(current)
}

/// Split `name[3]` into `("name", 3)`; a bare `name` means position 1.
fn parse_step(step: &str) -> Option<(&str, usize)> {
    match step.split_once('[') {
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.parse().ok()?;
            Some((name, index))
        }
        None => Some((step, 1)),
    }
}
