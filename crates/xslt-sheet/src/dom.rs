//! Mutable stylesheet document tree.

use smol_str::SmolStr;

/// Index of a node inside a [`SheetDocument`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Qualified name with an optional prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<SmolStr>,
    pub local: SmolStr,
}

impl QName {
    #[must_use]
    pub fn new(prefix: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.map(SmolStr::new),
            local: SmolStr::new(local),
        }
    }

    #[must_use]
    pub fn local(local: &str) -> Self {
        Self::new(None, local)
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Attribute on an element, namespace declarations included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// Element node with resolved namespace, source line, and child list.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    /// Resolved namespace URI for the element name, if any.
    pub namespace: Option<SmolStr>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    /// 1-based source line of the start tag. Synthesized nodes carry none.
    pub line: Option<u32>,
}

impl Element {
    /// Look up an attribute value by prefixed or plain name match.
    #[must_use]
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.prefix.is_none() && attr.name.local == local)
            .map(|attr| attr.value.as_str())
    }

    /// Look up an attribute value by prefix and local name.
    #[must_use]
    pub fn prefixed_attribute(&self, prefix: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| {
                attr.name.prefix.as_deref() == Some(prefix) && attr.name.local == local
            })
            .map(|attr| attr.value.as_str())
    }

    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self.attributes.iter_mut().find(|attr| attr.name == name) {
            attr.value = value;
        } else {
            self.attributes.push(Attribute { name, value });
        }
    }

    /// True when a `xmlns:<prefix>` declaration is present on this element.
    #[must_use]
    pub fn declares_prefix(&self, prefix: &str) -> bool {
        self.attributes.iter().any(|attr| {
            attr.name.prefix.as_deref() == Some("xmlns") && attr.name.local == prefix
        })
    }
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub enum SheetNode {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: SmolStr, data: String },
}

impl SheetNode {
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            SheetNode::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            SheetNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Arena-backed mutable document. Nodes are appended and referenced by id;
/// tree shape lives in each element's child list.
#[derive(Debug, Clone)]
pub struct SheetDocument {
    nodes: Vec<SheetNode>,
    root: NodeId,
}

impl SheetDocument {
    #[must_use]
    pub fn new(root_element: Element) -> Self {
        Self {
            nodes: vec![SheetNode::Element(root_element)],
            root: NodeId(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &SheetNode {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SheetNode {
        &mut self.nodes[id.index()]
    }

    /// Element view of a node; panics on non-element ids, which indicates a
    /// traversal bug rather than malformed input.
    #[must_use]
    pub fn element(&self, id: NodeId) -> &Element {
        self.nodes[id.index()]
            .as_element()
            .unwrap_or_else(|| panic!("node {} is not an element", id.0))
    }

    #[must_use]
    pub fn element_mut(&mut self, id: NodeId) -> &mut Element {
        self.nodes[id.index()]
            .as_element_mut()
            .unwrap_or_else(|| panic!("node {} is not an element", id.0))
    }

    pub fn push_node(&mut self, node: SheetNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Append `child` to `parent`'s child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.element_mut(parent).children.push(child);
    }

    /// Insert `child` into `parent`'s child list at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = &mut self.element_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    #[must_use]
    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        &self.element(parent).children
    }

    /// Child element ids of `parent`, skipping text/comment/PI nodes.
    pub fn child_elements(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.element(parent)
            .children
            .iter()
            .copied()
            .filter(|id| self.node(*id).as_element().is_some())
    }

    /// Concatenated text content of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        match self.node(id) {
            SheetNode::Text(text) => output.push_str(text),
            SheetNode::Element(element) => {
                for child in &element.children {
                    self.collect_text(*child, output);
                }
            }
            SheetNode::Comment(_) | SheetNode::ProcessingInstruction { .. } => {}
        }
    }
}
