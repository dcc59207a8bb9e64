//! Parse XML text into a [`SheetDocument`], keeping source line numbers.

use smol_str::SmolStr;

use crate::dom::{Attribute, Element, NodeId, QName, SheetDocument, SheetNode};

/// Parse failure with the underlying reader diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("document has no root element")]
    NoRoot,
}

/// Parse `text` into a mutable document tree.
///
/// Every element records the 1-based line of its start tag. Namespace
/// declarations are reattached to the element that introduced them so the
/// tree serializes back to an equivalent document.
pub fn parse_document(text: &str) -> Result<SheetDocument, ParseError> {
    let parsed = roxmltree::Document::parse(text)?;
    let source_root = parsed.root_element();

    let root = convert_element(&parsed, source_root, None);
    let mut doc = SheetDocument::new(root);
    let root_id = doc.root();
    for child in source_root.children() {
        convert_into(&mut doc, &parsed, child, root_id, Some(source_root));
    }
    Ok(doc)
}

fn convert_into(
    doc: &mut SheetDocument,
    parsed: &roxmltree::Document<'_>,
    source: roxmltree::Node<'_, '_>,
    parent: NodeId,
    parent_element: Option<roxmltree::Node<'_, '_>>,
) {
    let node = if source.is_element() {
        SheetNode::Element(convert_element(parsed, source, parent_element))
    } else if source.is_text() {
        SheetNode::Text(source.text().unwrap_or_default().to_string())
    } else if source.is_comment() {
        SheetNode::Comment(source.text().unwrap_or_default().to_string())
    } else if source.is_pi() {
        let pi = match source.pi() {
            Some(pi) => pi,
            None => return,
        };
        SheetNode::ProcessingInstruction {
            target: SmolStr::new(pi.target),
            data: pi.value.unwrap_or_default().to_string(),
        }
    } else {
        return;
    };

    let id = doc.push_node(node);
    doc.append_child(parent, id);

    if source.is_element() {
        for child in source.children() {
            convert_into(doc, parsed, child, id, Some(source));
        }
    }
}

fn convert_element(
    parsed: &roxmltree::Document<'_>,
    source: roxmltree::Node<'_, '_>,
    parent: Option<roxmltree::Node<'_, '_>>,
) -> Element {
    let tag = source.tag_name();
    let prefix = tag
        .namespace()
        .and_then(|uri| source.lookup_prefix(uri))
        .filter(|prefix| !prefix.is_empty());

    let mut attributes = Vec::new();
    // Re-emit only the namespace declarations this element introduced.
    for namespace in source.namespaces() {
        let inherited = parent.is_some_and(|parent| {
            parent
                .namespaces()
                .any(|above| above.name() == namespace.name() && above.uri() == namespace.uri())
        });
        if inherited {
            continue;
        }
        let name = match namespace.name() {
            Some(prefix) => QName::new(Some("xmlns"), prefix),
            None => QName::local("xmlns"),
        };
        attributes.push(Attribute {
            name,
            value: namespace.uri().to_string(),
        });
    }
    for attr in source.attributes() {
        let prefix = attr
            .namespace()
            .and_then(|uri| source.lookup_prefix(uri))
            .filter(|prefix| !prefix.is_empty());
        attributes.push(Attribute {
            name: QName::new(prefix, attr.name()),
            value: attr.value().to_string(),
        });
    }

    let line = parsed.text_pos_at(source.range().start).row;

    Element {
        name: QName::new(prefix, tag.name()),
        namespace: tag.namespace().map(SmolStr::new),
        attributes,
        children: Vec::new(),
        line: Some(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_start_tag_lines() {
        let text = "<root>\n  <a/>\n  <b>\n    <c/>\n  </b>\n</root>";
        let doc = parse_document(text).unwrap();
        let children: Vec<_> = doc.child_elements(doc.root()).collect();
        assert_eq!(doc.element(children[0]).line, Some(2));
        assert_eq!(doc.element(children[1]).line, Some(3));
        let inner: Vec<_> = doc.child_elements(children[1]).collect();
        assert_eq!(doc.element(inner[0]).line, Some(4));
    }

    #[test]
    fn keeps_namespace_declarations_where_introduced() {
        let text = r#"<x:root xmlns:x="urn:x"><y:inner xmlns:y="urn:y"/></x:root>"#;
        let doc = parse_document(text).unwrap();
        let root = doc.element(doc.root());
        assert!(root.declares_prefix("x"));
        assert!(!root.declares_prefix("y"));
        let inner = doc.child_elements(doc.root()).next().unwrap();
        assert!(doc.element(inner).declares_prefix("y"));
        assert_eq!(doc.element(inner).namespace.as_deref(), Some("urn:y"));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse_document("<root><unclosed></root>").is_err());
    }
}
