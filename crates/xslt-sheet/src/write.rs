//! Serialize a [`SheetDocument`] back to XML text.

use crate::dom::{NodeId, SheetDocument, SheetNode};

/// Serialize the whole document, including the XML declaration.
#[must_use]
pub fn write_document(doc: &SheetDocument) -> String {
    let mut output = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_node(doc, doc.root(), &mut output);
    output
}

fn write_node(doc: &SheetDocument, id: NodeId, output: &mut String) {
    match doc.node(id) {
        SheetNode::Element(element) => {
            output.push('<');
            output.push_str(&element.name.to_string());
            for attr in &element.attributes {
                output.push(' ');
                output.push_str(&attr.name.to_string());
                output.push_str("=\"");
                escape_into(&attr.value, true, output);
                output.push('"');
            }
            if element.children.is_empty() {
                output.push_str("/>");
                return;
            }
            output.push('>');
            for child in &element.children {
                write_node(doc, *child, output);
            }
            output.push_str("</");
            output.push_str(&element.name.to_string());
            output.push('>');
        }
        SheetNode::Text(text) => escape_into(text, false, output),
        SheetNode::Comment(text) => {
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
        SheetNode::ProcessingInstruction { target, data } => {
            output.push_str("<?");
            output.push_str(target);
            if !data.is_empty() {
                output.push(' ');
                output.push_str(data);
            }
            output.push_str("?>");
        }
    }
}

fn escape_into(text: &str, in_attribute: bool, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if in_attribute => output.push_str("&quot;"),
            _ => output.push(ch),
        }
    }
}
