//! HTML serialization of [`HtmlNode`] trees
//!
//! Output is always well-formed: every non-void element is closed, text is
//! escaped, and attribute values are double-quoted.

use super::{Element, HtmlNode};
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is emitted verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serializes a complete document, prefixed with the HTML5 doctype
pub fn render_document(root: &Element) -> String {
    let mut out = String::from("<!DOCTYPE html>\n");
    write_element(root, &mut out);
    out.push('\n');
    out
}

/// Serializes a sequence of nodes
pub fn render_nodes(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, false, &mut out);
    out
}

/// Comment body with every `--` broken up
fn comment_text(comment: &str) -> String {
    let mut text = comment.to_string();
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    if text.ends_with('-') {
        text.push(' ');
    }
    text
}

fn write_nodes(nodes: &[HtmlNode], raw_text: bool, out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Element(element) => write_element(element, out),
            HtmlNode::Text(text) if raw_text => out.push_str(text),
            HtmlNode::Text(text) => out.push_str(&encode_text(text)),
            HtmlNode::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(&comment_text(comment));
                out.push_str("-->");
            }
        }
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&element.name.as_str()) {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
    write_nodes(&element.children, raw_text, out);

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}
