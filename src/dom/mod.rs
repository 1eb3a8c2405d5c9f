//! Parsed-node model for chapter content
//!
//! Pages are parsed with `scraper` and immediately converted into this small
//! owned tree. Extraction, merging, and link rewriting all work on these
//! tagged nodes instead of poking at attributes of a live parser DOM.

mod convert;
mod serialize;

pub use convert::{convert_children, convert_element, matching_ids, outside_window};
pub use serialize::{render_document, render_nodes};

/// A node of a parsed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with its attributes (in source order) and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    /// Creates an empty element
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child appender
    pub fn with_child(mut self, child: HtmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the value of an attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Returns true if the element's class list contains `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Returns true if a space-separated attribute (such as `rel`) contains `token`
    pub fn has_token(&self, attr: &str, token: &str) -> bool {
        self.attr(attr)
            .map(|v| {
                v.split_ascii_whitespace()
                    .any(|t| t.eq_ignore_ascii_case(token))
            })
            .unwrap_or(false)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }
}

impl From<Element> for HtmlNode {
    fn from(element: Element) -> Self {
        HtmlNode::Element(element)
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(element) => collect_text(&element.children, out),
            HtmlNode::Comment(_) => {}
        }
    }
}

/// Visits every element in document order
pub fn walk_elements<'a>(nodes: &'a [HtmlNode], visit: &mut impl FnMut(&'a Element)) {
    for node in nodes {
        if let HtmlNode::Element(element) = node {
            visit(element);
            walk_elements(&element.children, visit);
        }
    }
}

/// Visits every element in document order, allowing mutation
pub fn walk_elements_mut(nodes: &mut [HtmlNode], visit: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let HtmlNode::Element(element) = node {
            visit(element);
            walk_elements_mut(&mut element.children, visit);
        }
    }
}

/// Returns the first element in document order satisfying `predicate`
pub fn find_element<'a>(
    nodes: &'a [HtmlNode],
    predicate: impl Fn(&Element) -> bool,
) -> Option<&'a Element> {
    let mut found = None;
    walk_elements(nodes, &mut |element| {
        if found.is_none() && predicate(element) {
            found = Some(element);
        }
    });
    found
}
