//! Conversion from `scraper`'s parse tree into [`HtmlNode`]s

use super::{Element, HtmlNode};
use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{HashMap, HashSet};

/// Collects the ids of every element matching any of `selectors`
///
/// The result is passed to the converters as a skip set, which is how
/// navigation bars and adverts are dropped from a chapter.
pub fn matching_ids(document: &Html, selectors: &[Selector]) -> HashSet<NodeId> {
    selectors
        .iter()
        .flat_map(|selector| document.select(selector).map(|element| element.id()))
        .collect()
}

/// Collects the ids of nodes below `root` that fall outside the content window
///
/// The window opens after the subtree of the first `start_after` match and
/// closes at the last `end_before_last` match that follows it. Ancestors of
/// either marker stay, so the surrounding structure survives.
pub fn outside_window(
    root: ElementRef<'_>,
    start_after: Option<&Selector>,
    end_before_last: Option<&Selector>,
) -> HashSet<NodeId> {
    let nodes: Vec<NodeRef<'_, Node>> = root.descendants().skip(1).collect();
    let position: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id(), i))
        .collect();
    let mut skip = HashSet::new();

    let mut first_kept = 0;
    if let Some(marker) = start_after.and_then(|s| root.select(s).find(|e| e.id() != root.id())) {
        let ancestors: HashSet<NodeId> = marker.ancestors().map(|n| n.id()).collect();
        if let Some(&last) = marker.descendants().last().and_then(|n| position.get(&n.id())) {
            skip.extend(
                nodes[..=last]
                    .iter()
                    .map(|n| n.id())
                    .filter(|id| !ancestors.contains(id)),
            );
            first_kept = last + 1;
        }
    }

    if let Some(selector) = end_before_last {
        let cut = root
            .select(selector)
            .filter_map(|e| position.get(&e.id()).copied())
            .filter(|&i| i >= first_kept)
            .max();
        if let Some(cut) = cut {
            skip.extend(nodes[cut..].iter().map(|n| n.id()));
        }
    }

    skip
}

/// Converts an element and its subtree
pub fn convert_element(element: ElementRef<'_>, skip: &HashSet<NodeId>) -> Option<HtmlNode> {
    convert_node(*element, skip)
}

/// Converts the children of an element, dropping skipped subtrees
pub fn convert_children(element: ElementRef<'_>, skip: &HashSet<NodeId>) -> Vec<HtmlNode> {
    element
        .children()
        .filter_map(|child| convert_node(child, skip))
        .collect()
}

fn convert_node(node: NodeRef<'_, Node>, skip: &HashSet<NodeId>) -> Option<HtmlNode> {
    if skip.contains(&node.id()) {
        return None;
    }

    match node.value() {
        Node::Element(element) => Some(HtmlNode::Element(Element {
            name: element.name().to_string(),
            attrs: element
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            children: node
                .children()
                .filter_map(|child| convert_node(child, skip))
                .collect(),
        })),
        Node::Text(text) => Some(HtmlNode::Text(String::from(&**text))),
        Node::Comment(comment) => Some(HtmlNode::Comment(String::from(&**comment))),
        // Doctype, processing instructions and document roots carry no content
        _ => None,
    }
}
