//! Chapter merging
//!
//! Builds one document from a [`BookDocument`]: a single head, then every
//! chapter behind an anchor marker. Element ids are kept unique across the
//! whole book and every addressable position is recorded in an
//! [`AnchorIndex`] for the link rewriter.

use super::BookDocument;
use crate::dom::{render_document, walk_elements_mut, Element, HtmlNode};
use crate::url::page_key;
use crate::MergeError;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Class given to chapter marker anchors
pub const CHAPTER_ANCHOR_CLASS: &str = "chapter-anchor";

/// Anchor id of the chapter at `order_index`
pub fn chapter_anchor_id(order_index: usize) -> String {
    format!("chapter-{:03}", order_index + 1)
}

/// Maps page URLs (with or without fragment) to anchor ids in the merged document
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    chapters: HashMap<Url, String>,
    targets: HashMap<Url, String>,
}

impl AnchorIndex {
    /// Local anchor for an absolute URL
    ///
    /// A URL with a known fragment maps to the (possibly renamed) element id.
    /// Any other URL of a chapter page maps to that chapter's marker.
    pub fn resolve(&self, url: &Url) -> Option<&str> {
        if url.fragment().is_some() {
            if let Some(id) = self.targets.get(url) {
                return Some(id);
            }
        }
        self.chapters.get(&page_key(url)).map(String::as_str)
    }

    /// Number of recorded anchors, markers included
    pub fn len(&self) -> usize {
        self.chapters.len() + self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_chapter(&mut self, url: &Url, marker: String) {
        self.chapters.insert(page_key(url), marker);
    }

    fn insert_target(&mut self, page: &Url, original: &str, id: &str) {
        let mut target = page_key(page);
        target.set_fragment(Some(original));
        self.targets.entry(target).or_insert_with(|| id.to_string());
    }
}

/// A merged book ready for rewriting and serialization
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub title: String,
    pub root: Element,
    pub anchors: AnchorIndex,
}

impl MergedDocument {
    /// Serializes the document as HTML
    pub fn render(&self) -> String {
        render_document(&self.root)
    }
}

/// Merges the chapters of a book into one document
pub fn merge(book: BookDocument) -> Result<MergedDocument, MergeError> {
    let BookDocument {
        title,
        author,
        chapters,
    } = book;
    let first = chapters.first().ok_or(MergeError::EmptyBook)?;

    let head = build_head(&title, author.as_deref(), &first.head);

    let markers: Vec<String> = chapters
        .iter()
        .map(|c| chapter_anchor_id(c.order_index))
        .collect();
    let mut ids = IdAllocator::new(markers.iter().cloned());
    let mut anchors = AnchorIndex::default();
    let mut body = Element::new("body");

    for (mut chapter, marker) in chapters.into_iter().zip(markers) {
        anchors.insert_chapter(&chapter.url, marker.clone());

        walk_elements_mut(&mut chapter.content, &mut |element| {
            // Legacy `<a name>` targets count as ids when no id is present
            let attr = if element.attr("id").is_some() || element.name != "a" {
                "id"
            } else {
                "name"
            };
            let Some(original) = element.attr(attr).filter(|v| !v.is_empty()) else {
                return;
            };
            let original = original.to_string();

            let id = ids.allocate(&original, &marker);
            if id != original {
                tracing::debug!(
                    "Renamed duplicate id '{}' to '{}' in {}",
                    original,
                    id,
                    chapter.url
                );
                element.set_attr(attr, &id);
                if attr == "id" && element.attr("name") == Some(original.as_str()) {
                    element.set_attr("name", &id);
                }
            }
            anchors.insert_target(&chapter.url, &original, &id);
        });

        body.children.push(HtmlNode::Text("\n".to_string()));
        body.children.push(
            Element::new("a")
                .with_attr("id", &marker)
                .with_attr("class", CHAPTER_ANCHOR_CLASS)
                .into(),
        );
        body.children.append(&mut chapter.content);
    }
    body.children.push(HtmlNode::Text("\n".to_string()));

    let root = Element::new("html")
        .with_child(head.into())
        .with_child(HtmlNode::Text("\n".to_string()))
        .with_child(body.into());

    tracing::debug!("Merged document has {} anchors", anchors.len());

    Ok(MergedDocument {
        title,
        root,
        anchors,
    })
}

/// Builds the merged `<head>` from the first chapter's head
fn build_head(title: &str, author: Option<&str>, source: &[HtmlNode]) -> Element {
    let mut head = Element::new("head")
        .with_child(Element::new("meta").with_attr("charset", "utf-8").into())
        .with_child(
            Element::new("title")
                .with_child(HtmlNode::Text(title.to_string()))
                .into(),
        );
    if let Some(author) = author {
        head.children.push(
            Element::new("meta")
                .with_attr("name", "author")
                .with_attr("content", author)
                .into(),
        );
    }

    for node in source {
        let HtmlNode::Element(element) = node else {
            continue;
        };
        let keep = match element.name.as_str() {
            "meta" => {
                let name = element.attr("name").or_else(|| element.attr("property"));
                match name {
                    Some(n) if n.eq_ignore_ascii_case("author") => author.is_none(),
                    Some(_) => element.attr("content").is_some(),
                    None => false,
                }
            }
            "link" => element.has_token("rel", "stylesheet"),
            "style" => true,
            _ => false,
        };
        if keep {
            head.children.push(node.clone());
        }
    }
    head
}

/// Hands out ids that are unique within the merged document
struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    fn new(reserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: reserved.into_iter().collect(),
        }
    }

    /// Returns `original` if free, else `<marker>-<original>`, else that with a numeric suffix
    fn allocate(&mut self, original: &str, marker: &str) -> String {
        if self.taken.insert(original.to_string()) {
            return original.to_string();
        }
        let prefixed = format!("{}-{}", marker, original);
        if self.taken.insert(prefixed.clone()) {
            return prefixed;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", prefixed, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
