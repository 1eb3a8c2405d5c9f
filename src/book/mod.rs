//! Book model and assembly
//!
//! A [`BookDocument`] is the ordered list of chapters the walker collected.
//! The [`merger`] turns it into a single document and the [`rewriter`]
//! points its references at local files and anchors.

pub mod merger;
pub mod rewriter;

pub use merger::{chapter_anchor_id, merge, AnchorIndex, MergedDocument};
pub use rewriter::rewrite;

use crate::dom::{find_element, walk_elements, HtmlNode};
use crate::MergeError;
use std::collections::HashSet;
use url::Url;

/// Longest file basename derived from a title
const MAX_BASENAME_LEN: usize = 100;

/// Title used when no page offers one
pub const UNTITLED: &str = "Untitled";

/// One page of the source book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPage {
    /// URL the chapter was served from, without fragment
    pub url: Url,

    /// Position in the book, starting at 0
    pub order_index: usize,

    /// Contents of the page's `<title>`
    pub title: Option<String>,

    /// Meta tags and stylesheets of the page head
    pub head: Vec<HtmlNode>,

    /// The chapter content fragment
    pub content: Vec<HtmlNode>,
}

/// The ordered chapters of a book plus its title and author
#[derive(Debug, Clone)]
pub struct BookDocument {
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<ChapterPage>,
}

impl BookDocument {
    /// Builds a book from chapters in reading order
    ///
    /// Fails if there are no chapters, if `order_index` is not strictly
    /// increasing, or if a page URL occurs twice.
    pub fn new(chapters: Vec<ChapterPage>) -> Result<Self, MergeError> {
        let first = chapters.first().ok_or(MergeError::EmptyBook)?;

        let mut seen = HashSet::new();
        let mut previous: Option<usize> = None;
        for chapter in &chapters {
            if previous.is_some_and(|p| chapter.order_index <= p) {
                return Err(MergeError::OutOfOrder {
                    url: chapter.url.to_string(),
                });
            }
            if !seen.insert(&chapter.url) {
                return Err(MergeError::DuplicateChapter {
                    url: chapter.url.to_string(),
                });
            }
            previous = Some(chapter.order_index);
        }

        let title = discover_title(first);
        let author = discover_author(first);

        Ok(Self {
            title,
            author,
            chapters,
        })
    }

    /// File basename for this book's output
    pub fn basename(&self) -> String {
        sanitize_basename(&self.title)
    }
}

/// Finds the book title on its first chapter
///
/// Looks for an element with class `title` in the content, then
/// `<meta name="title">`, the page `<title>`, and the first `<h1>`.
fn discover_title(first: &ChapterPage) -> String {
    find_element(&first.content, |e| e.has_class("title"))
        .map(|e| collapse_whitespace(&e.text_content()))
        .filter(|t| !t.is_empty())
        .or_else(|| meta_content(&first.head, "title"))
        .or_else(|| first.title.clone().filter(|t| !t.is_empty()))
        .or_else(|| {
            find_element(&first.content, |e| e.name == "h1")
                .map(|e| collapse_whitespace(&e.text_content()))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn discover_author(first: &ChapterPage) -> Option<String> {
    find_element(&first.content, |e| e.has_class("author"))
        .map(|e| collapse_whitespace(&e.text_content()))
        .filter(|a| !a.is_empty())
        .or_else(|| meta_content(&first.head, "author"))
}

/// Returns the content of `<meta name="{name}">`
fn meta_content(head: &[HtmlNode], name: &str) -> Option<String> {
    let mut found = None;
    walk_elements(head, &mut |element| {
        if found.is_none()
            && element.name == "meta"
            && element
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        {
            found = element
                .attr("content")
                .map(collapse_whitespace)
                .filter(|c| !c.is_empty());
        }
    });
    found
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turns a title into a filesystem-safe basename
///
/// Letters, digits, `-` and `_` are kept; everything else becomes `_`.
/// Runs of `_` collapse, leading and trailing `_` are trimmed, and the
/// result is capped at 100 characters. An empty result becomes `book`.
pub fn sanitize_basename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        let c = if c.is_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed: String = out
        .trim_matches('_')
        .chars()
        .take(MAX_BASENAME_LEN)
        .collect();
    let trimmed = trimmed.trim_end_matches('_');

    if trimmed.is_empty() {
        "book".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    fn chapter(index: usize, url: &str) -> ChapterPage {
        ChapterPage {
            url: Url::parse(url).unwrap(),
            order_index: index,
            title: Some("Page title".to_string()),
            head: Vec::new(),
            content: Vec::new(),
        }
    }

    #[test]
    fn test_empty_book_rejected() {
        assert!(matches!(
            BookDocument::new(Vec::new()),
            Err(MergeError::EmptyBook)
        ));
    }

    #[test]
    fn test_duplicate_chapter_rejected() {
        let chapters = vec![
            chapter(0, "https://example.com/1.html"),
            chapter(1, "https://example.com/1.html"),
        ];
        assert!(matches!(
            BookDocument::new(chapters),
            Err(MergeError::DuplicateChapter { .. })
        ));
    }

    #[test]
    fn test_order_must_increase() {
        let chapters = vec![
            chapter(1, "https://example.com/1.html"),
            chapter(1, "https://example.com/2.html"),
        ];
        assert!(matches!(
            BookDocument::new(chapters),
            Err(MergeError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_title_prefers_title_class() {
        let mut first = chapter(0, "https://example.com/1.html");
        first.content = vec![
            Element::new("h1").with_child(HtmlNode::Text("Heading".into())).into(),
            Element::new("h3")
                .with_attr("class", "title")
                .with_child(HtmlNode::Text(" Die  Leiden ".into()))
                .into(),
            Element::new("h3")
                .with_attr("class", "author")
                .with_child(HtmlNode::Text("Goethe".into()))
                .into(),
        ];
        let book = BookDocument::new(vec![first]).unwrap();
        assert_eq!(book.title, "Die Leiden");
        assert_eq!(book.author.as_deref(), Some("Goethe"));
    }

    #[test]
    fn test_title_fallbacks() {
        let mut first = chapter(0, "https://example.com/1.html");
        first.head = vec![Element::new("meta")
            .with_attr("name", "author")
            .with_attr("content", "Anon")
            .into()];
        let book = BookDocument::new(vec![first.clone()]).unwrap();
        assert_eq!(book.title, "Page title");
        assert_eq!(book.author.as_deref(), Some("Anon"));

        first.title = None;
        first.content = vec![Element::new("h1")
            .with_child(HtmlNode::Text("Kapitel".into()))
            .into()];
        assert_eq!(BookDocument::new(vec![first.clone()]).unwrap().title, "Kapitel");

        first.content.clear();
        assert_eq!(BookDocument::new(vec![first]).unwrap().title, UNTITLED);
    }

    #[test]
    fn test_sanitize_basename() {
        assert_eq!(sanitize_basename("Die Leiden des jungen Werther"), "Die_Leiden_des_jungen_Werther");
        assert_eq!(sanitize_basename("  A / B: C?  "), "A_B_C");
        assert_eq!(sanitize_basename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_basename("Faust-Teil_1"), "Faust-Teil_1");
        assert_eq!(sanitize_basename("!!!"), "book");
        assert_eq!(sanitize_basename(""), "book");
        assert_eq!(sanitize_basename(&"x".repeat(300)).len(), 100);
    }
}
