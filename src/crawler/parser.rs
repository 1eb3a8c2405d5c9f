//! HTML parser for chapter pages
//!
//! This module turns a fetched page into the pieces the walker needs:
//! - The page title and head metadata (meta tags, stylesheets)
//! - The chapter content, trimmed to the prose with navigation and adverts stripped
//! - The link to the next chapter, if any

use crate::config::WalkerConfig;
use crate::crawler::extractor::absolutize_references;
use crate::dom::{
    self, convert_children, convert_element, matching_ids, outside_window, HtmlNode,
};
use crate::url::{page_key, resolve_link};
use crate::{ConfigError, MergeError};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Classes that keep their own styling when headings are normalized
const PROTECTED_HEADING_CLASSES: &[&str] = &["title", "subtitle", "author"];

/// Extracted information from a chapter page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// `<meta>`, stylesheet `<link>` and `<style>` elements of the head
    pub head: Vec<HtmlNode>,

    /// Chapter content with references made absolute
    pub content: Vec<HtmlNode>,

    /// Absolute URL of the next chapter
    pub next_link: Option<Url>,
}

/// Compiled selectors and options used to read chapter pages
#[derive(Debug, Clone)]
pub struct PageRules {
    content_source: String,
    content: Selector,
    next: Vec<Selector>,
    strip: Vec<Selector>,
    start_after: Option<Selector>,
    end_before_last: Option<Selector>,
    head: Selector,
    anchors: Selector,
    labels: Vec<String>,
    normalize_headings: bool,
}

impl PageRules {
    /// Compiles the walker configuration
    pub fn from_config(config: &WalkerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            content_source: config.content_selector.clone(),
            content: compile(&config.content_selector)?,
            next: config
                .next_selectors
                .iter()
                .map(|s| compile(s))
                .collect::<Result<_, _>>()?,
            strip: config
                .strip_selectors
                .iter()
                .map(|s| compile(s))
                .collect::<Result<_, _>>()?,
            start_after: compile_optional(&config.content_start_after)?,
            end_before_last: compile_optional(&config.content_end_before_last)?,
            head: compile("head meta[content], head link[rel~='stylesheet'][href], head style")?,
            anchors: compile("a[href]")?,
            labels: config
                .next_link_labels
                .iter()
                .map(|l| l.trim().to_lowercase())
                .collect(),
            normalize_headings: config.normalize_headings,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn compile_optional(selector: &str) -> Result<Option<Selector>, ConfigError> {
    if selector.trim().is_empty() {
        return Ok(None);
    }
    compile(selector).map(Some)
}

/// Parses a chapter page
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the page was served from, for resolving references
/// * `rules` - Compiled walker rules
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(MergeError)` - The page has no element matching the content selector
pub fn parse_page(html: &str, base_url: &Url, rules: &PageRules) -> Result<ParsedPage, MergeError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let next_link = find_next_link(&document, base_url, rules);

    let content_root = document
        .select(&rules.content)
        .next()
        .ok_or_else(|| MergeError::MissingContent {
            url: base_url.to_string(),
            selector: rules.content_source.clone(),
        })?;

    let mut skip = matching_ids(&document, &rules.strip);
    skip.extend(outside_window(
        content_root,
        rules.start_after.as_ref(),
        rules.end_before_last.as_ref(),
    ));
    let mut content = convert_children(content_root, &skip);
    let mut head: Vec<HtmlNode> = document
        .select(&rules.head)
        .filter_map(|element| convert_element(element, &HashSet::new()))
        .collect();

    absolutize_references(&mut content, base_url);
    absolutize_references(&mut head, base_url);

    if rules.normalize_headings {
        normalize_headings(&mut content);
    }

    Ok(ParsedPage {
        title,
        head,
        content,
        next_link,
    })
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Finds the next-chapter link
///
/// The configured next selectors are tried first (`rel="next"` by default),
/// then anchors whose text starts with one of the configured labels. Links
/// back to the page itself are ignored.
fn find_next_link(document: &Html, base_url: &Url, rules: &PageRules) -> Option<Url> {
    let current = page_key(base_url);
    let usable = |element: ElementRef<'_>| -> Option<Url> {
        let href = element.value().attr("href")?;
        let target = resolve_link(href, base_url)?;
        (page_key(&target) != current).then_some(target)
    };

    for selector in &rules.next {
        if let Some(url) = document.select(selector).find_map(&usable) {
            return Some(url);
        }
    }

    document
        .select(&rules.anchors)
        .filter(|anchor| {
            let text = anchor.text().collect::<String>();
            let text = text.trim().to_lowercase();
            rules.labels.iter().any(|label| label_matches(&text, label))
        })
        .find_map(&usable)
}

/// Returns true if `text` is `label` or starts with it as a whole word
fn label_matches(text: &str, label: &str) -> bool {
    match text.strip_prefix(label) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric()),
        None => false,
    }
}

/// Marks h1-h4 headings with class "chapter" so downstream TOC generation finds them
fn normalize_headings(nodes: &mut [HtmlNode]) {
    dom::walk_elements_mut(nodes, &mut |element| {
        let is_heading = matches!(element.name.as_str(), "h1" | "h2" | "h3" | "h4");
        let protected = PROTECTED_HEADING_CLASSES
            .iter()
            .any(|class| element.has_class(class));
        if is_heading && !protected {
            element.set_attr("class", "chapter");
        }
    });
}
