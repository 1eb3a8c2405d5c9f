//! Resource extraction
//!
//! Finds the images, stylesheets and other assets a chapter references and
//! turns them into absolute [`ResourceReference`]s for the resource store.

use crate::book::ChapterPage;
use crate::dom::{walk_elements, walk_elements_mut, Element, HtmlNode};
use crate::url::{resolve_link, resolve_resource};
use std::collections::HashSet;
use url::Url;

/// What kind of asset a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Stylesheet,
    Other,
}

/// A resource referenced by a chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Absolute URL of the resource
    pub source_url: Url,

    /// The chapter the reference was found on
    pub referring_page: Url,

    pub kind: ResourceKind,
}

/// Returns the resource-bearing attribute of an element, if it has one
///
/// | Element | Attribute | Kind |
/// |---------|-----------|------|
/// | `img` | `src` | Image |
/// | `input type=image` | `src` | Image |
/// | `video` | `poster` | Image |
/// | `link rel=stylesheet` | `href` | Stylesheet |
/// | `source`, `audio`, `embed` | `src` | Other |
/// | `script` | `src` | Other |
pub fn resource_attribute(element: &Element) -> Option<(&'static str, ResourceKind)> {
    match element.name.as_str() {
        "img" => Some(("src", ResourceKind::Image)),
        "input" if element
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("image")) =>
        {
            Some(("src", ResourceKind::Image))
        }
        "video" => Some(("poster", ResourceKind::Image)),
        "link" if element.has_token("rel", "stylesheet") => Some(("href", ResourceKind::Stylesheet)),
        "source" | "audio" | "embed" | "script" => Some(("src", ResourceKind::Other)),
        _ => None,
    }
}

/// Rewrites every link and resource reference to an absolute URL
///
/// Anchors keep fragment-only hrefs as `page#fragment` so in-page
/// references survive merging. `srcset` is dropped from images since the
/// alternative sources would otherwise stay remote.
pub fn absolutize_references(nodes: &mut [HtmlNode], base_url: &Url) {
    walk_elements_mut(nodes, &mut |element| {
        if element.name == "a" || element.name == "area" {
            if let Some(absolute) = element.attr("href").and_then(|h| resolve_link(h, base_url)) {
                element.set_attr("href", absolute.as_str());
            }
            return;
        }

        if let Some((attr, _)) = resource_attribute(element) {
            if let Some(absolute) = element.attr(attr).and_then(|v| resolve_resource(v, base_url)) {
                element.set_attr(attr, absolute.as_str());
            }
            if element.attr("src").is_some() {
                element.attrs.retain(|(name, _)| !name.eq_ignore_ascii_case("srcset"));
            }
        }
    });
}

/// Extracts resource references from chapter pages
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceExtractor {
    include_scripts: bool,
}

impl ResourceExtractor {
    /// Creates an extractor; scripts are only collected when `include_scripts` is set
    pub fn new(include_scripts: bool) -> Self {
        Self { include_scripts }
    }

    /// Lists the distinct resources referenced by a chapter's content
    ///
    /// The head is scanned only for the first chapter, whose head becomes the
    /// merged document's head.
    ///
    /// References are resolved against the chapter URL. Fragment-only,
    /// `data:` and other non-HTTP references are skipped. Order of first
    /// appearance is preserved.
    pub fn extract(&self, page: &ChapterPage) -> Vec<ResourceReference> {
        let mut seen = HashSet::new();
        let mut references = Vec::new();

        let mut visit = |element: &Element| {
            let Some((attr, kind)) = resource_attribute(element) else {
                return;
            };
            if element.name == "script" && !self.include_scripts {
                return;
            }
            let Some(source_url) = element.attr(attr).and_then(|v| resolve_resource(v, &page.url))
            else {
                return;
            };
            if seen.insert(source_url.clone()) {
                references.push(ResourceReference {
                    source_url,
                    referring_page: page.url.clone(),
                    kind,
                });
            }
        };

        // Only the first chapter's head is carried into the merged document
        if page.order_index == 0 {
            walk_elements(&page.head, &mut visit);
        }
        walk_elements(&page.content, &mut visit);

        tracing::debug!(
            "Found {} resources on {}",
            references.len(),
            page.url
        );
        references
    }
}
