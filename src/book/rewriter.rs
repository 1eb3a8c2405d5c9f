//! Reference rewriting for the merged document

use super::MergedDocument;
use crate::crawler::resource_attribute;
use crate::dom::walk_elements_mut;
use crate::resources::ResourceMap;
use url::Url;

/// Points resource references at cached files and intra-book links at local anchors
///
/// Resource attributes whose value is a key of `resources` get the mapped
/// value. `<a>`/`<area>` hrefs that resolve through the document's anchor
/// index become `#id`. Everything else is left alone, so running this twice
/// changes nothing the second time.
///
/// Returns the number of attributes changed.
pub fn rewrite(document: &mut MergedDocument, resources: &ResourceMap) -> usize {
    let MergedDocument { root, anchors, .. } = document;
    let mut changed = 0;

    walk_elements_mut(&mut root.children, &mut |element| {
        if let Some((attr, _)) = resource_attribute(element) {
            let replacement = element
                .attr(attr)
                .and_then(|value| resources.get(value))
                .filter(|mapped| element.attr(attr) != Some(mapped.as_str()))
                .cloned();
            if let Some(replacement) = replacement {
                element.set_attr(attr, &replacement);
                changed += 1;
            }
        }

        if element.name == "a" || element.name == "area" {
            let local = element
                .attr("href")
                .and_then(|href| Url::parse(href).ok())
                .and_then(|url| anchors.resolve(&url).map(|id| format!("#{}", id)));
            if let Some(local) = local {
                element.set_attr("href", &local);
                changed += 1;
            }
        }
    });

    tracing::debug!("Rewrote {} references", changed);
    changed
}
