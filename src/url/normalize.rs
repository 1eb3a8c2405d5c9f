use crate::UrlError;
use url::Url;

/// Schemes that never point at a fetchable page or resource
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a URL string supplied by the caller
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only HTTP and HTTPS are accepted
/// 3. A host is required
/// 4. Remove fragment (everything after #)
///
/// Host lowercasing, default-port removal, dot-segment removal and the
/// empty-path-to-`/` rule are applied by the `url` crate while parsing.
///
/// # Examples
///
/// ```
/// use chapter_binder::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/book/chap01.html#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/book/chap01.html");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(page_key(&url))
}

/// Returns the key a page is identified by: the URL without its fragment
pub fn page_key(url: &Url) -> Url {
    let mut key = url.clone();
    key.set_fragment(None);
    key
}

/// Resolves a link href against the page it appears on
///
/// Fragment-only hrefs resolve to the page URL with that fragment, so that
/// in-page anchors survive when pages are merged.
///
/// Returns None if the link should be left alone:
/// - empty hrefs
/// - javascript:, mailto:, tel:, data: schemes
/// - hrefs that do not resolve to an HTTP(S) URL
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if IGNORED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" => {
            Some(absolute_url)
        }
        _ => None,
    }
}

/// Resolves a resource reference (image source, stylesheet href, ...)
///
/// Same as [`resolve_link`], but fragment-only references are ignored since
/// they never name a separate resource.
pub fn resolve_resource(href: &str, base_url: &Url) -> Option<Url> {
    if href.trim_start().starts_with('#') {
        return None;
    }
    resolve_link(href, base_url)
}
