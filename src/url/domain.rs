use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host portion, or None for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use chapter_binder::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs live on the same site
///
/// Two URLs are on the same site when their hosts match, ignoring a leading
/// `www.`, and their ports agree. The scheme is not compared so an
/// `http` to `https` hop inside a book is still followed.
pub fn same_site(a: &Url, b: &Url) -> bool {
    let host = |u: &Url| {
        extract_domain(u).map(|d| d.strip_prefix("www.").map(str::to_string).unwrap_or(d))
    };
    host(a).is_some() && host(a) == host(b) && a.port() == b.port()
}
