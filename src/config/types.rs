use serde::Deserialize;

/// Main configuration structure for Chapter-Binder
///
/// Every section is optional; an empty file yields [`Config::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub walker: WalkerConfig,
    pub resources: ResourceConfig,
    pub output: OutputConfig,
}

/// HTTP fetching and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Base delay of the exponential backoff (milliseconds)
    pub backoff_base_ms: u64,

    /// Refuse plain HTTP URLs
    pub https_only: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("chapter-binder/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            backoff_base_ms: 500,
            https_only: false,
        }
    }
}

/// Chapter traversal and clean-up
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WalkerConfig {
    /// CSS selector of the element holding a chapter's content
    pub content_selector: String,

    /// Selectors tried, in order, to find the next-chapter link
    pub next_selectors: Vec<String>,

    /// Link texts that mark a next-chapter link (case-insensitive prefix match)
    pub next_link_labels: Vec<String>,

    /// Elements removed from every chapter (navigation, adverts, scripts)
    pub strip_selectors: Vec<String>,

    /// Content before and including the first match is dropped (empty disables)
    pub content_start_after: String,

    /// Content from the last match onward is dropped (empty disables)
    pub content_end_before_last: String,

    /// Tag h1-h4 headings with class "chapter" unless they are title/subtitle/author
    pub normalize_headings: bool,

    /// Stop when a next link leaves the starting site
    pub same_site_only: bool,

    /// Upper bound on the number of chapters fetched
    pub max_chapters: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            content_selector: "body".to_string(),
            next_selectors: vec![
                "link[rel~='next'][href]".to_string(),
                "a[rel~='next'][href]".to_string(),
            ],
            next_link_labels: vec![
                "next".to_string(),
                "weiter".to_string(),
                "suivant".to_string(),
            ],
            strip_selectors: vec![
                "script".to_string(),
                "noscript".to_string(),
                ".anzeige-chap".to_string(),
                ".anzeige-print".to_string(),
                ".topnavi-gb".to_string(),
                ".bottomnavi-gb".to_string(),
            ],
            content_start_after: ".anzeige-chap".to_string(),
            content_end_before_last: "hr".to_string(),
            normalize_headings: true,
            same_site_only: true,
            max_chapters: 2000,
        }
    }
}

/// Resource download behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResourceConfig {
    /// Maximum number of resource downloads in flight
    pub max_concurrent_downloads: usize,

    /// Also cache `<script src>` files (scripts are stripped by default)
    pub include_scripts: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 8,
            include_scripts: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving `<title>.html` and `<title>_files/`
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}
