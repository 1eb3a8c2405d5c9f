//! Chapter chain traversal
//!
//! The walker starts at one page and follows "next" links until the chain
//! ends, loops back on itself, leaves the site, or hits the chapter limit.
//! Pages are fetched one at a time and handed out as [`ChapterPage`]s in
//! reading order.

use crate::book::ChapterPage;
use crate::config::WalkerConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{parse_page, PageRules};
use crate::state::WalkState;
use crate::url::{page_key, same_site};
use crate::BinderError;
use std::collections::HashSet;
use url::Url;

/// Traversal bookkeeping owned by the walker
#[derive(Debug, Clone)]
pub struct TraversalContext {
    visited: HashSet<Url>,
    frontier: Option<Url>,
    next_index: usize,
}

impl TraversalContext {
    /// Creates a context whose frontier holds the start page
    pub fn new(start: Url) -> Self {
        Self {
            visited: HashSet::new(),
            frontier: Some(page_key(&start)),
            next_index: 0,
        }
    }

    /// Records a page as visited; returns false if it already was
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(page_key(url))
    }

    /// Returns true if the page (ignoring fragment) was visited
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&page_key(url))
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// The page to fetch next, if any
    pub fn frontier(&self) -> Option<&Url> {
        self.frontier.as_ref()
    }
}

/// Follows the chain of chapter pages
pub struct ChapterWalker {
    fetcher: PageFetcher,
    rules: PageRules,
    state: WalkState,
    context: TraversalContext,
    origin: Option<Url>,
    same_site_only: bool,
    max_chapters: usize,
}

impl ChapterWalker {
    /// Creates a walker positioned at `start`
    pub fn new(start: Url, fetcher: PageFetcher, rules: PageRules, config: &WalkerConfig) -> Self {
        Self {
            fetcher,
            rules,
            state: WalkState::Start,
            context: TraversalContext::new(start),
            origin: None,
            same_site_only: config.same_site_only,
            max_chapters: config.max_chapters,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn context(&self) -> &TraversalContext {
        &self.context
    }

    fn transition(&mut self, next: WalkState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid walk transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("Walker {} -> {}", self.state, next);
        self.state = next;
    }

    /// Fetches and returns the next chapter
    ///
    /// Returns `Ok(None)` once traversal has ended. A fetch failure or a page
    /// without content moves the walker to `Failed` and is returned as an
    /// error; later calls return `Ok(None)`.
    pub async fn next_chapter(&mut self) -> Result<Option<ChapterPage>, BinderError> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        let Some(url) = self.context.frontier.take() else {
            self.transition(WalkState::Done);
            return Ok(None);
        };

        self.transition(WalkState::FetchingPage);
        let fetched = match self.fetcher.fetch_page(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Failed to fetch chapter {}: {}", url, e);
                self.transition(WalkState::Failed);
                return Err(e.into());
            }
        };

        let final_url = page_key(&fetched.final_url);
        self.context.mark_visited(&url);
        if final_url != url {
            if self.context.is_visited(&final_url) {
                tracing::info!(
                    "{} redirects back to visited chapter {}; stopping",
                    url,
                    final_url
                );
                self.transition(WalkState::Done);
                return Ok(None);
            }
            tracing::debug!("{} redirected to {}", url, final_url);
            self.context.mark_visited(&final_url);
        }
        if self.origin.is_none() {
            self.origin = Some(final_url.clone());
        }

        self.transition(WalkState::ExtractingNav);
        let parsed = match parse_page(&fetched.body, &fetched.final_url, &self.rules) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Failed to extract chapter from {}: {}", final_url, e);
                self.transition(WalkState::Failed);
                return Err(e.into());
            }
        };

        let chapter = ChapterPage {
            url: final_url,
            order_index: self.context.next_index,
            title: parsed.title,
            head: parsed.head,
            content: parsed.content,
        };
        self.context.next_index += 1;
        tracing::info!("Chapter {}: {}", chapter.order_index + 1, chapter.url);

        self.plan_next(parsed.next_link);
        Ok(Some(chapter))
    }

    /// Decides whether traversal continues after the current page
    fn plan_next(&mut self, next_link: Option<Url>) {
        let Some(next) = next_link.map(|n| page_key(&n)) else {
            tracing::debug!("No next link; reached the last chapter");
            self.transition(WalkState::Done);
            return;
        };

        if self.context.is_visited(&next) {
            tracing::info!("Next link {} leads back to a visited chapter; stopping", next);
            self.transition(WalkState::Done);
            return;
        }

        if self.same_site_only {
            if let Some(origin) = &self.origin {
                if !same_site(origin, &next) {
                    tracing::warn!("Next link {} leaves {}; stopping", next, origin);
                    self.transition(WalkState::Done);
                    return;
                }
            }
        }

        if self.context.next_index >= self.max_chapters {
            tracing::warn!(
                "Reached the limit of {} chapters; not following {}",
                self.max_chapters,
                next
            );
            self.transition(WalkState::Done);
            return;
        }

        self.context.frontier = Some(next);
        self.transition(WalkState::Following);
    }

    /// Walks the whole chain and returns every chapter
    pub async fn walk_all(mut self) -> Result<Vec<ChapterPage>, BinderError> {
        let mut chapters = Vec::new();
        while let Some(chapter) = self.next_chapter().await? {
            chapters.push(chapter);
        }
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetcherConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn walker(server: &MockServer, start: &str, config: WalkerConfig) -> ChapterWalker {
        let fetcher = PageFetcher::new(&FetcherConfig {
            max_retries: 0,
            backoff_base_ms: 1,
            ..FetcherConfig::default()
        })
        .unwrap();
        let rules = PageRules::from_config(&config).unwrap();
        let start = Url::parse(&format!("{}{}", server.uri(), start)).unwrap();
        ChapterWalker::new(start, fetcher, rules, &config)
    }

    async fn page(server: &MockServer, p: &str, body: &str, expected: u64) {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
            .expect(expected)
            .mount(server)
            .await;
    }

    fn chapter_html(text: &str, next: Option<&str>) -> String {
        let nav = next
            .map(|n| format!(r#"<a href="{}">weiter</a>"#, n))
            .unwrap_or_default();
        format!("<html><body><p>{}</p>{}</body></html>", text, nav)
    }

    #[tokio::test]
    async fn test_walks_chain_in_order() {
        let server = MockServer::start().await;
        page(&server, "/1.html", &chapter_html("One", Some("2.html")), 1).await;
        page(&server, "/2.html", &chapter_html("Two", Some("3.html")), 1).await;
        page(&server, "/3.html", &chapter_html("Three", None), 1).await;

        let mut walker = walker(&server, "/1.html", WalkerConfig::default());
        let mut chapters = Vec::new();
        while let Some(chapter) = walker.next_chapter().await.unwrap() {
            chapters.push(chapter);
        }

        assert_eq!(walker.state(), WalkState::Done);
        assert_eq!(chapters.len(), 3);
        let indices: Vec<usize> = chapters.iter().map(|c| c.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(chapters[2].url.as_str().ends_with("/3.html"));
        assert_eq!(walker.context().visited_count(), 3);
    }

    #[tokio::test]
    async fn test_back_link_stops_without_refetch() {
        let server = MockServer::start().await;
        page(&server, "/1.html", &chapter_html("One", Some("2.html")), 1).await;
        page(&server, "/2.html", &chapter_html("Two", Some("1.html#top")), 1).await;

        let chapters = walker(&server, "/1.html", WalkerConfig::default())
            .walk_all()
            .await
            .unwrap();

        assert_eq!(chapters.len(), 2);
    }

    #[tokio::test]
    async fn test_redirect_to_visited_chapter_ends_walk() {
        let server = MockServer::start().await;
        // The redirect target is requested again before the walker sees the final URL
        page(&server, "/1.html", &chapter_html("One", Some("2.html")), 2).await;
        page(&server, "/2.html", &chapter_html("Two", Some("3.html")), 1).await;
        Mock::given(method("GET"))
            .and(path("/3.html"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/1.html"))
            .expect(1)
            .mount(&server)
            .await;

        let mut walker = walker(&server, "/1.html", WalkerConfig::default());
        let mut chapters = Vec::new();
        while let Some(chapter) = walker.next_chapter().await.unwrap() {
            chapters.push(chapter);
        }

        assert_eq!(walker.state(), WalkState::Done);
        assert_eq!(chapters.len(), 2);
        assert!(chapters[1].url.as_str().ends_with("/2.html"));
    }

    #[tokio::test]
    async fn test_last_page_only() {
        let server = MockServer::start().await;
        page(&server, "/9.html", &chapter_html("Ende", None), 1).await;

        let chapters = walker(&server, "/9.html", WalkerConfig::default())
            .walk_all()
            .await
            .unwrap();

        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].order_index, 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_walk() {
        let server = MockServer::start().await;
        page(&server, "/1.html", &chapter_html("One", Some("2.html")), 1).await;
        Mock::given(method("GET"))
            .and(path("/2.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut walker = walker(&server, "/1.html", WalkerConfig::default());
        assert!(walker.next_chapter().await.unwrap().is_some());
        let result = walker.next_chapter().await;

        assert!(matches!(result, Err(BinderError::Fetch(_))));
        assert_eq!(walker.state(), WalkState::Failed);
        assert!(walker.next_chapter().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_max_chapters_limit() {
        let server = MockServer::start().await;
        page(&server, "/1.html", &chapter_html("One", Some("2.html")), 1).await;
        page(&server, "/2.html", &chapter_html("Two", Some("3.html")), 1).await;
        page(&server, "/3.html", &chapter_html("Three", None), 0).await;

        let config = WalkerConfig {
            max_chapters: 2,
            ..WalkerConfig::default()
        };
        let chapters = walker(&server, "/1.html", config).walk_all().await.unwrap();

        assert_eq!(chapters.len(), 2);
    }

    #[tokio::test]
    async fn test_off_site_next_link_ends_walk() {
        let server = MockServer::start().await;
        page(
            &server,
            "/1.html",
            &chapter_html("One", Some("https://elsewhere.example/2.html")),
            1,
        )
        .await;

        let chapters = walker(&server, "/1.html", WalkerConfig::default())
            .walk_all()
            .await
            .unwrap();

        assert_eq!(chapters.len(), 1);
    }

    #[test]
    fn test_traversal_context_ignores_fragment() {
        let mut context = TraversalContext::new(Url::parse("https://example.com/1.html").unwrap());
        assert!(context.mark_visited(&Url::parse("https://example.com/1.html#a").unwrap()));
        assert!(context.is_visited(&Url::parse("https://example.com/1.html").unwrap()));
        assert!(!context.mark_visited(&Url::parse("https://example.com/1.html#b").unwrap()));
        assert_eq!(context.frontier().map(Url::as_str), Some("https://example.com/1.html"));
    }
}
