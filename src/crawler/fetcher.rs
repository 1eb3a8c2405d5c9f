//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests for chapter pages (text) and resources (bytes)
//! - Retry with exponential backoff for transient failures
//! - Error classification into transient and permanent failures

use crate::config::FetcherConfig;
use crate::FetchError;
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Maximum number of redirect hops followed transparently
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Page body, decoded according to the response charset
    pub body: String,
}

/// How often and how patiently transient failures are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry; doubles on every further retry
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Builds the policy from fetcher configuration
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed transparently (up to 10 hops); the final URL is
/// reported in [`FetchedPage::final_url`].
///
/// # Example
///
/// ```no_run
/// use chapter_binder::config::FetcherConfig;
/// use chapter_binder::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .https_only(config.https_only)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches chapter pages and resources with retry
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 429 | Retry with backoff |
/// | HTTP 5xx | Retry with backoff |
/// | Other HTTP 4xx | Immediate → Permanent |
/// | Timeout / connection / body error | Retry with backoff |
/// | Non-HTTP(S) URL, redirect limit | Immediate → Permanent |
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl PageFetcher {
    /// Creates a fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            build_http_client(config)?,
            RetryPolicy::from_config(config),
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Fetches a page as text
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.with_retry(url, || self.fetch_page_once(url)).await
    }

    /// Fetches a resource as raw bytes
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.with_retry(url, || self.fetch_bytes_once(url)).await
    }

    async fn fetch_page_once(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.send(url).await?;
        let final_url = response.url().clone();
        let status_code = response.status().as_u16();

        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(url.as_str(), &e))?;

        Ok(FetchedPage {
            final_url,
            status_code,
            body,
        })
    }

    async fn fetch_bytes_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.send(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_request_error(url.as_str(), &e))?;
        Ok(bytes.to_vec())
    }

    /// Sends one GET request and classifies the outcome
    async fn send(&self, url: &Url) -> Result<Response, FetchError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FetchError::Permanent {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url.as_str(), &e))?;

        match classify_status(url.as_str(), response.status()) {
            Some(error) => Err(error),
            None => Ok(response),
        }
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry budget is spent
    async fn with_retry<T, F, Fut>(&self, url: &Url, attempt: F) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut retry = 0;
        loop {
            tracing::debug!("GET {} (attempt {})", url, retry + 1);
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    tracing::warn!(
                        "{}; retrying in {:?} ({}/{})",
                        error,
                        delay,
                        retry + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Maps an HTTP status to a fetch error, or None for success
pub fn classify_status(url: &str, status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let reason = format!("HTTP {}", status.as_u16());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Some(FetchError::Transient {
            url: url.to_string(),
            reason,
        })
    } else {
        Some(FetchError::Permanent {
            url: url.to_string(),
            reason,
        })
    }
}

/// Maps a client error to a fetch error
fn classify_request_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_builder() || error.is_redirect() {
        FetchError::Permanent {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else if error.is_timeout() {
        FetchError::Transient {
            url: url.to_string(),
            reason: "request timeout".to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transient {
            url: url.to_string(),
            reason: "connection failed".to_string(),
        }
    } else {
        FetchError::Transient {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
