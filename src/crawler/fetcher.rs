//! HTTP fetcher implementation
//!
//! The crawl engine only sees the [`Fetcher`] trait. [`HttpFetcher`] is the
//! reqwest-backed implementation; it keeps one client that never follows
//! redirects and one that does, so each request can choose. A third client
//! fetches robots.txt, which may redirect a few times.

use crate::config::UserAgentConfig;
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops when redirects are followed by the client
const MAX_REDIRECTS: usize = 10;

/// Redirect hops allowed while fetching robots.txt (RFC 9309)
const MAX_ROBOTS_REDIRECTS: usize = 5;

/// One HTTP response, fully read
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final URL (differs from the requested one only if redirects were followed)
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

/// Source of pages for the crawl engine
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GETs `url`
    ///
    /// Any status code is a successful fetch; only transport failures are
    /// errors. Deadlines are imposed by the caller.
    async fn fetch(&self, url: &str, follow_redirects: bool) -> Result<FetchedResponse, CrawlError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `default_headers` - Headers sent with every request
/// * `redirect` - Redirect policy of this client
///
/// # Example
///
/// ```no_run
/// use gcrawl::config::UserAgentConfig;
/// use gcrawl::crawler::{build_http_client, default_headers};
/// use reqwest::redirect::Policy;
///
/// let config = UserAgentConfig {
///     crawler_name: "gcrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, default_headers(), Policy::none()).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    default_headers: HeaderMap,
    redirect: Policy,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Headers sent with every crawl request
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    direct: Client,
    following: Client,
    robots: Client,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with `config`
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Self::with_headers(config, default_headers())
    }

    /// Creates a fetcher that sends `headers` with every request
    pub fn with_headers(config: &UserAgentConfig, headers: HeaderMap) -> Result<Self, reqwest::Error> {
        Ok(Self {
            direct: build_http_client(config, headers.clone(), Policy::none())?,
            following: build_http_client(config, headers.clone(), Policy::limited(MAX_REDIRECTS))?,
            robots: build_http_client(config, headers, Policy::limited(MAX_ROBOTS_REDIRECTS))?,
        })
    }

    /// The client for robots.txt downloads
    pub fn robots_client(&self) -> &Client {
        &self.robots
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, follow_redirects: bool) -> Result<FetchedResponse, CrawlError> {
        let client = if follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?;

        Ok(FetchedResponse {
            url: final_url,
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
