//! The per-job crawl loop
//!
//! Pops a URL, fetches it under a deadline, hands the page to the hooks and
//! pauses politely, until the frontier is empty or the page budget is spent.
//! Nothing that goes wrong inside one iteration ends the crawl.

use crate::config::CrawlerConfig;
use crate::crawler::{CrawlHooks, Fetcher, FetchedResponse, Frontier};
use crate::page::PageView;
use crate::url::{sanitize, ParamBlacklist};
use crate::CrawlError;
use std::time::Duration;

/// Settings of one crawl, fixed for its whole run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Canonical URL the crawl starts from
    pub seed: String,
    /// Number of counted pages after which the crawl stops
    pub max_pages: u32,
    /// Whether subdomain links are in scope (read by hooks)
    pub allow_subdomains: bool,
    /// Whether the fetcher follows redirects itself
    pub allow_redirects: bool,
    /// Deadline for each fetch and each politeness delay
    pub timeout: Duration,
    /// Pause after a page from a non-local host
    pub politeness_delay: Duration,
    /// Parameters stripped from the seed, links and redirect targets
    pub param_blacklist: ParamBlacklist,
}

impl CrawlConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_POLITENESS_DELAY: Duration = Duration::from_secs(2);

    /// Creates a config with default settings; `seed` is canonicalized
    pub fn new(seed: &str, max_pages: u32) -> Self {
        Self {
            seed: sanitize(seed, None, None),
            max_pages,
            allow_subdomains: false,
            allow_redirects: true,
            timeout: Self::DEFAULT_TIMEOUT,
            politeness_delay: Self::DEFAULT_POLITENESS_DELAY,
            param_blacklist: ParamBlacklist::default(),
        }
    }

    /// Creates a config for one job using the file-level crawler settings
    pub fn from_settings(
        seed: &str,
        max_pages: u32,
        allow_subdomains: bool,
        settings: &CrawlerConfig,
    ) -> Self {
        Self::new(seed, max_pages)
            .with_allow_subdomains(allow_subdomains)
            .with_allow_redirects(settings.allow_redirects)
            .with_timeout(settings.timeout())
            .with_politeness_delay(settings.politeness_delay())
            .with_param_blacklist(settings.param_blacklist())
    }

    pub fn with_allow_subdomains(mut self, allow: bool) -> Self {
        self.allow_subdomains = allow;
        self
    }

    pub fn with_allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = allow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    /// Sets the blacklist and re-canonicalizes the seed with it
    pub fn with_param_blacklist(mut self, blacklist: ParamBlacklist) -> Self {
        self.seed = sanitize(&self.seed, None, Some(&blacklist));
        self.param_blacklist = blacklist;
        self
    }
}

/// Runs one crawl from a seed URL
pub struct CrawlEngine<F, H: CrawlHooks> {
    config: CrawlConfig,
    fetcher: F,
    hooks: H,
    frontier: Frontier,
    crawled: u32,
    results: Vec<H::Output>,
}

impl<F, H> CrawlEngine<F, H>
where
    F: Fetcher,
    H: CrawlHooks,
{
    /// Creates an engine whose frontier holds only the seed
    pub fn new(config: CrawlConfig, fetcher: F, hooks: H) -> Self {
        Self {
            frontier: Frontier::with_seed(config.seed.clone()),
            config,
            fetcher,
            hooks,
            crawled: 0,
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls until the frontier is empty or `max_pages` pages were counted
    ///
    /// Per-page failures are logged and skipped, so whatever was collected
    /// is always returned.
    pub async fn run(mut self) -> Vec<H::Output> {
        tracing::info!(
            "Starting crawl of {} (budget: {} pages)",
            self.config.seed,
            self.config.max_pages
        );
        self.hooks.before(&self.config);

        while self.crawled < self.config.max_pages {
            let Some(url) = self.frontier.pop() else {
                tracing::debug!("Frontier is empty");
                break;
            };
            tracing::debug!("Fetching {}", url);

            let fetched = tokio::time::timeout(
                self.config.timeout,
                self.fetcher.fetch(&url, self.config.allow_redirects),
            )
            .await;

            let response = match fetched {
                Ok(Ok(response)) => response,
                Ok(Err(error)) => {
                    self.fetch_failed(&url, error);
                    continue;
                }
                Err(_) => {
                    self.fetch_failed(&url, CrawlError::Timeout { url: url.clone() });
                    continue;
                }
            };

            let delay = match self.process(response) {
                Ok(delay) => delay,
                Err(error) => {
                    tracing::warn!("{}", error);
                    continue;
                }
            };

            if !delay.is_zero()
                && tokio::time::timeout(self.config.timeout, tokio::time::sleep(delay))
                    .await
                    .is_err()
            {
                tracing::warn!(
                    "Politeness delay of {:?} after {} exceeded the {:?} deadline",
                    delay,
                    url,
                    self.config.timeout
                );
            }
        }

        self.hooks.after(&self.config);
        tracing::info!(
            "Finished crawl of {}: {} pages counted, {} records, {} URLs left",
            self.config.seed,
            self.crawled,
            self.results.len(),
            self.frontier.len()
        );
        self.results
    }

    /// Runs the page hooks and returns the delay to apply
    ///
    /// The page is dropped before returning, so it never lives across an
    /// `.await` of the loop.
    fn process(&mut self, response: FetchedResponse) -> Result<Duration, CrawlError> {
        let page = PageView::new(response).with_param_blacklist(&self.config.param_blacklist);

        match self
            .hooks
            .on_fetched(&page, &mut self.frontier, &self.config)
        {
            Ok(Some(record)) => self.results.push(record),
            Ok(None) => {}
            Err(reason) => {
                return Err(CrawlError::Hook {
                    url: page.url().to_string(),
                    reason,
                })
            }
        }

        if self.hooks.should_count(&page, &self.config) {
            self.crawled += 1;
        }

        Ok(self.hooks.delay(&page, &self.config))
    }

    fn fetch_failed(&mut self, url: &str, error: CrawlError) {
        if error.is_timeout() {
            tracing::warn!("Timed out fetching {} after {:?}", url, self.config.timeout);
            if let Some(record) = self.hooks.on_exception(url, &error, &self.config) {
                self.results.push(record);
            }
        } else {
            tracing::warn!("{}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{default_on_fetched, DefaultHooks};
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
    use std::sync::{Arc, Mutex};

    /// Serves `http://localhost/<n>` pages that link to `<n+1>` and `<n+2>`
    /// forever, plus a few special paths.
    #[derive(Clone, Default)]
    struct FakeWeb {
        requested: Arc<Mutex<Vec<String>>>,
    }

    impl FakeWeb {
        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for FakeWeb {
        async fn fetch(
            &self,
            url: &str,
            _follow_redirects: bool,
        ) -> Result<FetchedResponse, CrawlError> {
            self.requested.lock().unwrap().push(url.to_string());
            let path = url.trim_start_matches("http://localhost/");
            let mut headers = HeaderMap::new();
            let (status, body) = match path {
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    (200, String::new())
                }
                "broken" => {
                    return Err(CrawlError::Transport {
                        url: url.to_string(),
                        message: "connection reset".to_string(),
                    })
                }
                "moved" => {
                    headers.insert(LOCATION, HeaderValue::from_static("/0"));
                    (302, r#"<a href="/ignored">i</a>"#.to_string())
                }
                "hub" => (
                    200,
                    r#"<a href="/slow">s</a><a href="/broken">b</a><a href="/5">5</a>"#.to_string(),
                ),
                n => {
                    let n: u32 = n.parse().unwrap_or(0);
                    (
                        200,
                        format!(r#"<a href="/{}">a</a><a href="/{}">b</a>"#, n + 1, n + 2),
                    )
                }
            };
            Ok(FetchedResponse {
                url: url.to_string(),
                status,
                headers,
                body: body.into_bytes(),
            })
        }
    }

    /// Records every hook call and returns each fetched URL as a record
    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl CrawlHooks for Recorder {
        type Output = String;

        fn before(&mut self, _config: &CrawlConfig) {
            self.events.lock().unwrap().push("before".to_string());
        }

        fn after(&mut self, _config: &CrawlConfig) {
            self.events.lock().unwrap().push("after".to_string());
        }

        fn on_fetched(
            &mut self,
            page: &PageView,
            frontier: &mut Frontier,
            _config: &CrawlConfig,
        ) -> anyhow::Result<Option<String>> {
            if self.fail_on.is_some_and(|fail| page.url().ends_with(fail)) {
                anyhow::bail!("refusing {}", page.url());
            }
            default_on_fetched(page, frontier);
            Ok(Some(page.url().to_string()))
        }

        fn on_exception(
            &mut self,
            url: &str,
            error: &CrawlError,
            _config: &CrawlConfig,
        ) -> Option<String> {
            assert!(error.is_timeout());
            Some(format!("timeout {}", url))
        }
    }

    fn config(seed: &str, max_pages: u32) -> CrawlConfig {
        CrawlConfig::new(seed, max_pages).with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_budget_on_infinite_graph() {
        let web = FakeWeb::default();
        let engine = CrawlEngine::new(config("http://localhost/0", 3), web.clone(), Recorder::default());
        let results = engine.run().await;

        assert_eq!(results.len(), 3);
        assert_eq!(web.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_frontier_is_fifo() {
        let web = FakeWeb::default();
        let engine = CrawlEngine::new(config("http://localhost/0", 5), web.clone(), DefaultHooks);
        engine.run().await;

        // 0 -> [1, 2]; 1 -> [2, 3]; 2 -> [3, 4] ...
        assert_eq!(
            web.requested(),
            vec![
                "http://localhost/0",
                "http://localhost/1",
                "http://localhost/2",
                "http://localhost/2",
                "http://localhost/3",
            ]
        );
    }

    #[tokio::test]
    async fn test_redirect_not_counted() {
        let web = FakeWeb::default();
        let engine = CrawlEngine::new(config("http://localhost/moved", 2), web.clone(), Recorder::default());
        let results = engine.run().await;

        assert_eq!(
            web.requested(),
            vec!["http://localhost/moved", "http://localhost/0", "http://localhost/1"]
        );
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_crawl() {
        let web = FakeWeb::default();
        let engine = CrawlEngine::new(config("http://localhost/hub", 2), web.clone(), Recorder::default());
        let results = engine.run().await;

        assert_eq!(
            web.requested(),
            vec![
                "http://localhost/hub",
                "http://localhost/slow",
                "http://localhost/broken",
                "http://localhost/5",
            ]
        );
        assert_eq!(
            results,
            vec![
                "http://localhost/hub".to_string(),
                "timeout http://localhost/slow".to_string(),
                "http://localhost/5".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_hook_error_skips_page() {
        let web = FakeWeb::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        let hooks = Recorder {
            events: Arc::clone(&events),
            fail_on: Some("/0"),
        };
        let engine = CrawlEngine::new(config("http://localhost/0", 1), web.clone(), hooks);
        let results = engine.run().await;

        // the seed failed in on_fetched, so nothing was enqueued or counted
        assert!(results.is_empty());
        assert_eq!(web.requested(), vec!["http://localhost/0"]);
        assert_eq!(*events.lock().unwrap(), vec!["before", "after"]);
    }

    #[tokio::test]
    async fn test_delay_deadline_is_not_fatal() {
        let web = FakeWeb::default();
        let config = CrawlConfig::new("http://remote.test/0", 2)
            .with_timeout(Duration::from_millis(50))
            .with_politeness_delay(Duration::from_secs(10));
        let engine = CrawlEngine::new(config, RemoteWeb(web.clone()), DefaultHooks);

        let run = tokio::time::timeout(Duration::from_secs(5), engine.run()).await;
        assert!(run.is_ok());
        assert_eq!(web.requested().len(), 2);
    }

    /// Same pages as `FakeWeb` under a non-local host, so delays apply
    struct RemoteWeb(FakeWeb);

    #[async_trait]
    impl Fetcher for RemoteWeb {
        async fn fetch(&self, url: &str, follow: bool) -> Result<FetchedResponse, CrawlError> {
            let local = url.replace("http://remote.test/", "http://localhost/");
            let mut response = self.0.fetch(&local, follow).await?;
            response.url = url.to_string();
            Ok(response)
        }
    }

    #[test]
    fn test_config_canonicalizes_seed() {
        let config = CrawlConfig::new("http://Example.COM", 1)
            .with_param_blacklist(ParamBlacklist::new(["sid"]));
        assert_eq!(config.seed, "http://example.com/");

        let config = CrawlConfig::new("http://example.com/?sid=1&a=2", 1)
            .with_param_blacklist(ParamBlacklist::new(["sid"]));
        assert_eq!(config.seed, "http://example.com/?a=2");
    }

    #[test]
    fn test_engine_seeds_frontier() {
        let engine = CrawlEngine::new(config("http://localhost/0", 1), FakeWeb::default(), DefaultHooks);
        assert_eq!(engine.frontier.iter().collect::<Vec<_>>(), vec!["http://localhost/0"]);
        assert_eq!(engine.config().max_pages, 1);
    }
}
