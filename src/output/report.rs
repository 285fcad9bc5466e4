//! Per-page crawl reports
//!
//! [`ReportHooks`] is the crawl policy used by the CLI and the worker: it keeps
//! the crawl inside the seed's site, skips links robots.txt disallows, honors
//! `Crawl-delay`, and records a [`PageReport`] for every counted page.

use crate::crawler::{default_delay, is_redirect, CrawlConfig, CrawlHooks, Frontier};
use crate::page::PageView;
use crate::robots::RobotsEvaluator;
use crate::url::{is_local, is_within_scope};
use serde::Serialize;
use std::time::Duration;

/// What was learned about one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    /// Canonical URL of the page
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Contents of `<title>`, if any
    pub title: Option<String>,

    /// Followable links found on the page
    pub follow: Vec<String>,

    /// Links the page asked not to follow
    pub nofollow: Vec<String>,

    /// Target of a `Location` or `Refresh` header
    pub redirect: Option<String>,

    /// Whether robots signals allow indexing the page
    pub indexable: bool,
}

impl PageReport {
    pub fn from_page(page: &PageView, indexable: bool) -> Self {
        let links = page.links();
        Self {
            url: page.url().to_string(),
            status: page.status(),
            title: page.title(),
            follow: links.follow.clone(),
            nofollow: links.nofollow.clone(),
            redirect: page.redirection().map(str::to_string),
            indexable,
        }
    }
}

/// Crawl policy producing one [`PageReport`] per counted page
#[derive(Debug, Clone)]
pub struct ReportHooks {
    evaluator: RobotsEvaluator,
    agent: String,
    skipped: usize,
}

impl ReportHooks {
    /// Creates the policy
    ///
    /// # Arguments
    ///
    /// * `evaluator` - Robots decisions for links and pages
    /// * `agent` - Bot name matched against robots.txt groups, meta names and
    ///   `X-Robots-Tag` prefixes
    pub fn new(evaluator: RobotsEvaluator, agent: impl Into<String>) -> Self {
        Self {
            evaluator,
            agent: agent.into(),
            skipped: 0,
        }
    }

    /// Number of links left out of the frontier so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn enqueue(&mut self, frontier: &mut Frontier, url: &str, config: &CrawlConfig) {
        let in_scope = is_within_scope(&config.seed, url, config.allow_subdomains);
        if in_scope && self.evaluator.allowed(url, &self.agent, None, None) {
            frontier.push(url.to_string());
        } else {
            tracing::trace!("Not following {}", url);
            self.skipped += 1;
        }
    }
}

impl CrawlHooks for ReportHooks {
    type Output = PageReport;

    fn after(&mut self, config: &CrawlConfig) {
        if self.skipped > 0 {
            tracing::debug!(
                "Skipped {} out-of-scope or disallowed links while crawling {}",
                self.skipped,
                config.seed
            );
        }
    }

    fn on_fetched(
        &mut self,
        page: &PageView,
        frontier: &mut Frontier,
        config: &CrawlConfig,
    ) -> anyhow::Result<Option<PageReport>> {
        if is_redirect(page.status()) {
            if let Some(target) = page.redirection() {
                self.enqueue(frontier, target, config);
            }
            return Ok(None);
        }

        for link in &page.links().follow {
            self.enqueue(frontier, link, config);
        }

        let indexable = page.is_indexable(&self.evaluator, &self.agent);
        Ok(Some(PageReport::from_page(page, indexable)))
    }

    /// The longer of the politeness delay and the site's `Crawl-delay`
    fn delay(&mut self, page: &PageView, config: &CrawlConfig) -> Duration {
        let delay = default_delay(page, config);
        if is_local(page.url()) {
            return delay;
        }

        self.evaluator
            .robots_for(page.url())
            .and_then(|robots| robots.crawl_delay(&self.agent))
            .map_or(delay, |crawl_delay| crawl_delay.max(delay))
    }
}
