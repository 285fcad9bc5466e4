//! Customization points of the crawl loop
//!
//! Every method of [`CrawlHooks`] has a default, so an implementation only
//! overrides what it needs. The default policies are also available as free
//! functions for overrides that want to extend rather than replace them.

use crate::crawler::{CrawlConfig, Frontier};
use crate::page::PageView;
use crate::url::is_local;
use crate::CrawlError;
use std::time::Duration;

/// Status codes treated as redirects by the default policies
pub const REDIRECT_CODES: [u16; 4] = [301, 302, 303, 307];

/// Returns true if `status` is one of [`REDIRECT_CODES`]
pub fn is_redirect(status: u16) -> bool {
    REDIRECT_CODES.contains(&status)
}

/// Caller policy for one crawl
///
/// Per fetched page the engine calls `on_fetched`, then `should_count`,
/// then `delay`, always in that order.
pub trait CrawlHooks: Send {
    /// Record type collected by the crawl
    type Output: Send;

    /// Runs once before the first fetch
    fn before(&mut self, _config: &CrawlConfig) {}

    /// Runs once after the loop ends, before results are returned
    fn after(&mut self, _config: &CrawlConfig) {}

    /// Handles a fetched page: extends the frontier and optionally produces a
    /// record
    ///
    /// An error skips the rest of the iteration (the page is not counted and
    /// no delay is applied).
    fn on_fetched(
        &mut self,
        page: &PageView,
        frontier: &mut Frontier,
        _config: &CrawlConfig,
    ) -> anyhow::Result<Option<Self::Output>> {
        default_on_fetched(page, frontier);
        Ok(None)
    }

    /// Whether this page counts toward the page budget
    fn should_count(&mut self, page: &PageView, _config: &CrawlConfig) -> bool {
        default_should_count(page)
    }

    /// Pause to take after this page
    fn delay(&mut self, page: &PageView, config: &CrawlConfig) -> Duration {
        default_delay(page, config)
    }

    /// Called when a fetch exceeds its deadline; may produce a record
    fn on_exception(
        &mut self,
        _url: &str,
        _error: &CrawlError,
        _config: &CrawlConfig,
    ) -> Option<Self::Output> {
        None
    }
}

/// Enqueues the redirect target of a redirect, or every followable link
pub fn default_on_fetched(page: &PageView, frontier: &mut Frontier) {
    if is_redirect(page.status()) {
        if let Some(target) = page.redirection() {
            frontier.push(target);
        }
    } else {
        frontier.extend(page.links().follow.iter().cloned());
    }
}

/// Counts every page except redirects
pub fn default_should_count(page: &PageView) -> bool {
    !is_redirect(page.status())
}

/// No pause for local hosts, the configured politeness delay otherwise
pub fn default_delay(page: &PageView, config: &CrawlConfig) -> Duration {
    if is_local(page.url()) {
        Duration::ZERO
    } else {
        config.politeness_delay
    }
}

/// Hooks that keep every default and collect nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl CrawlHooks for DefaultHooks {
    type Output = ();
}
