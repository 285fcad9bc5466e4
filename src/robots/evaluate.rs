//! Combined robots decision
//!
//! A URL is allowed only if robots.txt, the `X-Robots-Tag` response header and
//! the page's meta robots tags all permit it.

use crate::robots::{ParsedRobots, RobotsCache};
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Looks up the robots.txt record that governs a URL
pub trait RobotsResolver: Send + Sync {
    /// Returns the record for `url`, or `None` when there is none
    fn resolve(&self, url: &str) -> Option<Arc<ParsedRobots>>;
}

/// Merges robots.txt, `X-Robots-Tag` and meta robots into one decision
#[derive(Clone)]
pub struct RobotsEvaluator {
    resolver: Arc<dyn RobotsResolver>,
}

impl RobotsEvaluator {
    /// Creates an evaluator backed by `resolver`
    pub fn new(resolver: Arc<dyn RobotsResolver>) -> Self {
        Self { resolver }
    }

    /// Decides whether `url` may be indexed by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - Canonical URL of the page
    /// * `user_agent` - Agent string; bot-specific directives must match it exactly
    /// * `headers` - Response headers, if the page was fetched
    /// * `meta_robots` - Meta robots directives keyed by meta name
    ///   (`"robots"` or a bot name)
    pub fn allowed(
        &self,
        url: &str,
        user_agent: &str,
        headers: Option<&HeaderMap>,
        meta_robots: Option<&HashMap<String, String>>,
    ) -> bool {
        let robots_txt = self
            .resolver
            .resolve(url)
            .map_or(true, |robots| robots.is_allowed(url, user_agent));
        let header = headers.map_or(true, |h| header_allows(h, user_agent));
        let meta = meta_robots.map_or(true, |m| meta_allows(m, user_agent));

        robots_txt && header && meta
    }

    /// The robots.txt record governing `url`, if one is known
    pub fn robots_for(&self, url: &str) -> Option<Arc<ParsedRobots>> {
        self.resolver.resolve(url)
    }
}

impl Default for RobotsEvaluator {
    /// An evaluator with no robots.txt records
    fn default() -> Self {
        Self::new(Arc::new(RobotsCache::new()))
    }
}

impl std::fmt::Debug for RobotsEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotsEvaluator").finish_non_exhaustive()
    }
}

/// Checks every `X-Robots-Tag` value
///
/// `agent: directive` values only apply when the agent matches exactly. Any
/// other value is treated as a directive for all bots, and its part before
/// the first colon is checked.
pub fn header_allows(headers: &HeaderMap, user_agent: &str) -> bool {
    headers
        .get_all("x-robots-tag")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .all(|value| {
            let (bot, directive) = value.split_once(':').unwrap_or((value, ""));
            if !directive.is_empty() && bot == user_agent {
                !forbids_indexing(directive)
            } else {
                !forbids_indexing(bot)
            }
        })
}

/// Checks the bot-specific and the generic meta robots directives together
///
/// Meta names are keyed in lowercase, so the agent is looked up lowercased.
pub fn meta_allows(meta_robots: &HashMap<String, String>, user_agent: &str) -> bool {
    let specific = meta_robots
        .get(&user_agent.to_lowercase())
        .map(String::as_str)
        .unwrap_or("");
    let generic = meta_robots.get("robots").map(String::as_str).unwrap_or("");
    !forbids_indexing(&format!("{}{}", specific, generic))
}

fn forbids_indexing(directive: &str) -> bool {
    directive.contains("noindex") || directive.contains("none")
}
