//! Robots.txt cache
//!
//! Records are keyed by origin (`scheme://host[:port]`) and expire after 24
//! hours, after which the origin resolves as if it had never been fetched.

use crate::robots::{ParsedRobots, RobotsResolver};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// How long a fetched robots.txt stays valid
const TTL_HOURS: i64 = 24;

/// A robots.txt record along with when it was fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt
    pub robots: Arc<ParsedRobots>,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Wraps a record stamped with the current time
    pub fn new(robots: ParsedRobots) -> Self {
        Self {
            robots: Arc::new(robots),
            fetched_at: Utc::now(),
        }
    }

    /// Returns true once the record is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(TTL_HOURS)
    }
}

/// In-memory robots.txt store shared by the crawls of one process
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record for the origin of `url`
    ///
    /// Returns false when `url` has no usable origin.
    pub fn insert(&self, url: &str, robots: ParsedRobots) -> bool {
        self.insert_entry(url, CachedRobots::new(robots))
    }

    /// Stores a prebuilt entry for the origin of `url`
    pub fn insert_entry(&self, url: &str, entry: CachedRobots) -> bool {
        let Some(origin) = origin_of(url) else {
            return false;
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(origin, entry);
            true
        } else {
            false
        }
    }

    /// Number of cached origins (stale ones included)
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes sure a fresh record exists for the origin of `url`
    ///
    /// Downloads `<origin>/robots.txt` unless a fresh record is already cached.
    /// A non-success status or a transport failure caches an allow-all
    /// record so the origin is not retried on every page.
    /// The download has no deadline of its own; callers wrap it in one.
    ///
    /// # Returns
    ///
    /// The record for the origin, or `None` if `url` has no usable origin.
    pub async fn fetch(&self, client: &reqwest::Client, url: &str) -> Option<Arc<ParsedRobots>> {
        let origin = origin_of(url)?;
        if let Some(robots) = self.resolve(url) {
            return Some(robots);
        }

        let robots_url = format!("{}/robots.txt", origin);
        tracing::debug!("Fetching {}", robots_url);

        let robots = match client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => ParsedRobots::from_content(&body),
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", robots_url, e);
                    ParsedRobots::allow_all()
                }
            },
            Ok(response) => {
                tracing::debug!(
                    "{} returned {}, allowing everything",
                    robots_url,
                    response.status()
                );
                ParsedRobots::allow_all()
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        };

        let entry = CachedRobots::new(robots);
        let robots = Arc::clone(&entry.robots);
        self.insert_entry(url, entry);
        Some(robots)
    }
}

impl RobotsResolver for RobotsCache {
    fn resolve(&self, url: &str) -> Option<Arc<ParsedRobots>> {
        let origin = origin_of(url)?;
        let entries = self.entries.lock().ok()?;
        entries
            .get(&origin)
            .filter(|entry| !entry.is_stale())
            .map(|entry| Arc::clone(&entry.robots))
    }
}

/// `scheme://host[:port]` for URLs with a tuple origin
fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://Example.com/a/b?c"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            origin_of("http://127.0.0.1:8080/x"),
            Some("http://127.0.0.1:8080".to_string())
        );
        assert_eq!(origin_of("mailto:me@example.com"), None);
        assert_eq!(origin_of("/relative"), None);
    }

    #[test]
    fn test_resolve_by_origin() {
        let cache = RobotsCache::new();
        assert!(cache.insert("http://example.com/", ParsedRobots::from_content("User-agent: *\nDisallow: /")));

        assert!(cache.resolve("http://example.com/deep/page").is_some());
        assert!(cache.resolve("https://example.com/").is_none());
        assert!(cache.resolve("http://other.com/").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_entry_resolves_absent() {
        let cache = RobotsCache::new();
        let mut entry = CachedRobots::new(ParsedRobots::allow_all());
        entry.fetched_at = Utc::now() - Duration::hours(25);
        assert!(entry.is_stale());

        cache.insert_entry("http://example.com/", entry);
        assert!(cache.resolve("http://example.com/").is_none());
    }

    #[test]
    fn test_fresh_entry_not_stale() {
        let entry = CachedRobots::new(ParsedRobots::allow_all());
        assert!(!entry.is_stale());
    }
}
