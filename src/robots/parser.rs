//! Robots.txt record
//!
//! Wraps the raw robots.txt body of one origin. Allow/deny matching is done by
//! the robotstxt crate; `Crawl-delay` is read directly since that crate does
//! not expose it.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// One origin's robots.txt
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt body (empty means nothing is disallowed)
    content: String,
}

impl ParsedRobots {
    /// Creates a record from a raw robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// A record that allows everything
    ///
    /// Used when robots.txt is missing or could not be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns the raw robots.txt body
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks whether `url` may be fetched by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL (or path) to check
    /// * `user_agent` - The crawler's user agent; the product token is matched
    ///   against `User-agent` groups
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token(user_agent), url)
    }

    /// Returns the `Crawl-delay` that applies to `user_agent`
    ///
    /// A group naming the agent wins over the `*` group. Within a group the
    /// first valid delay is used.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = product_token(user_agent).to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut reading_agents = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // consecutive User-agent lines share one group
                if !reading_agents {
                    group.clear();
                    reading_agents = true;
                }
                group.push(value.to_lowercase());
                continue;
            }
            reading_agents = false;

            if key != "crawl-delay" {
                continue;
            }
            // negative, NaN and out-of-range values are not valid delays
            let Some(delay) = value
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            else {
                continue;
            };
            if group.iter().any(|ua| *ua == agent) {
                specific.get_or_insert(delay);
            } else if group.iter().any(|ua| ua == "*") {
                wildcard.get_or_insert(delay);
            }
        }

        specific.or(wildcard)
    }
}

/// Leading `[A-Za-z_-]` run of a user agent (`gcrawl/0.1 (...)` -> `gcrawl`)
fn product_token(user_agent: &str) -> &str {
    let end = user_agent
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '-' || c == '_'))
        .unwrap_or(user_agent.len());
    &user_agent[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "gcrawl/0.1 (+https://example.com/bot; bot@example.com)";

    #[test]
    fn test_product_token() {
        assert_eq!(product_token(AGENT), "gcrawl");
        assert_eq!(product_token("Foo_Bot-2"), "Foo_Bot-");
        assert_eq!(product_token("foobot"), "foobot");
    }

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("http://example.com/admin", AGENT));
        assert_eq!(robots.crawl_delay(AGENT), None);
    }

    #[test]
    fn test_disallow_everything() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("http://example.com/", AGENT));
        assert!(!robots.is_allowed("http://example.com/page", AGENT));
    }

    #[test]
    fn test_disallow_prefix_with_allow_override() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nDisallow: /private\nAllow: /private/public",
        );
        assert!(robots.is_allowed("http://example.com/", AGENT));
        assert!(!robots.is_allowed("http://example.com/private/x", AGENT));
        assert!(robots.is_allowed("http://example.com/private/public", AGENT));
    }

    #[test]
    fn test_group_for_our_agent() {
        let robots =
            ParsedRobots::from_content("User-agent: gcrawl\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed("http://example.com/page", AGENT));
        assert!(robots.is_allowed("http://example.com/page", "otherbot"));
    }

    #[test]
    fn test_garbage_allows() {
        let robots = ParsedRobots::from_content("This is not a robots.txt {{{");
        assert!(robots.is_allowed("http://example.com/any/path", AGENT));
    }

    #[test]
    fn test_crawl_delay_specific_beats_wildcard() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nCrawl-delay: 10\n\nUser-agent: gcrawl\nCrawl-delay: 2.5",
        );
        assert_eq!(robots.crawl_delay(AGENT), Some(Duration::from_millis(2500)));
        assert_eq!(robots.crawl_delay("otherbot"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let robots = ParsedRobots::from_content(
            "User-agent: BotA\nUser-agent: BotB\nDisallow: /x\nCrawl-delay: 3",
        );
        assert_eq!(robots.crawl_delay("bota"), Some(Duration::from_secs(3)));
        assert_eq!(robots.crawl_delay("BOTB"), Some(Duration::from_secs(3)));
        assert_eq!(robots.crawl_delay("botc"), None);
    }

    #[test]
    fn test_crawl_delay_ignores_junk() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nCrawl-delay: soon # later\nCrawl-delay: -4");
        assert_eq!(robots.crawl_delay(AGENT), None);
    }

    #[test]
    fn test_crawl_delay_out_of_range() {
        for value in ["1e30", "NaN", "inf", "1.8e19"] {
            let robots = ParsedRobots::from_content(&format!("User-agent: *\nCrawl-delay: {}", value));
            assert_eq!(robots.crawl_delay(AGENT), None, "Crawl-delay: {}", value);
        }

        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 1e30\nCrawl-delay: 4");
        assert_eq!(robots.crawl_delay(AGENT), Some(Duration::from_secs(4)));
    }
}
