use crate::url::ParamBlacklist;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for gcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Per-job crawl defaults
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Pages counted toward the budget before a job stops
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Deadline for each fetch and each politeness delay (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Pause after every fetched page from a non-local host (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Whether the HTTP client follows redirects itself
    #[serde(rename = "allow-redirects", default = "default_true")]
    pub allow_redirects: bool,

    /// Whether links to subdomains of the seed are in scope
    #[serde(rename = "allow-subdomains", default)]
    pub allow_subdomains: bool,

    /// Query/matrix parameter names stripped from every URL
    #[serde(rename = "param-blacklist", default)]
    pub param_blacklist: Vec<String>,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn param_blacklist(&self) -> ParamBlacklist {
        self.param_blacklist.iter().collect()
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Full user agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of jobs running at once
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: usize,

    /// Wait before asking an empty queue again (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Path to the SQLite job queue
    #[serde(rename = "queue-path", default = "default_queue_path")]
    pub queue_path: String,

    /// Directory receiving `<job-id>-dump.json` files
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            poll_interval_ms: default_poll_interval_ms(),
            queue_path: default_queue_path(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_politeness_delay_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_queue_path() -> String {
    "./gcrawl-queue.db".to_string()
}

fn default_output_dir() -> String {
    "./dumps".to_string()
}
