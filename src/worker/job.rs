//! Crawl job payload

use crate::config::CrawlerConfig;
use crate::crawler::CrawlConfig;
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// One crawl to run, as handed out by a job queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Queue identity, also names the job's dump file
    pub id: i64,
    pub seed: String,
    pub allow_subdomains: bool,
    pub max_pages: u32,
}

impl Job {
    /// Builds the crawl settings for this job
    ///
    /// This is the setup-time check of a job: the seed must be an absolute
    /// http(s) URL and the budget must be at least one page.
    pub fn crawl_config(&self, settings: &CrawlerConfig) -> Result<CrawlConfig, ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::Validation(format!(
                "job {} has a page budget of 0",
                self.id
            )));
        }

        match url::Url::parse(&self.seed) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
            _ => return Err(ConfigError::InvalidUrl(self.seed.clone())),
        }

        Ok(CrawlConfig::from_settings(
            &self.seed,
            self.max_pages,
            self.allow_subdomains,
            settings,
        ))
    }
}

/// How a job ended, reported back to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
