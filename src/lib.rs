//! gcrawl: a polite, bounded web crawler engine
//!
//! This crate fetches pages starting from a seed URL, extracts and classifies
//! outbound links, respects robots-exclusion signals, and accumulates
//! caller-defined results. A bounded worker pool pulls crawl jobs from a queue
//! and runs many crawls concurrently.

pub mod config;
pub mod crawler;
pub mod output;
pub mod page;
pub mod queue;
pub mod robots;
pub mod url;
pub mod worker;

use thiserror::Error;

/// Main error type for gcrawl operations
#[derive(Debug, Error)]
pub enum GcrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while processing a single crawl iteration
///
/// None of these ever escape [`crawler::CrawlEngine::run`]; they are logged
/// with the offending URL and the iteration is skipped. Malformed pages are
/// not errors: parsing degrades to empty or partial results.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Hook failed for {url}: {reason}")]
    Hook { url: String, reason: anyhow::Error },
}

impl CrawlError {
    /// The URL the failed iteration was working on
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url }
            | Self::Hook { url, .. } => url,
        }
    }

    /// Returns true if this error is a deadline being exceeded
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for gcrawl operations
pub type Result<T> = std::result::Result<T, GcrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlConfig, CrawlEngine, CrawlHooks, Frontier};
pub use page::{LinkSet, PageView};
pub use robots::RobotsEvaluator;
pub use crate::url::{relationship, sanitize, Relationship};
pub use worker::{Job, WorkerPool};
