//! Configuration module for gcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use gcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gcrawl.toml")).unwrap();
//! println!("Running {} jobs at once", config.worker.pool_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, UserAgentConfig, WorkerConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
