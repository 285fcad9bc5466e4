//! Worker pool running crawl jobs from a queue
//!
//! This module contains:
//! - The [`Job`] payload and its setup-time validation
//! - The [`JobHandler`] interface and the crawling [`CrawlJobHandler`]
//! - The bounded-concurrency [`WorkerPool`]

mod handler;
mod job;
mod pool;

pub use handler::{report_hooks, CrawlJobHandler, JobHandler};
pub use job::{Job, JobOutcome};
pub use pool::WorkerPool;
