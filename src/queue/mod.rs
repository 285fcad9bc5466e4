//! Job queue for the worker pool
//!
//! This module handles the queue crawl jobs are pulled from, including:
//! - The [`JobQueue`] interface the worker pool depends on
//! - A SQLite-backed implementation with schema management
//! - Job state tracking (pending, running, completed, failed)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteQueue;
pub use traits::{JobQueue, JobRecord, JobState, QueueCounts, QueueError, QueueResult};
