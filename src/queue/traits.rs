//! Queue trait and error types
//!
//! This module defines the interface the worker pool pulls jobs through and
//! the records a queue keeps about them.

use crate::worker::{Job, JobOutcome};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Job {0} is not running")]
    NotRunning(i64),

    #[error("Queue connection lock was poisoned")]
    Poisoned,
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Source of crawl jobs shared by every worker slot
///
/// `pop` must hand each job to exactly one caller, and `complete` must be
/// accepted once per popped job.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Takes the next pending job, if any
    async fn pop(&self) -> QueueResult<Option<Job>>;

    /// Records how a popped job ended
    async fn complete(&self, job: &Job, outcome: JobOutcome) -> QueueResult<()>;
}

/// Lifecycle state of a queued job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl From<&JobOutcome> for JobState {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed => Self::Completed,
            JobOutcome::Failed(_) => Self::Failed,
        }
    }
}

/// A job along with its queue bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job: Job,
    pub state: JobState,
    pub enqueued_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub error_message: Option<String>,
}

/// Number of jobs in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.running + self.completed + self.failed
    }
}
