//! SQLite job queue
//!
//! Popping is a single `UPDATE ... RETURNING` statement, so a job is handed
//! out once even when several processes share the database file.

use crate::queue::schema::initialize_schema;
use crate::queue::traits::{JobQueue, JobRecord, JobState, QueueCounts, QueueError, QueueResult};
use crate::worker::{Job, JobOutcome};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Job queue stored in a SQLite database
pub struct SqliteQueue {
    conn: Mutex<Connection>,
}

impl SqliteQueue {
    /// Opens (or creates) the queue database at `path`
    pub fn open(path: &Path) -> QueueResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory queue
    pub fn open_in_memory() -> QueueResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> QueueResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| QueueError::Poisoned)
    }

    /// Adds a pending job and returns it with its assigned id
    pub fn enqueue(&self, seed: &str, allow_subdomains: bool, max_pages: u32) -> QueueResult<Job> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO jobs (seed, allow_subdomains, max_pages, state, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seed,
                allow_subdomains,
                max_pages,
                JobState::Pending.to_db_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!("Enqueued job {} for {}", id, seed);

        Ok(Job {
            id,
            seed: seed.to_string(),
            allow_subdomains,
            max_pages,
        })
    }

    /// Puts jobs left running by a dead worker back to pending
    ///
    /// # Returns
    ///
    /// The number of jobs requeued
    pub fn requeue_stalled(&self) -> QueueResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "UPDATE jobs SET state = ?1, started_at = NULL WHERE state = ?2",
            params![
                JobState::Pending.to_db_string(),
                JobState::Running.to_db_string()
            ],
        )?;
        Ok(count)
    }

    /// Looks up a job by id
    pub fn get(&self, id: i64) -> QueueResult<Option<JobRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, seed, allow_subdomains, max_pages, state, enqueued_at, started_at,
                    finished_at, error_message
             FROM jobs WHERE id = ?1",
        )?;

        let record = stmt
            .query_row(params![id], |row| {
                Ok(JobRecord {
                    job: job_from_row(row)?,
                    state: JobState::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(JobState::Pending),
                    enqueued_at: row.get(5)?,
                    started_at: row.get(6)?,
                    finished_at: row.get(7)?,
                    error_message: row.get(8)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    /// Number of jobs in each state
    pub fn counts(&self) -> QueueResult<QueueCounts> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let (state, count) = row?;
            let count = u64::try_from(count).unwrap_or(0);
            match JobState::from_db_string(&state) {
                Some(JobState::Pending) => counts.pending = count,
                Some(JobState::Running) => counts.running = count,
                Some(JobState::Completed) => counts.completed = count,
                Some(JobState::Failed) => counts.failed = count,
                None => tracing::warn!("Ignoring {} jobs in unknown state '{}'", count, state),
            }
        }
        Ok(counts)
    }

    fn pop_blocking(&self) -> QueueResult<Option<Job>> {
        let conn = self.conn()?;
        let job = conn
            .query_row(
                "UPDATE jobs SET state = ?1, started_at = ?2
                 WHERE id = (SELECT id FROM jobs WHERE state = ?3 ORDER BY id LIMIT 1)
                 RETURNING id, seed, allow_subdomains, max_pages",
                params![
                    JobState::Running.to_db_string(),
                    Utc::now().to_rfc3339(),
                    JobState::Pending.to_db_string()
                ],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn complete_blocking(&self, job: &Job, outcome: &JobOutcome) -> QueueResult<()> {
        let error_message = match outcome {
            JobOutcome::Completed => None,
            JobOutcome::Failed(reason) => Some(reason.as_str()),
        };

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE jobs SET state = ?1, finished_at = ?2, error_message = ?3
             WHERE id = ?4 AND state = ?5",
            params![
                JobState::from(outcome).to_db_string(),
                Utc::now().to_rfc3339(),
                error_message,
                job.id,
                JobState::Running.to_db_string()
            ],
        )?;

        if updated == 0 {
            return Err(QueueError::NotRunning(job.id));
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for SqliteQueue {
    async fn pop(&self) -> QueueResult<Option<Job>> {
        self.pop_blocking()
    }

    async fn complete(&self, job: &Job, outcome: JobOutcome) -> QueueResult<()> {
        self.complete_blocking(job, &outcome)
    }
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        seed: row.get(1)?,
        allow_subdomains: row.get(2)?,
        max_pages: row.get(3)?,
    })
}
