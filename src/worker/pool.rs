//! Bounded-concurrency job runner
//!
//! The pool keeps up to `pool_size` jobs in flight. A free slot is taken
//! before popping, so a popped job always starts at once. When the queue is
//! empty the pool waits `poll_interval` before asking again.

use crate::config::WorkerConfig;
use crate::queue::JobQueue;
use crate::worker::{Job, JobHandler, JobOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Runs jobs from a queue, a bounded number at a time
#[derive(Debug, Clone)]
pub struct WorkerPool {
    pool_size: u32,
    poll_interval: Duration,
}

impl WorkerPool {
    /// Creates a pool; a size of 0 is raised to 1
    pub fn new(pool_size: usize, poll_interval: Duration) -> Self {
        Self {
            pool_size: u32::try_from(pool_size).unwrap_or(u32::MAX).max(1),
            poll_interval,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.pool_size, config.poll_interval())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size as usize
    }

    /// Runs jobs until the process is stopped
    pub async fn run<Q, J>(&self, queue: Arc<Q>, handler: Arc<J>)
    where
        Q: JobQueue + ?Sized + 'static,
        J: JobHandler + ?Sized + 'static,
    {
        self.run_until(queue, handler, std::future::pending()).await;
    }

    /// Runs jobs until `shutdown` resolves, then waits for in-flight jobs
    ///
    /// Every started job is completed in the queue exactly once: `Completed`
    /// if the handler succeeded, `Failed` if it returned an error or panicked.
    ///
    /// # Returns
    ///
    /// The number of jobs started
    pub async fn run_until<Q, J, S>(&self, queue: Arc<Q>, handler: Arc<J>, shutdown: S) -> usize
    where
        Q: JobQueue + ?Sized + 'static,
        J: JobHandler + ?Sized + 'static,
        S: Future<Output = ()>,
    {
        let slots = Arc::new(Semaphore::new(self.pool_size()));
        let mut started = 0;
        tokio::pin!(shutdown);

        tracing::info!("Worker pool started with {} slots", self.pool_size);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = match queue.pop().await {
                Ok(Some(job)) => job,
                idle => {
                    if let Err(e) = idle {
                        tracing::error!("Failed to pop a job: {}", e);
                    }
                    drop(permit);

                    let stop = tokio::select! {
                        _ = &mut shutdown => true,
                        _ = tokio::time::sleep(self.poll_interval) => false,
                    };
                    if stop {
                        break;
                    }
                    continue;
                }
            };

            started += 1;
            tracing::info!("Starting job {} ({})", job.id, job.seed);

            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                execute(queue.as_ref(), handler, job).await;
                drop(permit);
            });
        }

        tracing::info!("Shutting down, waiting for jobs in flight");
        if slots.acquire_many(self.pool_size).await.is_err() {
            tracing::warn!("Slot semaphore closed before jobs finished");
        }
        started
    }
}

/// Runs one job in its own task and reports the outcome
async fn execute<Q, J>(queue: &Q, handler: Arc<J>, job: Job)
where
    Q: JobQueue + ?Sized,
    J: JobHandler + ?Sized + 'static,
{
    let task_job = job.clone();
    let result = tokio::spawn(async move { handler.process(task_job).await }).await;

    let outcome = match result {
        Ok(Ok(())) => {
            tracing::info!("Job {} completed", job.id);
            JobOutcome::Completed
        }
        Ok(Err(e)) => {
            tracing::error!("Job {} failed: {:#}", job.id, e);
            JobOutcome::Failed(format!("{:#}", e))
        }
        Err(e) => {
            tracing::error!("Job {} aborted: {}", job.id, e);
            JobOutcome::Failed(format!("job task aborted: {}", e))
        }
    };

    if let Err(e) = queue.complete(&job, outcome).await {
        tracing::error!("Failed to record the outcome of job {}: {}", job.id, e);
    }
}
