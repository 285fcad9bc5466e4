//! What the worker pool does with a job

use crate::config::CrawlerConfig;
use crate::crawler::{CrawlEngine, CrawlHooks, HttpFetcher};
use crate::output::{write_dump, ReportHooks};
use crate::robots::{ParsedRobots, RobotsCache, RobotsEvaluator};
use crate::worker::Job;
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs one job to completion
///
/// An `Err` marks the job as failed in the queue; it is reserved for problems
/// that stop the job from running at all, such as an invalid seed.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn process(&self, job: Job) -> anyhow::Result<()>;
}

/// Crawls a job's seed and writes the collected records to
/// `<output-dir>/<job-id>-dump.json`
///
/// `make_hooks` builds the crawl policy of each job from an evaluator that
/// already knows the seed origin's robots.txt.
pub struct CrawlJobHandler<M> {
    settings: CrawlerConfig,
    fetcher: HttpFetcher,
    output_dir: PathBuf,
    make_hooks: M,
}

impl<M, H> CrawlJobHandler<M>
where
    M: Fn(RobotsEvaluator, &Job) -> H + Send + Sync,
    H: CrawlHooks,
{
    pub fn new(
        settings: CrawlerConfig,
        fetcher: HttpFetcher,
        output_dir: impl Into<PathBuf>,
        make_hooks: M,
    ) -> Self {
        Self {
            settings,
            fetcher,
            output_dir: output_dir.into(),
            make_hooks,
        }
    }

    /// Runs the crawl of `job` and returns its records without persisting them
    pub async fn crawl(&self, job: &Job) -> anyhow::Result<Vec<H::Output>> {
        let config = job
            .crawl_config(&self.settings)
            .with_context(|| format!("Job {} cannot be started", job.id))?;

        let robots = Arc::new(RobotsCache::new());
        let prefetch = robots.fetch(self.fetcher.robots_client(), &config.seed);
        if tokio::time::timeout(config.timeout, prefetch).await.is_err() {
            tracing::warn!(
                "Timed out fetching robots.txt for {}, allowing everything",
                config.seed
            );
            robots.insert(&config.seed, ParsedRobots::allow_all());
        }
        let hooks = (self.make_hooks)(RobotsEvaluator::new(robots), job);

        Ok(CrawlEngine::new(config, self.fetcher.clone(), hooks)
            .run()
            .await)
    }
}

#[async_trait]
impl<M, H> JobHandler for CrawlJobHandler<M>
where
    M: Fn(RobotsEvaluator, &Job) -> H + Send + Sync,
    H: CrawlHooks + 'static,
    H::Output: Serialize,
{
    async fn process(&self, job: Job) -> anyhow::Result<()> {
        let records = self.crawl(&job).await?;
        let path = write_dump(&self.output_dir, job.id, &records)
            .with_context(|| format!("Failed to write results of job {}", job.id))?;

        tracing::info!(
            "Job {} collected {} records ({})",
            job.id,
            records.len(),
            path.display()
        );
        Ok(())
    }
}

/// Hook factory producing [`ReportHooks`] that identify as `agent`
pub fn report_hooks(agent: &str) -> impl Fn(RobotsEvaluator, &Job) -> ReportHooks + Send + Sync {
    let agent = agent.to_string();
    move |evaluator: RobotsEvaluator, _job: &Job| ReportHooks::new(evaluator, agent.clone())
}
