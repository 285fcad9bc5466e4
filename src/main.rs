//! gcrawl main entry point
//!
//! This is the command-line interface for the gcrawl crawler and its worker.

use anyhow::Context;
use clap::{Parser, Subcommand};
use gcrawl::config::{load_config_with_hash, Config};
use gcrawl::crawler::HttpFetcher;
use gcrawl::queue::SqliteQueue;
use gcrawl::worker::{report_hooks, CrawlJobHandler, Job, WorkerPool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// gcrawl: a polite, bounded web crawler
///
/// Crawls a site from a seed URL within a page budget, following robots.txt,
/// X-Robots-Tag and meta robots directives. Jobs can be run directly or
/// queued for a pool of workers.
#[derive(Parser, Debug)]
#[command(name = "gcrawl")]
#[command(version)]
#[command(about = "A polite, bounded web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one seed in this process and print the page reports as JSON
    Crawl {
        seed: String,

        /// Page budget (defaults to crawler.max-pages)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Follow links to subdomains of the seed
        #[arg(long)]
        allow_subdomains: bool,
    },

    /// Add crawl jobs to the queue
    Enqueue {
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Page budget per job (defaults to crawler.max-pages)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Follow links to subdomains of each seed
        #[arg(long)]
        allow_subdomains: bool,
    },

    /// Run queued jobs until interrupted with Ctrl-C
    Work,

    /// Show how many jobs are in each state
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Crawl {
            seed,
            max_pages,
            allow_subdomains,
        } => handle_crawl(&config, seed, max_pages, allow_subdomains).await,
        Command::Enqueue {
            seeds,
            max_pages,
            allow_subdomains,
        } => handle_enqueue(&config, &seeds, max_pages, allow_subdomains),
        Command::Work => handle_work(&config).await,
        Command::Status => handle_status(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gcrawl=info,warn"),
            1 => EnvFilter::new("gcrawl=debug,info"),
            2 => EnvFilter::new("gcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_queue(config: &Config) -> anyhow::Result<SqliteQueue> {
    let path = Path::new(&config.worker.queue_path);
    SqliteQueue::open(path).with_context(|| format!("Failed to open queue at {}", path.display()))
}

/// Runs a single crawl and prints its reports to stdout
async fn handle_crawl(
    config: &Config,
    seed: String,
    max_pages: Option<u32>,
    allow_subdomains: bool,
) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let handler = CrawlJobHandler::new(
        config.crawler.clone(),
        fetcher,
        &config.worker.output_dir,
        report_hooks(&config.user_agent.crawler_name),
    );

    let job = Job {
        id: 0,
        seed,
        allow_subdomains: allow_subdomains || config.crawler.allow_subdomains,
        max_pages: max_pages.unwrap_or(config.crawler.max_pages),
    };

    let reports = handler.crawl(&job).await?;
    tracing::info!("Crawled {} pages from {}", reports.len(), job.seed);
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(())
}

fn handle_enqueue(
    config: &Config,
    seeds: &[String],
    max_pages: Option<u32>,
    allow_subdomains: bool,
) -> anyhow::Result<()> {
    let queue = open_queue(config)?;
    let max_pages = max_pages.unwrap_or(config.crawler.max_pages);
    let allow_subdomains = allow_subdomains || config.crawler.allow_subdomains;

    for seed in seeds {
        let job = queue.enqueue(seed, allow_subdomains, max_pages)?;
        println!("Enqueued job {} for {}", job.id, job.seed);
    }

    Ok(())
}

/// Runs the worker pool against the queue until Ctrl-C
async fn handle_work(config: &Config) -> anyhow::Result<()> {
    let queue = open_queue(config)?;
    let requeued = queue.requeue_stalled()?;
    if requeued > 0 {
        tracing::warn!("Requeued {} jobs left running by a previous worker", requeued);
    }

    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let handler = CrawlJobHandler::new(
        config.crawler.clone(),
        fetcher,
        &config.worker.output_dir,
        report_hooks(&config.user_agent.crawler_name),
    );

    let pool = WorkerPool::from_config(&config.worker);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    let started = pool
        .run_until(Arc::new(queue), Arc::new(handler), shutdown)
        .await;
    tracing::info!("Worker stopped after starting {} jobs", started);

    Ok(())
}

fn handle_status(config: &Config) -> anyhow::Result<()> {
    let counts = open_queue(config)?.counts()?;

    println!("Queue: {}\n", config.worker.queue_path);
    println!("  Pending:   {}", counts.pending);
    println!("  Running:   {}", counts.running);
    println!("  Completed: {}", counts.completed);
    println!("  Failed:    {}", counts.failed);
    println!("  Total:     {}", counts.total());

    Ok(())
}
