//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - The FIFO [`Frontier`] of pending URLs
//! - The [`CrawlHooks`] customization points and their defaults
//! - The [`CrawlEngine`] loop tying them together

mod engine;
mod fetcher;
mod frontier;
mod hooks;

pub use engine::{CrawlConfig, CrawlEngine};
pub use fetcher::{build_http_client, default_headers, FetchedResponse, Fetcher, HttpFetcher};
pub use frontier::Frontier;
pub use hooks::{
    default_delay, default_on_fetched, default_should_count, is_redirect, CrawlHooks,
    DefaultHooks, REDIRECT_CODES,
};
