//! Output module for crawl results
//!
//! This module handles:
//! - The report-collecting crawl policy used by the CLI and the worker
//! - Writing per-job result files

mod dump;
mod report;

pub use dump::{dump_path, write_dump};
pub use report::{PageReport, ReportHooks};
