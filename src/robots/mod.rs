//! Robots exclusion handling
//!
//! This module fetches, parses and caches robots.txt files, and combines them
//! with `X-Robots-Tag` headers and meta robots tags into a single decision.

mod cache;
mod evaluate;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use evaluate::{header_allows, meta_allows, RobotsEvaluator, RobotsResolver};
pub use parser::ParsedRobots;
