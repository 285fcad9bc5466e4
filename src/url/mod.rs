//! URL handling module for gcrawl
//!
//! This module provides URL canonicalization (resolution, parameter
//! blacklisting, path normalization, re-encoding) and host relationship
//! classification between two URLs.

mod domain;
mod sanitize;

pub use domain::{extract_host, is_within_scope, relationship, Relationship};
pub use sanitize::{sanitize, ParamBlacklist};

/// Returns true if `url` points at the local machine
///
/// Local hosts are exempt from the politeness delay.
pub fn is_local(url: &str) -> bool {
    matches!(
        extract_host(url).as_deref(),
        Some("localhost") | Some("127.0.0.1")
    )
}
