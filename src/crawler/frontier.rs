//! Pending URLs of one crawl

use std::collections::VecDeque;

/// FIFO queue of URLs waiting to be fetched
///
/// URLs are not deduplicated; the page budget bounds how often a URL can be
/// revisited.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frontier holding only `seed`
    pub fn with_seed(seed: impl Into<String>) -> Self {
        let mut frontier = Self::new();
        frontier.push(seed);
        frontier
    }

    /// Removes and returns the oldest URL
    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Appends one URL
    pub fn push(&mut self, url: impl Into<String>) {
        self.queue.push_back(url.into());
    }

    /// Appends `urls` in order
    pub fn extend<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queue.extend(urls.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending URLs, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }
}
