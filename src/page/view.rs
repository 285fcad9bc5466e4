//! One fetched page and everything derived from it
//!
//! Derived values are computed on first access and cached for the lifetime of
//! the view.

use crate::crawler::FetchedResponse;
use crate::page::links::{self, LinkSet};
use crate::page::XmlNode;
use crate::robots::RobotsEvaluator;
use crate::url::{sanitize, ParamBlacklist};
use reqwest::header::{HeaderMap, LOCATION, REFRESH};
use scraper::Html;
use std::cell::OnceCell;
use std::collections::HashMap;

/// A fetched page
///
/// Holds a parsed DOM once [`PageView::html`] has been called, so it is not
/// `Send`; do not keep it across an `.await`.
pub struct PageView {
    url: String,
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    blacklist: Option<ParamBlacklist>,

    text: OnceCell<String>,
    html: OnceCell<Html>,
    xml: OnceCell<XmlNode>,
    redirection: OnceCell<Option<String>>,
    meta_robots: OnceCell<HashMap<String, String>>,
    links: OnceCell<LinkSet>,
}

impl PageView {
    /// Wraps one fetch response
    pub fn new(response: FetchedResponse) -> Self {
        Self {
            url: response.url,
            status: response.status,
            headers: response.headers,
            body: response.body,
            blacklist: None,
            text: OnceCell::new(),
            html: OnceCell::new(),
            xml: OnceCell::new(),
            redirection: OnceCell::new(),
            meta_robots: OnceCell::new(),
            links: OnceCell::new(),
        }
    }

    /// Strips `blacklist` parameters from every derived link and redirect target
    pub fn with_param_blacklist(mut self, blacklist: &ParamBlacklist) -> Self {
        if !blacklist.is_empty() {
            self.blacklist = Some(blacklist.clone());
        }
        self
    }

    /// The URL this page was fetched from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers (case-insensitive, multi-valued)
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw response body
    pub fn content(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> &str {
        self.text
            .get_or_init(|| String::from_utf8_lossy(&self.body).into_owned())
    }

    /// Body parsed as HTML
    ///
    /// The parser recovers from any malformed markup, so this always yields
    /// a document.
    pub fn html(&self) -> &Html {
        self.html.get_or_init(|| Html::parse_document(self.text()))
    }

    /// Body parsed as XML, possibly partial
    pub fn xml(&self) -> &XmlNode {
        self.xml.get_or_init(|| XmlNode::parse(&self.body))
    }

    /// Where this response redirects to, canonicalized
    ///
    /// `Location` is used first, then the target of a `Refresh` header
    /// (`5; url=/next`).
    pub fn redirection(&self) -> Option<&str> {
        self.redirection
            .get_or_init(|| self.find_redirection())
            .as_deref()
    }

    fn find_redirection(&self) -> Option<String> {
        if let Some(location) = self.header(LOCATION.as_str()) {
            return Some(self.canonicalize(location, &self.url));
        }

        let refresh = self.header(REFRESH.as_str())?;
        let (_, target) = refresh.split_once('=')?;
        let target = target.trim();
        (!target.is_empty()).then(|| self.canonicalize(target, &self.url))
    }

    /// Meta directives of the page keyed by lowercased meta name
    ///
    /// Contains `"robots"` for page-wide directives and bot names for
    /// bot-specific ones.
    pub fn meta_robots(&self) -> &HashMap<String, String> {
        self.meta_robots
            .get_or_init(|| links::meta_directives(self.html()))
    }

    /// Outbound links split into followable and not followable
    pub fn links(&self) -> &LinkSet {
        self.links.get_or_init(|| {
            let base = match links::base_href(self.html()) {
                Some(href) => self.canonicalize(&href, &self.url),
                None => self.url.clone(),
            };
            let robots = self
                .meta_robots()
                .get("robots")
                .map(String::as_str)
                .unwrap_or("");
            links::classify_links(self.html(), &base, robots, self.blacklist.as_ref())
        })
    }

    /// Text of the `<title>` element
    pub fn title(&self) -> Option<String> {
        links::title(self.html())
    }

    /// Whether `user_agent` may index this page
    ///
    /// Combines robots.txt with this page's `X-Robots-Tag` headers and meta
    /// robots tags.
    pub fn is_indexable(&self, evaluator: &RobotsEvaluator, user_agent: &str) -> bool {
        evaluator.allowed(
            &self.url,
            user_agent,
            Some(&self.headers),
            Some(self.meta_robots()),
        )
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn canonicalize(&self, url: &str, base: &str) -> String {
        sanitize(url, Some(base), self.blacklist.as_ref())
    }
}

impl std::fmt::Debug for PageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageView")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("bytes", &self.body.len())
            .finish_non_exhaustive()
    }
}
