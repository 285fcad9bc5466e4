//! Link and metadata extraction from a parsed HTML document

use crate::url::{sanitize, ParamBlacklist};
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashMap;

/// Link schemes that never lead to a crawlable page
const BANNED_SCHEMES: [&str; 3] = ["mailto:", "javascript:", "tel:"];

/// Outbound links of a page, split by whether they may be followed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    /// Links the crawler may follow
    pub follow: Vec<String>,

    /// Links marked `rel="nofollow"`, or every link on a `nofollow` page
    pub nofollow: Vec<String>,
}

impl LinkSet {
    /// Total number of links on the page
    pub fn len(&self) -> usize {
        self.follow.len() + self.nofollow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.follow.is_empty() && self.nofollow.is_empty()
    }
}

/// Classifies every anchor of `document`
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `base` - Absolute URL relative links are resolved against
/// * `robots` - The page-wide meta robots directive (may be empty)
/// * `blacklist` - Query/matrix parameters to strip from every link
pub(crate) fn classify_links(
    document: &Html,
    base: &str,
    robots: &str,
    blacklist: Option<&ParamBlacklist>,
) -> LinkSet {
    let Ok(selector) = Selector::parse("a[href]") else {
        return LinkSet::default();
    };
    let page_nofollow = robots.contains("nofollow");
    let mut links = LinkSet::default();

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if has_banned_scheme(href) {
            continue;
        }

        let link = sanitize(href.trim(), Some(base), blacklist);
        let rel_nofollow = anchor
            .value()
            .attr("rel")
            .is_some_and(|rel| rel.to_lowercase().contains("nofollow"));

        if page_nofollow || rel_nofollow {
            links.nofollow.push(link);
        } else {
            links.follow.push(link);
        }
    }

    links
}

/// The first `<base href>` of the document, if any
pub(crate) fn base_href(document: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// Collects `<meta name=... content=...>` pairs
///
/// Names are lowercased; repeated names have their contents joined with `;`.
pub(crate) fn meta_directives(document: &Html) -> HashMap<String, String> {
    let mut meta: HashMap<String, String> = HashMap::new();
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return meta;
    };

    for element in document.select(&selector) {
        let (Some(name), Some(content)) =
            (element.value().attr("name"), element.value().attr("content"))
        else {
            continue;
        };
        meta.entry(name.trim().to_lowercase())
            .and_modify(|existing| {
                existing.push(';');
                existing.push_str(content);
            })
            .or_insert_with(|| content.to_string());
    }

    meta
}

/// Extracts the page title from the HTML document
pub(crate) fn title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn has_banned_scheme(href: &str) -> bool {
    let href = href.trim_start();
    BANNED_SCHEMES.iter().any(|scheme| {
        href.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}
