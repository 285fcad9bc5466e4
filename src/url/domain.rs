use url::Url;

/// How a link relates to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    /// Same host
    Internal,
    /// One host is a subdomain of the other
    Subdomain,
    /// Unrelated hosts (or a URL without a host)
    External,
}

/// Extracts the host from a URL
///
/// The host is lowercased and stripped of leading/trailing dots. Returns
/// `None` when the URL cannot be parsed or has no host.
///
/// # Examples
///
/// ```
/// use gcrawl::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.COM/path"), Some("example.com".to_string()));
/// assert_eq!(extract_host("https://example.com:8080/"), Some("example.com".to_string()));
/// assert_eq!(extract_host("mailto:someone@example.com"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_matches('.').to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Determines the relationship of the link `to` found on the page `from`
///
/// # Examples
///
/// ```
/// use gcrawl::url::{relationship, Relationship};
///
/// assert_eq!(relationship("http://foo.com/bar", "http://foo.com/howdy"), Relationship::Internal);
/// assert_eq!(relationship("http://foo.com/bar", "http://bar.com/foo"), Relationship::External);
/// assert_eq!(relationship("http://foo.com/", "http://bar.foo.com/"), Relationship::Subdomain);
/// ```
pub fn relationship(from: &str, to: &str) -> Relationship {
    let (Some(from), Some(to)) = (extract_host(from), extract_host(to)) else {
        return Relationship::External;
    };

    if from == to {
        Relationship::Internal
    } else if is_subdomain_of(&to, &from) || is_subdomain_of(&from, &to) {
        Relationship::Subdomain
    } else {
        Relationship::External
    }
}

/// Returns true if `url` stays on the seed's site
///
/// Subdomain links (in either direction) only count when `allow_subdomains`
/// is set.
pub fn is_within_scope(seed: &str, url: &str, allow_subdomains: bool) -> bool {
    match relationship(seed, url) {
        Relationship::Internal => true,
        Relationship::Subdomain => allow_subdomains,
        Relationship::External => false,
    }
}

/// Label-aware suffix check: `blog.example.com` is under `example.com`,
/// `myexample.com` is not.
fn is_subdomain_of(candidate: &str, parent: &str) -> bool {
    candidate
        .strip_suffix(parent)
        .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_host() {
        assert_eq!(
            extract_host("https://example.com/"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_nested_subdomain() {
        assert_eq!(
            extract_host("https://api.v2.example.com/endpoint"),
            Some("api.v2.example.com".to_string())
        );
    }

    #[test]
    fn test_extract_mixed_case_and_trailing_dot() {
        assert_eq!(
            extract_host("https://Example.COM./"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_relative_url() {
        assert_eq!(extract_host("/just/a/path"), None);
    }

    #[test]
    fn test_internal() {
        assert_eq!(
            relationship("http://foo.com/bar", "https://FOO.com/howdy?x=1"),
            Relationship::Internal
        );
    }

    #[test]
    fn test_subdomain_both_directions() {
        assert_eq!(
            relationship("http://foo.com/", "http://bar.foo.com/"),
            Relationship::Subdomain
        );
        assert_eq!(
            relationship("http://deep.bar.foo.com/", "http://foo.com/"),
            Relationship::Subdomain
        );
    }

    #[test]
    fn test_partial_label_is_external() {
        assert_eq!(
            relationship("http://example.com/", "http://myexample.com/"),
            Relationship::External
        );
        assert_eq!(
            relationship("http://example.com/", "http://example.com.org/"),
            Relationship::External
        );
    }

    #[test]
    fn test_missing_host_is_external() {
        assert_eq!(
            relationship("http://example.com/", "mailto:me@example.com"),
            Relationship::External
        );
    }

    #[test]
    fn test_scope() {
        let seed = "http://example.com/";
        assert!(is_within_scope(seed, "http://example.com/a", false));
        assert!(!is_within_scope(seed, "http://blog.example.com/a", false));
        assert!(is_within_scope(seed, "http://blog.example.com/a", true));
        assert!(!is_within_scope(seed, "http://other.com/a", true));
    }

    #[test]
    fn test_is_subdomain_of() {
        assert!(is_subdomain_of("blog.example.com", "example.com"));
        assert!(!is_subdomain_of("example.com", "example.com"));
        assert!(!is_subdomain_of(".example.com", "example.com"));
        assert!(!is_subdomain_of("notexample.com", "example.com"));
    }
}
