use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashSet;

/// Bytes left unescaped inside a path segment (RFC 3986 unreserved characters)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Query and matrix parameter names that are stripped during sanitization
///
/// Matching is case-insensitive: both the configured names and the keys found
/// in a URL are compared lower-cased, with spaces written as `%20` the way
/// [`sanitize`] writes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBlacklist {
    keys: HashSet<String>,
}

impl ParamBlacklist {
    /// Creates a blacklist from any collection of parameter names
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| lookup_key(k.as_ref()))
                .collect(),
        }
    }

    /// Returns true if `key` names a blacklisted parameter
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&lookup_key(key))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

fn lookup_key(key: &str) -> String {
    key.replace(' ', "%20").to_lowercase()
}

impl<S: AsRef<str>> FromIterator<S> for ParamBlacklist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A URI reference split into its five RFC 3986 components
///
/// Nothing is normalized at this stage; `None` means the component was absent,
/// which is different from present-but-empty for the authority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Reference {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Reference {
    /// Splits a URI reference (RFC 3986, Appendix B)
    fn parse(input: &str) -> Self {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (input, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_string())),
            None => (rest, None),
        };

        let (scheme, rest) = match rest.find(':') {
            Some(idx) if is_scheme(&rest[..idx]) => {
                (Some(rest[..idx].to_ascii_lowercase()), &rest[idx + 1..])
            }
            _ => (None, rest),
        };

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                (Some(after[..end].to_string()), &after[end..])
            }
            None => (None, rest),
        };

        Self {
            scheme,
            authority,
            path: path.to_string(),
            query,
            fragment,
        }
    }

    /// Resolves this reference against `base` (RFC 3986, section 5.2.2)
    ///
    /// Dot segments are deliberately left in place; they are removed later,
    /// after duplicate slashes have been collapsed.
    fn resolve(self, base: &Reference) -> Reference {
        if self.scheme.is_some() {
            return self;
        }

        let mut target = Reference {
            scheme: base.scheme.clone(),
            fragment: self.fragment,
            ..Default::default()
        };

        if self.authority.is_some() {
            target.authority = self.authority;
            target.path = self.path;
            target.query = self.query;
            return target;
        }

        if self.path.is_empty() {
            target.path = base.path.clone();
            target.query = self.query.or_else(|| base.query.clone());
        } else {
            target.path = if self.path.starts_with('/') {
                self.path
            } else {
                merge_paths(base, &self.path)
            };
            target.query = self.query;
        }
        target.authority = base.authority.clone();
        target
    }
}

/// Sanitizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Resolve `url` against `base` (absolute URLs ignore the base)
/// 2. Drop blacklisted query pairs, keeping the order of the rest
/// 3. Drop blacklisted matrix (`;`) parameters of the last path segment
/// 4. Collapse duplicate slashes, then resolve `.` and `..` segments
/// 5. Give an empty path a `/` when there is a host
/// 6. Percent-decode and re-encode every path segment
/// 7. Lowercase the host and strip leading/trailing dots from it
/// 8. Reassemble, encoding any literal space as `%20`
///
/// The result is stable: sanitizing an already sanitized URL with the same
/// blacklist returns it unchanged. Input that cannot be resolved to an
/// absolute URL is still reassembled on a best-effort basis.
///
/// # Examples
///
/// ```
/// use gcrawl::url::{sanitize, ParamBlacklist};
///
/// assert_eq!(sanitize("http://WWW.Testing.COM/FOOBAR", None, None), "http://www.testing.com/FOOBAR");
/// assert_eq!(sanitize("/foo", Some("http://cnn.com"), None), "http://cnn.com/foo");
///
/// let banned = ParamBlacklist::new(["sessionid"]);
/// assert_eq!(
///     sanitize("http://t.com/a/../b?SessionId=1&q=2", None, Some(&banned)),
///     "http://t.com/b?q=2"
/// );
/// ```
pub fn sanitize(url: &str, base: Option<&str>, blacklist: Option<&ParamBlacklist>) -> String {
    let reference = Reference::parse(url);
    let parts = match base {
        Some(base) => reference.resolve(&Reference::parse(base)),
        None => reference,
    };

    let (path, params) = split_params(&parts.path);
    let params = filter_pairs(params, ";", blacklist);
    let query = parts
        .query
        .as_deref()
        .map(|q| filter_pairs(q, "&", blacklist))
        .unwrap_or_default();

    let mut path = normalize_path(path);
    let authority = parts.authority.as_deref().map(normalize_authority);
    if authority.is_some() {
        if path.is_empty() {
            path.push('/');
        } else if !path.starts_with('/') {
            path.insert(0, '/');
        }
    }

    let mut out = String::with_capacity(url.len());
    if let Some(scheme) = &parts.scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(authority) = &authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(&path);
    if !params.is_empty() {
        out.push(';');
        out.push_str(&params);
    }
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query);
    }
    if let Some(fragment) = parts.fragment.as_deref().filter(|f| !f.is_empty()) {
        out.push('#');
        out.push_str(fragment);
    }

    out.replace(' ', "%20")
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn merge_paths(base: &Reference, relative: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{}", relative);
    }
    match base.path.rfind('/') {
        Some(idx) => format!("{}{}", &base.path[..=idx], relative),
        None => relative.to_string(),
    }
}

/// Splits `;`-style parameters off the last path segment
fn split_params(path: &str) -> (&str, &str) {
    let last_segment = path.rfind('/').map_or(0, |idx| idx + 1);
    match path[last_segment..].find(';') {
        Some(idx) => {
            let at = last_segment + idx;
            (&path[..at], &path[at + 1..])
        }
        None => (path, ""),
    }
}

/// Removes blacklisted `key=value` pairs and any empty pairs left behind
fn filter_pairs(raw: &str, separator: &str, blacklist: Option<&ParamBlacklist>) -> String {
    raw.split(separator)
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(key, _)| key);
            !blacklist.is_some_and(|b| b.contains(key))
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Collapses slashes, walks dot segments and re-encodes each segment
///
/// Segments are decoded before the walk so `%2E%2E` counts as a parent
/// reference, and a decoded `/` is re-encoded as `%2F` so it can never be
/// mistaken for a separator on a second pass.
fn normalize_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }

    let mut retained: Vec<Vec<u8>> = Vec::new();
    for segment in collapsed.split('/') {
        let decoded: Vec<u8> = percent_decode_str(segment).collect();
        match decoded.as_slice() {
            b".." => {
                retained.pop();
            }
            b"." => {}
            _ => retained.push(decoded),
        }
    }

    retained
        .iter()
        .map(|segment| percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lowercases the host and trims dots, leaving userinfo and port untouched
fn normalize_authority(authority: &str) -> String {
    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((userinfo, rest)) => (Some(userinfo), rest),
        None => (None, authority),
    };
    let (host, port) = split_port(host_port);
    let host = host.to_lowercase();

    let mut out = String::with_capacity(authority.len());
    if let Some(userinfo) = userinfo {
        out.push_str(userinfo);
        out.push('@');
    }
    out.push_str(host.trim_matches('.'));
    if let Some(port) = port {
        out.push(':');
        out.push_str(port);
    }
    out
}

fn split_port(host_port: &str) -> (&str, Option<&str>) {
    if host_port.starts_with('[') {
        if let Some(end) = host_port.find(']') {
            let (host, rest) = host_port.split_at(end + 1);
            return (host, rest.strip_prefix(':'));
        }
        return (host_port, None);
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => (host, Some(port)),
        _ => (host_port, None),
    }
}
