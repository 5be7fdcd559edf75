//! Host extraction for request URLs and whitelist input.
//!
//! Deliberately string-based rather than going through [`url::Url`]: the hot
//! path runs on every sub-resource load, and a URL the parser would reject
//! must still reach the pattern stage of the classifier.

/// Characters allowed in an extracted host.
fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Extracts the bare lowercase host from a request URL.
///
/// Strips the scheme and a leading `www.`, then cuts at the first `/`, `?`
/// or `:`. Returns an empty string when nothing host-like is left, so that
/// host-based checks simply do not match.
///
/// ```
/// use pageguard::host::extract_host;
///
/// assert_eq!(extract_host("http://www.GoogleSyndication.com/ads?x=1"), "googlesyndication.com");
/// assert_eq!(extract_host("https://cdn.example.org:8443/a.js"), "cdn.example.org");
/// assert_eq!(extract_host("not a url"), "");
/// ```
pub fn extract_host(url: &str) -> String {
    try_extract_host(url).unwrap_or_default()
}

fn try_extract_host(url: &str) -> Option<String> {
    let rest = url.trim();
    let rest = rest.split_once("://").map_or(rest, |(_, after)| after);
    let rest = strip_www(rest);
    let end = rest.find(['/', '?', ':']).unwrap_or(rest.len());
    let host = &rest[..end];

    if host.is_empty() || !host.chars().all(is_host_char) {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// Normalizes user input for the whitelist.
///
/// Trims and lowercases, strips the scheme and `www.`, and drops any path,
/// query, fragment or port. `"https://www.Example.com/page?q=1"` becomes
/// `"example.com"`.
pub fn normalize_domain(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let rest = lower.split_once("://").map_or(lower.as_str(), |(_, after)| after);
    let rest = strip_www(rest);
    let end = rest.find(['/', '?', '#', ':']).unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').to_string()
}

fn strip_www(s: &str) -> &str {
    match s.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("www.") => &s[4..],
        _ => s,
    }
}

/// Iterates over `host` and each parent domain, most specific first.
///
/// `"a.b.example.com"` yields `a.b.example.com`, `b.example.com`,
/// `example.com`, `com`.
pub fn suffixes(host: &str) -> impl Iterator<Item = &str> {
    let mut next = (!host.is_empty()).then_some(host);
    std::iter::from_fn(move || {
        let current = next?;
        next = current.split_once('.').map(|(_, parent)| parent);
        Some(current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host_strips_scheme_www_and_path() {
        assert_eq!(
            extract_host("http://www.googlesyndication.com/ads?x=1"),
            "googlesyndication.com"
        );
        assert_eq!(extract_host("https://ads.doubleclick.net/x"), "ads.doubleclick.net");
        assert_eq!(extract_host("https://example.com?q=1"), "example.com");
        assert_eq!(extract_host("HTTPS://WWW.EXAMPLE.COM"), "example.com");
    }

    #[test]
    fn test_extract_host_drops_port() {
        assert_eq!(extract_host("http://localhost:8080/"), "localhost");
    }

    #[test]
    fn test_extract_host_without_scheme() {
        assert_eq!(extract_host("www.example.com/a"), "example.com");
    }

    #[test]
    fn test_extract_host_failure_is_empty() {
        assert_eq!(extract_host(""), "");
        assert_eq!(extract_host("https:///path"), "");
        assert_eq!(extract_host("https://bad host/"), "");
        assert_eq!(extract_host("https://user@host/"), "");
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("  https://www.Example.com/page?q=1#top "), "example.com");
        assert_eq!(normalize_domain("Example.com"), "example.com");
        assert_eq!(normalize_domain("sub.example.com:443"), "sub.example.com");
        assert_eq!(normalize_domain("example.com."), "example.com");
        assert_eq!(normalize_domain("https://"), "");
    }

    #[test]
    fn test_suffixes() {
        let all: Vec<_> = suffixes("a.b.example.com").collect();
        assert_eq!(all, ["a.b.example.com", "b.example.com", "example.com", "com"]);
        assert_eq!(suffixes("").count(), 0);
    }
}
