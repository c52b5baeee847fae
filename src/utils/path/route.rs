//! Resource path processing utilities.
//!
//! Provides consistent path handling across the codebase:
//! - Path normalization (leading slash, no trailing slash)
//! - Fully qualified URL detection
//! - Segment-aware prefix stripping and joining

/// Normalize a resource path.
///
/// Always starts with `/` and never ends with one, except for the root.
/// Fully qualified URLs are kept verbatim.
///
/// # Examples
/// ```
/// use tola_resources::utils::path::normalize_path;
/// assert_eq!(normalize_path("foo.js"), "/foo.js");
/// assert_eq!(normalize_path("/x/"), "/x");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    if is_url(path) {
        return path.to_string();
    }
    let trimmed = path.trim_end_matches('/').trim_start_matches('/');
    format!("/{trimmed}")
}

/// Check if a path is a fully qualified URL (`scheme://...`).
///
/// # Examples
/// ```
/// use tola_resources::utils::path::is_url;
/// assert!(is_url("http://cdn/thing.js"));
/// assert!(!is_url("/thing.js"));
/// ```
#[inline]
pub fn is_url(path: &str) -> bool {
    path.find("://").is_some_and(|pos| {
        pos > 0
            && path[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Strip `prefix` from `path` on a segment boundary.
///
/// Returns the remainder (starting with `/`, or empty when `path == prefix`),
/// or `None` when `path` is not under `prefix`. An empty or `/` prefix
/// matches everything.
///
/// # Examples
/// ```
/// use tola_resources::utils::path::strip_segment_prefix;
/// assert_eq!(strip_segment_prefix("/api/users", "/api"), Some("/users"));
/// assert_eq!(strip_segment_prefix("/api", "/api/"), Some(""));
/// assert_eq!(strip_segment_prefix("/apiary", "/api"), None);
/// ```
pub fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

/// Join two URL path parts with exactly one slash between them.
///
/// # Examples
/// ```
/// use tola_resources::utils::path::join_url_path;
/// assert_eq!(join_url_path("/app/", "/buster"), "/app/buster");
/// assert_eq!(join_url_path("", ""), "/");
/// ```
pub fn join_url_path(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    format!("{base}/{rest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/foo.js"), "/foo.js");
        assert_eq!(normalize_path("foo.js"), "/foo.js");
        assert_eq!(normalize_path("/a/b/"), "/a/b");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for path in ["", "/", "x", "/x/", "//x//", "a/b/c/", "http://cdn/thing.js"] {
            let once = normalize_path(path);
            assert_eq!(normalize_path(&once), once, "path {path:?}");
        }
        assert_eq!(normalize_path("/x/"), normalize_path("/x"));
    }

    #[test]
    fn test_normalize_keeps_urls() {
        assert_eq!(normalize_path("http://cdn/thing.js"), "http://cdn/thing.js");
        assert_eq!(normalize_path("https://cdn/dir/"), "https://cdn/dir/");
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.com"));
        assert!(is_url("file:///tmp/trash.txt"));
        assert!(!is_url("/about"));
        assert!(!is_url("://nothing"));
        assert!(!is_url("/a/b:c"));
    }

    #[test]
    fn test_strip_segment_prefix() {
        assert_eq!(strip_segment_prefix("/api/x", "/api"), Some("/x"));
        assert_eq!(strip_segment_prefix("/api", "/api"), Some(""));
        assert_eq!(strip_segment_prefix("/apix", "/api"), None);
        assert_eq!(strip_segment_prefix("/x", ""), Some("/x"));
        assert_eq!(strip_segment_prefix("/x", "/"), Some("/x"));
        assert_eq!(strip_segment_prefix("/other", "/api"), None);
    }

    #[test]
    fn test_join_url_path() {
        assert_eq!(join_url_path("/app", "/buster"), "/app/buster");
        assert_eq!(join_url_path("/app/", "buster"), "/app/buster");
        assert_eq!(join_url_path("", "/bundle.js"), "/bundle.js");
        assert_eq!(join_url_path("/app", ""), "/app/");
    }
}
