//! Layer matching logic.
//!
//! # Responsibilities
//! - Match host header (virtual host, case-insensitive, port ignored)
//! - Match path prefix on segment boundaries (case-insensitive)
//! - Match exact route paths for handler layers
//! - Report the path a matched request should carry downstream
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching ignores ASCII case, like the express-style hosts that
//!   services are modelled on (`/Test` reaches a service mounted at `/test`)
//! - `/api` matches `/api` and `/api/...`, never `/apiary`
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::{header, Request};

/// Trait for matching requests against a layer's condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;

    /// Path handed to the layer's endpoint after a match.
    ///
    /// `None` leaves the request path untouched.
    fn downstream_path(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Matches the Host header (virtual host dispatch).
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    pub fn host(&self) -> &str {
        &self.expected_host
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host())
            .map(|h| strip_port(h).eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

/// Drop a `:port` suffix, leaving bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Matches the request path prefix and strips it for the nested router.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    /// Trailing slashes are ignored, so `"/api/"` behaves like `"/api"`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        let prefix = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the remainder of `path` after the prefix, if it matches.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        // "/" trims down to an empty prefix, which matches everything
        if self.prefix == "/" {
            return Some(path);
        }
        let rest = strip_prefix_ignore_case(path, &self.prefix)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.strip(req.uri().path()).is_some()
    }

    fn downstream_path(&self, path: &str) -> Option<String> {
        self.strip(path).map(|rest| {
            if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            }
        })
    }
}

/// Matches a single route path exactly, tolerating a trailing slash.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    path: String,
}

impl RouteMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: canonical_path(&path.into()).to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Matcher for RouteMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        canonical_path(req.uri().path()).eq_ignore_ascii_case(&self.path)
    }
}

fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let head = path.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&path[prefix.len()..])
    } else {
        None
    }
}

fn canonical_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, host: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header("Host", host);
        }
        builder.body(Body::default()).unwrap()
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("api.users.localhost");

        assert!(matcher.matches(&request("/", Some("api.users.localhost"))));
        assert!(matcher.matches(&request("/", Some("API.Users.LOCALHOST")))); // Case insensitive
        assert!(matcher.matches(&request("/", Some("api.users.localhost:1337")))); // Port ignored
        assert!(!matcher.matches(&request("/", Some("users.localhost"))));
        assert!(!matcher.matches(&request("/", None)));
    }

    #[test]
    fn test_host_matcher_falls_back_to_absolute_uri() {
        let matcher = HostMatcher::new("example.com");
        assert!(matcher.matches(&request("http://example.com/x", None)));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("localhost:8080"), "localhost");
        assert_eq!(strip_port("localhost"), "localhost");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches(&request("http://example.com/api/v1", None)));
        assert!(matcher.matches(&request("/api", None)));
        assert!(!matcher.matches(&request("/apiary", None)));
        assert!(!matcher.matches(&request("http://example.com/images", None)));
    }

    #[test]
    fn test_path_matcher_downstream_path() {
        let matcher = PathPrefixMatcher::new("/users/api/");
        assert_eq!(matcher.prefix(), "/users/api");
        assert_eq!(matcher.downstream_path("/users/api"), Some("/".to_string()));
        assert_eq!(matcher.downstream_path("/users/api/hi"), Some("/hi".to_string()));
        assert_eq!(matcher.downstream_path("/users"), None);
    }

    #[test]
    fn test_path_matching_ignores_case() {
        let matcher = PathPrefixMatcher::new("/test");
        assert!(matcher.matches(&request("/Test", None)));
        assert_eq!(matcher.downstream_path("/TEST/Hi"), Some("/Hi".to_string()));
        assert!(!matcher.matches(&request("/Testing", None)));
        assert_eq!(strip_prefix_ignore_case("/tést", "/té"), Some("st"));
        assert_eq!(strip_prefix_ignore_case("/é", "/a"), None);

        let route = RouteMatcher::new("/hi");
        assert!(route.matches(&request("/HI/", None)));
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches(&request("/anything/at/all", None)));
        assert_eq!(matcher.downstream_path("/x"), Some("/x".to_string()));
    }

    #[test]
    fn test_route_matcher() {
        let matcher = RouteMatcher::new("/hi");
        assert!(matcher.matches(&request("/hi", None)));
        assert!(matcher.matches(&request("/hi/", None)));
        assert!(!matcher.matches(&request("/hi/there", None)));

        let root = RouteMatcher::new("/");
        assert!(root.matches(&request("/", None)));
        assert!(!root.matches(&request("/hi", None)));
    }
}
