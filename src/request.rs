//! Request metadata consumed by the resolvers and the dispatch engine.
//!
//! The core never reads ambient request state. Callers build a
//! [`RequestContext`] from whatever transport they run on and thread it
//! explicitly into [`ModuleResolver::resolve`](crate::module::ModuleResolver::resolve),
//! [`RouteResolver::resolve`](crate::route::RouteResolver::resolve) and
//! [`DispatchEngine::dispatch`](crate::dispatcher::DispatchEngine::dispatch).

use http::Method;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Strongly typed request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Attempt to parse from a header string; if invalid, generate a new one.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Read-only view of one incoming request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    /// Host header value; may carry a port
    pub host: String,
    /// Raw request target path; may carry a query string
    pub path: String,
    headers: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            host: host.into(),
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// Build from an absolute URL such as `https://admin.example.com/account/profile?x=1`.
    pub fn from_url(method: Method, raw: &str) -> anyhow::Result<Self> {
        let url = url::Url::parse(raw)?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => anyhow::bail!("URL '{raw}' has no host"),
        };
        let path = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        Ok(Self::new(method, host, path))
    }

    /// Add a header. `x-request-id` is adopted as the request id when it parses.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((name.to_string(), value));
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the client expects a JSON answer rather than a page
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        let xhr = self
            .get_header("x-requested-with")
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
        let json = self
            .get_header("accept")
            .is_some_and(|v| v.to_ascii_lowercase().contains("application/json"));
        xhr || json
    }

    /// Path without query string or surrounding slashes
    #[must_use]
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }

    #[must_use]
    pub fn segments(&self) -> Vec<String> {
        path_segments(&self.path)
    }
}

/// Strip query string, fragment and surrounding slashes.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].trim_matches('/').to_string()
}

/// Non-empty path segments, still percent-encoded.
///
/// Matching runs on the encoded form so an encoded `/` stays inside its
/// segment; decode captured values with [`decode_segment`].
#[must_use]
pub fn path_segments(path: &str) -> Vec<String> {
    normalize_path(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Percent-decode one segment; invalid UTF-8 leaves it as is.
#[must_use]
pub fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}

/// Lower-cased host without port or trailing dot
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/account/profile?tab=1"), "account/profile");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path("account/profile/#top"), "account/profile");
    }

    #[test]
    fn test_path_segments_stay_encoded_and_skip_empty() {
        assert_eq!(
            path_segments("//shop//caf%C3%A9/a%2Fb/"),
            vec!["shop".to_string(), "caf%C3%A9".to_string(), "a%2Fb".to_string()]
        );
        assert!(path_segments("/?q=1").is_empty());
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("caf%C3%A9"), "café");
        assert_eq!(decode_segment("a%2Fb"), "a/b");
        assert_eq!(decode_segment("%FF"), "%FF");
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Admin.Example.com:8080"), "admin.example.com");
        assert_eq!(normalize_host("example.com."), "example.com");
    }

    #[test]
    fn test_from_url() {
        let req = RequestContext::from_url(Method::GET, "https://admin.example.com:8443/a/b?x=1").unwrap();
        assert_eq!(req.host, "admin.example.com:8443");
        assert_eq!(req.path, "/a/b?x=1");
        assert_eq!(req.segments(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_is_ajax() {
        let plain = RequestContext::new(Method::GET, "example.com", "/");
        assert!(!plain.is_ajax());
        let xhr = plain.clone().with_header("X-Requested-With", "XMLHttpRequest");
        assert!(xhr.is_ajax());
        let json = plain.with_header("Accept", "application/json, text/plain");
        assert!(json.is_ajax());
    }

    #[test]
    fn test_request_id_header_adopted() {
        let id = RequestId::new();
        let req = RequestContext::new(Method::GET, "h", "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(req.request_id, id);
    }
}
