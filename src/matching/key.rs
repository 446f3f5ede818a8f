//! Route key strategies
//!
//! A route key is the (method, URL-derived string) identity under which
//! recorded exchanges are grouped and looked up. Exactly one strategy is
//! active per resolver; the strategies never consider the request body.

use hyper::Uri;
use sha2::{Digest, Sha256};

use crate::har::Header;

/// Derived identity used to match a request against recorded exchanges
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    /// Uppercased HTTP method
    pub method: String,
    /// URL-derived portion of the key
    pub target: String,
}

impl RouteKey {
    fn new(method: &str, target: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            target: target.into(),
        }
    }
}

/// Pluggable route key derivation
pub trait RouteKeyStrategy: Send + Sync {
    /// Compute the key for a request
    ///
    /// `headers` are ignored by the URL-only strategies and only consulted
    /// by header-aware ones.
    fn route_key(&self, method: &str, url: &str, headers: &[Header]) -> RouteKey;
}

/// Key on the full absolute URL (scheme + host + path + query)
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteUrl;

impl RouteKeyStrategy for AbsoluteUrl {
    fn route_key(&self, method: &str, url: &str, _headers: &[Header]) -> RouteKey {
        RouteKey::new(method, url)
    }
}

/// Key on path + query only, so host and scheme never matter
#[derive(Debug, Clone, Copy, Default)]
pub struct PathAndQuery;

impl RouteKeyStrategy for PathAndQuery {
    fn route_key(&self, method: &str, url: &str, _headers: &[Header]) -> RouteKey {
        RouteKey::new(method, path_and_query(url))
    }
}

/// Key on method + URL + the values of a configured set of vary headers
///
/// Distinguishes otherwise identical routes by header value, e.g. content
/// negotiation or auth context. Header names compare case-insensitively and
/// are applied in sorted order so construction order never changes the key.
#[derive(Debug, Clone, Default)]
pub struct VaryHeaderAware {
    vary: Vec<String>,
}

impl VaryHeaderAware {
    /// Create a strategy varying on the given header names
    pub fn new(vary: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut vary: Vec<String> = vary
            .into_iter()
            .map(|name| name.into().to_ascii_lowercase())
            .collect();
        vary.sort();
        Self { vary }
    }
}

impl RouteKeyStrategy for VaryHeaderAware {
    fn route_key(&self, method: &str, url: &str, headers: &[Header]) -> RouteKey {
        let method = method.to_ascii_uppercase();

        let mut hasher = Sha256::new();
        hasher.update((method.len() as u32).to_le_bytes());
        hasher.update(method.as_bytes());
        hasher.update((url.len() as u32).to_le_bytes());
        hasher.update(url.as_bytes());

        for name in &self.vary {
            for header in headers {
                if header.name.eq_ignore_ascii_case(name) {
                    hasher.update((name.len() as u32).to_le_bytes());
                    hasher.update(name.as_bytes());
                    hasher.update((header.value.len() as u32).to_le_bytes());
                    hasher.update(header.value.as_bytes());
                }
            }
        }

        RouteKey {
            method,
            target: hex::encode(hasher.finalize()),
        }
    }
}

/// Path + query of `url`; unparsable URLs fall back to the raw string
fn path_and_query(url: &str) -> String {
    match url.parse::<Uri>() {
        Ok(uri) => uri
            .path_and_query()
            .map_or_else(|| url.to_string(), |pq| pq.as_str().to_string()),
        Err(_) => url.to_string(),
    }
}
