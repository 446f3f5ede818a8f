//! Serde types for the HAR 1.2 document
//!
//! Timing, cache, cookie, and page metadata are carried as opaque JSON so a
//! load-append-save cycle preserves them byte-for-byte in meaning without
//! this crate interpreting them.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

use super::HAR_VERSION;

/// Root HAR document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpArchive {
    /// The single log object holding creator metadata and entries
    pub log: Log,
}

/// HAR log: creator metadata plus the ordered exchange list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// HAR format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Tool that produced the archive (informational only)
    #[serde(default)]
    pub creator: Creator,
    /// Page metadata, passed through opaquely
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub pages: Value,
    /// Recorded exchanges, in recording order
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            version: HAR_VERSION.to_string(),
            creator: Creator::default(),
            pages: Value::Null,
            entries: Vec::new(),
        }
    }
}

/// Tool metadata stamped into every saved archive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    /// Tool name
    pub name: String,
    /// Tool version
    pub version: String,
}

impl Creator {
    /// Create creator metadata
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// One recorded request/response exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// RFC 3339 timestamp of when the request started
    #[serde(default)]
    pub started_date_time: String,
    /// Total elapsed time in milliseconds
    #[serde(default)]
    pub time: i64,
    /// The captured request
    #[serde(default)]
    pub request: Request,
    /// The captured response; an entry without one is never matchable
    #[serde(default)]
    pub response: Option<Response>,
    /// Cache metadata, passed through opaquely
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub cache: Value,
    /// Timing breakdown, passed through opaquely
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub timings: Value,
    /// Reference to the parent page, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageref: Option<String>,
}

/// Captured request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// HTTP method as sent (matching is case-insensitive)
    #[serde(default)]
    pub method: String,
    /// Absolute request URL
    #[serde(default)]
    pub url: String,
    /// Protocol version
    #[serde(default = "default_http_version")]
    pub http_version: String,
    /// Request headers, ordered, names not required unique
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Decoded query parameters
    #[serde(default)]
    pub query_string: Vec<Header>,
    /// Cookies, passed through opaquely
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub cookies: Value,
    /// Header bytes on the wire, -1 when unknown
    #[serde(default = "default_size")]
    pub headers_size: i64,
    /// Body bytes on the wire, -1 when unknown
    #[serde(default = "default_size")]
    pub body_size: i64,
    /// Request body, if one was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: String::new(),
            url: String::new(),
            http_version: default_http_version(),
            headers: Vec::new(),
            query_string: Vec::new(),
            cookies: Value::Null,
            headers_size: default_size(),
            body_size: default_size(),
            post_data: None,
        }
    }
}

/// Request body with declared media type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    /// Declared media type
    #[serde(default)]
    pub mime_type: String,
    /// Body text
    #[serde(default)]
    pub text: String,
    /// Form parameters, passed through opaquely
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Captured response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP status code
    #[serde(default)]
    pub status: u16,
    /// Status reason phrase
    #[serde(default)]
    pub status_text: String,
    /// Protocol version
    #[serde(default = "default_http_version")]
    pub http_version: String,
    /// Response headers
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Cookies, passed through opaquely
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub cookies: Value,
    /// Response body
    #[serde(default)]
    pub content: Content,
    /// Redirect target, empty when none
    #[serde(rename = "redirectURL", default)]
    pub redirect_url: String,
    /// Header bytes on the wire, -1 when unknown
    #[serde(default = "default_size")]
    pub headers_size: i64,
    /// Body bytes on the wire, -1 when unknown
    #[serde(default = "default_size")]
    pub body_size: i64,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            http_version: default_http_version(),
            headers: Vec::new(),
            cookies: Value::Null,
            content: Content::default(),
            redirect_url: String::new(),
            headers_size: default_size(),
            body_size: default_size(),
        }
    }
}

/// Response body text with optional transfer encoding tag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Decoded body size in bytes
    #[serde(default)]
    pub size: i64,
    /// Declared media type
    #[serde(default)]
    pub mime_type: String,
    /// Body text; base64 when `encoding` says so, UTF-8 otherwise
    #[serde(default)]
    pub text: String,
    /// `"base64"` for binary payloads, absent for plain text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Bytes saved by compression, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<i64>,
}

impl Content {
    /// Body bytes, decoding base64 when the encoding tag says so
    pub fn decoded_bytes(&self) -> Result<Vec<u8>> {
        match self.encoding.as_deref() {
            Some(e) if e.eq_ignore_ascii_case("base64") => {
                Ok(BASE64.decode(self.text.as_bytes())?)
            }
            _ => Ok(self.text.clone().into_bytes()),
        }
    }

    /// Build content from raw bytes, base64-tagging non-UTF-8 payloads
    pub fn from_bytes(mime_type: impl Into<String>, body: &[u8]) -> Self {
        let (text, encoding) = match std::str::from_utf8(body) {
            Ok(text) => (text.to_string(), None),
            Err(_) => (BASE64.encode(body), Some("base64".to_string())),
        };

        Self {
            size: body.len() as i64,
            mime_type: mime_type.into(),
            text,
            encoding,
            compression: None,
        }
    }
}

/// Ordered name/value pair used for headers and query parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Field name
    pub name: String,
    /// Field value
    pub value: String,
}

impl Header {
    /// Create a name/value pair
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

fn default_version() -> String {
    HAR_VERSION.to_string()
}

fn default_http_version() -> String {
    "HTTP/1.1".to_string()
}

fn default_size() -> i64 {
    -1
}
