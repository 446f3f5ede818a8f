//! HTTP client for forwarding requests to the live endpoint

use std::future::Future;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::har::Header;
use crate::{CassetteError, Result};

/// Request as seen by the interceptor and transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: String,
    /// Absolute request URL
    pub url: String,
    /// Request headers
    pub headers: Vec<Header>,
    /// Request body, if any
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Create a body-less request
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Attach a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Attach a body with its declared media type
    pub fn body(mut self, mime_type: impl Into<String>, text: impl Into<String>) -> Self {
        self.body = Some(RequestBody {
            mime_type: mime_type.into(),
            text: text.into(),
        });
        self
    }
}

/// Request body text with its declared media type
#[derive(Debug, Clone)]
pub struct RequestBody {
    /// Declared media type
    pub mime_type: String,
    /// Body text
    pub text: String,
}

/// Response handed back to the caller
///
/// The body is always fully buffered; streaming responses are read to the
/// end before this is constructed, which bounds usable body size to
/// available memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<Header>,
    /// Declared media type
    pub mime_type: String,
    /// Response body
    pub body: Vec<u8>,
}

/// The forwarding seam: anything that can turn a request into a live response
///
/// The default implementation is [`HyperTransport`]; tests supply fakes, and
/// callers needing TLS or redirects plug in their own.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Send the request and await its full response
    ///
    /// Cancellation and timeouts follow whatever contract the underlying
    /// client offers; no exchange is recorded for a failed send.
    fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Plain-HTTP transport built on the hyper connection-pooling client
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    /// Create a transport with a pooled connector
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build_http();

        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let uri = request
            .url
            .parse::<Uri>()
            .map_err(|e| CassetteError::InvalidRequest(format!("bad URL '{}': {e}", request.url)))?;

        let method = request.method.parse::<Method>().map_err(|e| {
            CassetteError::InvalidRequest(format!("bad method '{}': {e}", request.method))
        })?;

        debug!("Forwarding {} {}", method, uri);

        let mut builder = Request::builder().method(method).uri(uri);
        for header in &request.headers {
            builder = builder.header(&header.name, &header.value);
        }

        let body = match &request.body {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, &body.mime_type);
                Full::new(Bytes::from(body.text.clone().into_bytes()))
            }
            None => Full::new(Bytes::new()),
        };

        let http_request = builder
            .body(body)
            .map_err(|e| CassetteError::InvalidRequest(format!("failed to build request: {e}")))?;

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Forwarded request failed: {e}");
            CassetteError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers: Vec<Header> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                Header::new(name.as_str(), value.to_str().unwrap_or("<invalid>"))
            })
            .collect();
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| CassetteError::Transport(format!("failed to read response body: {e}")))?
            .to_bytes();

        Ok(HttpResponse {
            status,
            headers,
            mime_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new("get", "https://example.com/api?x=1")
            .header("accept", "application/json")
            .body("application/json", "{}");

        assert_eq!(request.method, "get");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.body.unwrap().mime_type, "application/json");
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let transport = HyperTransport::new();
        let request = HttpRequest::new("NOT A METHOD", "http://example.com/");

        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, CassetteError::InvalidRequest(_)));
    }
}
