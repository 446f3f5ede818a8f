//! Standalone mock server
//!
//! Serves only recorded responses: every incoming request is resolved
//! against the archive's route table and a miss is a plain 404. No
//! forwarding happens here; that is the interceptor's job.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::har::{self, Header, HttpArchive};
use crate::matching::{RouteKeyStrategy, RouteResolver};
use crate::{CassetteError, Result};

/// HTTP listener that answers from a recorded archive
pub struct MockServer {
    resolver: Arc<RouteResolver>,
}

impl MockServer {
    /// Build a server over an already loaded archive
    pub fn new(archive: &HttpArchive, strategy: Arc<dyn RouteKeyStrategy>) -> Self {
        Self {
            resolver: Arc::new(RouteResolver::build(archive, strategy)),
        }
    }

    /// Build a server from an archive file
    ///
    /// # Errors
    ///
    /// Returns [`CassetteError::ArchiveNotFound`] when the file does not
    /// exist, or [`CassetteError::MalformedArchive`] when it cannot be
    /// decoded.
    pub fn load(path: &Path, strategy: Arc<dyn RouteKeyStrategy>) -> Result<Self> {
        let archive = har::load(path)?
            .ok_or_else(|| CassetteError::ArchiveNotFound(path.to_path_buf()))?;
        Ok(Self::new(&archive, strategy))
    }

    /// Number of distinct routes the server can answer
    pub fn route_count(&self) -> usize {
        self.resolver.route_count()
    }

    /// Resolve one request to a response, 404 on miss
    pub fn respond(
        &self,
        method: &str,
        url: &str,
        headers: &[Header],
    ) -> Response<Full<Bytes>> {
        let Some(stored) = self.resolver.lookup_with_headers(method, url, headers) else {
            debug!("No recording for {method} {url}");
            return plain_response(StatusCode::NOT_FOUND, Bytes::new(), None);
        };

        let status =
            StatusCode::from_u16(stored.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match stored.content.decoded_bytes() {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                error!("Recorded body for {method} {url} is undecodable: {e}");
                return plain_response(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new(), None);
            }
        };

        let mime = (!stored.content.mime_type.is_empty()).then_some(stored.content.mime_type.as_str());
        plain_response(status, body, mime)
    }

    /// Accept connections on `addr` until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Mock server listening on {} ({} routes)",
            addr,
            self.route_count()
        );

        let server = Arc::new(self);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(&server);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |request: Request<Incoming>| {
                                    let server = Arc::clone(&server);
                                    async move { server.handle(&request) }
                                });

                                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                    error!("Connection error from {peer_addr}: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {e}");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Mock server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle(
        &self,
        request: &Request<Incoming>,
    ) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
        let url = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

        let headers: Vec<Header> = request
            .headers()
            .iter()
            .map(|(name, value)| Header::new(name.as_str(), value.to_str().unwrap_or("<invalid>")))
            .collect();

        info!("{} {}", request.method(), url);
        Ok(self.respond(request.method().as_str(), &url, &headers))
    }
}

fn plain_response(
    status: StatusCode,
    body: Bytes,
    mime_type: Option<&str>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    if let Some(mime) = mime_type {
        builder = builder.header(CONTENT_TYPE, mime);
    }
    builder
        .body(Full::new(body))
        .expect("response builder with valid status")
}
