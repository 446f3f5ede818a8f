//! The interception engine
//!
//! Sits in the request path of test code. On the first request it attaches:
//! loads the archive at the configured location (or starts empty), builds a
//! path-keyed resolver from it, and seeds a recorder with the loaded
//! entries. Every request after that is either answered from the resolver
//! or forwarded to the real transport and appended to the recorder. On
//! teardown the recorder is persisted back to the same location.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::har::{self, ArchiveBuilder, Creator, Response};
use crate::matching::{PathAndQuery, RouteResolver};
use crate::network::{HttpRequest, HttpResponse, HyperTransport, Transport};
use crate::Result;

/// Prefix of request headers that are not copied onto forwarded requests;
/// they are re-derived from the body object being attached.
const CONTENT_HEADER_PREFIX: &str = "content-";

/// Record-replay interceptor bound to one archive file
///
/// State machine: detached until the first request, attached afterwards,
/// closed once [`finish`](Self::finish) persists the archive. Attachment
/// runs at most once even under concurrent first calls.
pub struct Interceptor<T: Transport = HyperTransport> {
    archive_path: PathBuf,
    creator: Creator,
    transport: T,
    state: OnceCell<Attached>,
    saved: AtomicBool,
}

struct Attached {
    resolver: RouteResolver,
    recorder: Mutex<ArchiveBuilder>,
}

impl Interceptor<HyperTransport> {
    /// Create an interceptor over the default transport
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self::with_transport(archive_path, HyperTransport::new())
    }
}

impl<T: Transport> Interceptor<T> {
    /// Create an interceptor forwarding through a custom transport
    pub fn with_transport(archive_path: impl Into<PathBuf>, transport: T) -> Self {
        Self {
            archive_path: archive_path.into(),
            creator: Creator::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            transport,
            state: OnceCell::new(),
            saved: AtomicBool::new(false),
        }
    }

    /// Override the creator metadata stamped into the saved archive
    #[must_use]
    pub fn creator(mut self, creator: Creator) -> Self {
        self.creator = creator;
        self
    }

    /// The location the archive is loaded from and saved to
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Handle one request: replay a recorded response or forward and record
    ///
    /// The replay path makes no network call. The record path forwards the
    /// request with content-* headers stripped, buffers the full live
    /// response, and appends the exchange; a failed or cancelled forward
    /// appends nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if attaching fails (malformed archive) or the
    /// forwarded call fails at the transport layer.
    pub async fn handle(&self, request: HttpRequest) -> Result<HttpResponse> {
        let attached = self.attached().await?;

        if let Some(stored) =
            attached
                .resolver
                .lookup_with_headers(&request.method, &request.url, &request.headers)
        {
            debug!("Replaying {} {}", request.method, request.url);
            return synthesize_response(&stored);
        }

        debug!("Not recorded, forwarding {} {}", request.method, request.url);
        let live = self.transport.send(&forwarded_request(&request)).await?;

        let exchange = ArchiveBuilder::begin_exchange()
            .request(&request)
            .response(&live)
            .build();
        lock(&attached.recorder).append_exchange(exchange);

        Ok(live)
    }

    /// Persist the archive (original entries + newly recorded ones)
    ///
    /// Idempotent: the second and later calls are no-ops. A detached
    /// interceptor that never saw a request writes nothing. Also invoked
    /// best-effort on drop.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the archive cannot be written; the flag is
    /// reset so a retry is possible.
    pub fn finish(&self) -> Result<()> {
        let Some(attached) = self.state.get() else {
            return Ok(());
        };

        if self.saved.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = lock(&attached.recorder).save(&self.archive_path);
        match result {
            Ok(path) => {
                info!("Interceptor closed, archive saved to {}", path.display());
                Ok(())
            }
            Err(e) => {
                self.saved.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Number of exchanges currently recorded (seeded + appended)
    ///
    /// Zero while still detached.
    pub fn entry_count(&self) -> usize {
        self.state
            .get()
            .map_or(0, |attached| lock(&attached.recorder).entry_count())
    }

    async fn attached(&self) -> Result<&Attached> {
        self.state.get_or_try_init(|| self.attach()).await
    }

    async fn attach(&self) -> Result<Attached> {
        let archive = har::load(&self.archive_path)?.unwrap_or_default();
        info!(
            "Attached to {} ({} recorded exchanges)",
            self.archive_path.display(),
            archive.log.entries.len()
        );

        // Path-keyed, matching the relative-URL semantics of the lookup API
        let resolver = RouteResolver::build(&archive, Arc::new(PathAndQuery));
        let recorder = ArchiveBuilder::seeded(archive, self.creator.clone());

        Ok(Attached {
            resolver,
            recorder: Mutex::new(recorder),
        })
    }
}

impl<T: Transport> Drop for Interceptor<T> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(
                "Failed to persist archive {} on drop: {e}",
                self.archive_path.display()
            );
        }
    }
}

/// Rebuild the outgoing request for the record path
///
/// Content-negotiation headers are dropped; the transport re-derives them
/// from the attached body. Everything else passes through unchanged.
pub(crate) fn forwarded_request(request: &HttpRequest) -> HttpRequest {
    HttpRequest {
        method: request.method.clone(),
        url: request.url.clone(),
        headers: request
            .headers
            .iter()
            .filter(|h| !is_content_header(&h.name))
            .cloned()
            .collect(),
        body: request.body.clone(),
    }
}

fn is_content_header(name: &str) -> bool {
    name.get(..CONTENT_HEADER_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CONTENT_HEADER_PREFIX))
}

/// Reconstruct a caller-facing response from a stored entry
pub(crate) fn synthesize_response(stored: &Response) -> Result<HttpResponse> {
    Ok(HttpResponse {
        status: stored.status,
        headers: stored.headers.clone(),
        mime_type: stored.content.mime_type.clone(),
        body: stored.content.decoded_bytes()?,
    })
}

fn lock(recorder: &Mutex<ArchiveBuilder>) -> MutexGuard<'_, ArchiveBuilder> {
    recorder.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::{Content, Header};

    #[test]
    fn test_forwarded_request_strips_content_headers() {
        let request = HttpRequest::new("POST", "https://example.com/api")
            .header("Content-Type", "application/json")
            .header("content-length", "2")
            .header("Authorization", "Bearer t")
            .header("accept", "application/json")
            .body("application/json", "{}");

        let forwarded = forwarded_request(&request);
        let names: Vec<&str> = forwarded.headers.iter().map(|h| h.name.as_str()).collect();

        assert_eq!(names, vec!["Authorization", "accept"]);
        assert!(forwarded.body.is_some());
    }

    #[test]
    fn test_synthesize_response_decodes_body() {
        let stored = Response {
            status: 200,
            headers: vec![Header::new("server", "test")],
            content: Content {
                mime_type: "application/octet-stream".to_string(),
                text: "AQID".to_string(),
                encoding: Some("base64".to_string()),
                ..Content::default()
            },
            ..Response::default()
        };

        let response = synthesize_response(&stored).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, vec![1, 2, 3]);
        assert_eq!(response.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_content_header_prefix_match() {
        assert!(is_content_header("Content-Type"));
        assert!(is_content_header("CONTENT-LENGTH"));
        assert!(!is_content_header("x-content-type-options"));
        assert!(!is_content_header("accept"));
    }
}
