//! Replay recorded requests against a live endpoint
//!
//! Drives every archived request back through a transport, either to
//! re-issue them (`replay_all`) or to check that the live server still
//! answers the way the archive remembers (`verify_all`).

use tracing::{debug, info, warn};

use crate::har::{HttpArchive, Request};
use crate::interceptor::forwarded_request;
use crate::network::{HttpRequest, HttpResponse, Transport};
use crate::Result;

/// Outcome of verifying an archive against a live endpoint
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Number of entries replayed
    pub total: usize,
    /// Entries whose live response differed from the recording
    pub failures: Vec<VerifyFailure>,
}

impl VerifyReport {
    /// Whether every entry matched
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One mismatch between a live response and its recording
#[derive(Debug)]
pub struct VerifyFailure {
    /// Request method
    pub method: String,
    /// Request URL
    pub url: String,
    /// What differed
    pub reason: String,
}

/// Re-issue every recorded request through `transport`
///
/// # Errors
///
/// Returns the first transport failure; entries without a response are
/// skipped, not replayed.
pub async fn replay_all<T: Transport>(
    archive: &HttpArchive,
    transport: &T,
) -> Result<Vec<HttpResponse>> {
    let mut responses = Vec::with_capacity(archive.log.entries.len());

    for entry in &archive.log.entries {
        let request = rebuild_request(&entry.request);
        debug!("Replaying {} {}", request.method, request.url);
        responses.push(transport.send(&request).await?);
    }

    info!("Replayed {} recorded requests", responses.len());
    Ok(responses)
}

/// Replay every entry and compare live status + body against the recording
///
/// # Errors
///
/// Returns the first transport failure or an undecodable recorded body;
/// mismatches are collected in the report, not raised.
pub async fn verify_all<T: Transport>(archive: &HttpArchive, transport: &T) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    for entry in &archive.log.entries {
        let Some(recorded) = &entry.response else {
            continue;
        };

        let request = rebuild_request(&entry.request);
        let live = transport.send(&request).await?;
        report.total += 1;

        let reason = if live.status != recorded.status {
            Some(format!(
                "status {} != recorded {}",
                live.status, recorded.status
            ))
        } else if live.body != recorded.content.decoded_bytes()? {
            Some("body differs from recording".to_string())
        } else {
            None
        };

        if let Some(reason) = reason {
            warn!(
                "Mismatch on {} {}: {reason}",
                entry.request.method, entry.request.url
            );
            report.failures.push(VerifyFailure {
                method: entry.request.method.clone(),
                url: entry.request.url.clone(),
                reason,
            });
        }
    }

    info!(
        "Verified {} entries, {} mismatches",
        report.total,
        report.failures.len()
    );
    Ok(report)
}

/// Rebuild an outgoing request from a recorded one
///
/// Shares the interceptor's rule: content-* headers are dropped and
/// re-derived from the attached body.
fn rebuild_request(recorded: &Request) -> HttpRequest {
    let mut request = HttpRequest::new(recorded.method.clone(), recorded.url.clone());
    request.headers = recorded.headers.clone();
    if let Some(post_data) = &recorded.post_data {
        request = request.body(post_data.mime_type.clone(), post_data.text.clone());
    }
    forwarded_request(&request)
}
