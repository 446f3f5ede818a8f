//! Archive recorder
//!
//! `ArchiveBuilder` owns the archive-in-progress: seeded with previously
//! recorded entries so a load-append-save cycle never drops history, with
//! creator metadata supplied explicitly by the caller. `ExchangeBuilder`
//! assembles one entry; it is appended only once a response was captured, so
//! a cancelled or failed forward leaves no partial entry behind.

use std::path::{Path, PathBuf};

use chrono::Utc;
use hyper::StatusCode;
use hyper::Uri;

use crate::network::{HttpRequest, HttpResponse};
use crate::Result;

use super::model::{Content, Creator, Entry, Header, HttpArchive, PostData, Request, Response};
use super::store;

/// Builder for the archive being recorded
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    archive: HttpArchive,
}

impl ArchiveBuilder {
    /// Start an empty archive stamped with `creator`
    pub fn new(creator: Creator) -> Self {
        Self::seeded(HttpArchive::default(), creator)
    }

    /// Continue an existing archive, restamping its creator
    pub fn seeded(mut archive: HttpArchive, creator: Creator) -> Self {
        archive.log.creator = creator;
        Self { archive }
    }

    /// Begin capturing one exchange
    pub fn begin_exchange() -> ExchangeBuilder {
        ExchangeBuilder::new()
    }

    /// Append a completed exchange; order is preserved, nothing is deduplicated
    pub fn append_exchange(&mut self, entry: Entry) {
        self.archive.log.entries.push(entry);
    }

    /// Number of entries currently held (seeded + appended)
    pub fn entry_count(&self) -> usize {
        self.archive.log.entries.len()
    }

    /// The archive in its current state
    pub fn archive(&self) -> &HttpArchive {
        &self.archive
    }

    /// Persist the archive to `path`, returning the canonical path written
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the archive cannot be written.
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        store::save(&self.archive, path)
    }
}

/// Builder for a single exchange entry
#[derive(Debug, Clone)]
pub struct ExchangeBuilder {
    entry: Entry,
}

impl ExchangeBuilder {
    /// Start an exchange timestamped now
    pub fn new() -> Self {
        let entry = Entry {
            started_date_time: Utc::now().to_rfc3339(),
            ..Entry::default()
        };
        Self { entry }
    }

    /// Capture the outgoing request
    pub fn request(mut self, request: &HttpRequest) -> Self {
        self.entry.request = Request {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            query_string: parse_query_string(&request.url),
            body_size: request
                .body
                .as_ref()
                .map_or(-1, |body| body.text.len() as i64),
            post_data: request.body.as_ref().map(|body| PostData {
                mime_type: body.mime_type.clone(),
                text: body.text.clone(),
                params: serde_json::Value::Null,
            }),
            ..Request::default()
        };
        self
    }

    /// Capture the live response
    pub fn response(mut self, response: &HttpResponse) -> Self {
        self.entry.response = Some(Response {
            status: response.status,
            status_text: StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
            headers: response.headers.clone(),
            content: Content::from_bytes(response.mime_type.clone(), &response.body),
            body_size: response.body.len() as i64,
            ..Response::default()
        });
        self
    }

    /// Finish the entry
    pub fn build(self) -> Entry {
        self.entry
    }
}

impl Default for ExchangeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the query portion of `url` into ordered name/value pairs
fn parse_query_string(url: &str) -> Vec<Header> {
    let Ok(uri) = url.parse::<Uri>() else {
        return Vec::new();
    };
    let Some(query) = uri.query() else {
        return Vec::new();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            Header::new(decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}
