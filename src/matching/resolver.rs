//! Route resolver table
//!
//! Built once from an archive and a key strategy; the table itself is
//! immutable afterwards, only the per-route sequencer cursors advance. The
//! layout is an explicit arena: a key-to-index map over a vector of locked
//! sequencer slots, so iteration order and cursor ownership stay obvious and
//! concurrent lookups on different routes never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::har::{Header, HttpArchive, Response};

use super::key::{RouteKey, RouteKeyStrategy};
use super::sequencer::ResponseSequencer;

/// Maps route keys to their recorded response sequences
pub struct RouteResolver {
    strategy: Arc<dyn RouteKeyStrategy>,
    table: HashMap<RouteKey, usize>,
    slots: Vec<Mutex<ResponseSequencer>>,
}

impl RouteResolver {
    /// Build a resolver from an archive under the given key strategy
    ///
    /// Entries are keyed in archive order; repeated keys extend the existing
    /// sequencer. Entries without a response are skipped so they can never
    /// match. Deterministic: same archive and strategy always produce the
    /// same table.
    pub fn build(archive: &HttpArchive, strategy: Arc<dyn RouteKeyStrategy>) -> Self {
        let mut table: HashMap<RouteKey, usize> = HashMap::new();
        let mut slots: Vec<Mutex<ResponseSequencer>> = Vec::new();

        for entry in &archive.log.entries {
            let Some(response) = &entry.response else {
                warn!(
                    "Skipping entry without response: {} {}",
                    entry.request.method, entry.request.url
                );
                continue;
            };

            let key = strategy.route_key(
                &entry.request.method,
                &entry.request.url,
                &entry.request.headers,
            );

            let index = *table.entry(key).or_insert_with(|| {
                slots.push(Mutex::new(ResponseSequencer::new()));
                slots.len() - 1
            });
            lock(&slots[index]).push(response.clone());
        }

        debug!(
            "Resolver table built: {} routes from {} entries",
            table.len(),
            archive.log.entries.len()
        );

        Self {
            strategy,
            table,
            slots,
        }
    }

    /// Look up the next recorded response for a route
    ///
    /// `None` means the route was never recorded; callers treat that as a
    /// normal miss, not an error.
    pub fn lookup(&self, method: &str, url: &str) -> Option<Response> {
        self.lookup_with_headers(method, url, &[])
    }

    /// Look up with request headers available to header-aware strategies
    pub fn lookup_with_headers(
        &self,
        method: &str,
        url: &str,
        headers: &[Header],
    ) -> Option<Response> {
        let key = self.strategy.route_key(method, url, headers);
        let index = *self.table.get(&key)?;
        let response = lock(&self.slots[index]).next_response();

        match &response {
            Some(r) => debug!("Route hit: {} {} -> {}", key.method, key.target, r.status),
            None => debug!("Route miss: {} {}", key.method, key.target),
        }

        response
    }

    /// Number of distinct routes in the table
    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    /// Whether the table holds no routes
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn lock(slot: &Mutex<ResponseSequencer>) -> std::sync::MutexGuard<'_, ResponseSequencer> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::{Content, Entry, Request};
    use crate::matching::{AbsoluteUrl, PathAndQuery, VaryHeaderAware};

    fn entry(method: &str, url: &str, status: u16) -> Entry {
        Entry {
            request: Request {
                method: method.to_string(),
                url: url.to_string(),
                ..Request::default()
            },
            response: Some(Response {
                status,
                content: Content::from_bytes("text/plain", format!("body-{status}").as_bytes()),
                ..Response::default()
            }),
            ..Entry::default()
        }
    }

    fn archive_of(entries: Vec<Entry>) -> HttpArchive {
        let mut archive = HttpArchive::default();
        archive.log.entries = entries;
        archive
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let resolver = RouteResolver::build(&archive_of(vec![]), Arc::new(PathAndQuery));
        assert!(resolver.lookup("GET", "/never-recorded").is_none());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_lookup_hit_by_path() {
        let archive = archive_of(vec![entry("GET", "https://example.com/ip?format=json", 200)]);
        let resolver = RouteResolver::build(&archive, Arc::new(PathAndQuery));

        let hit = resolver.lookup("GET", "/ip?format=json").unwrap();
        assert_eq!(hit.status, 200);
    }

    #[test]
    fn test_method_mismatch_misses() {
        let archive = archive_of(vec![entry("GET", "https://example.com/x", 200)]);
        let resolver = RouteResolver::build(&archive, Arc::new(PathAndQuery));

        assert!(resolver.lookup("POST", "/x").is_none());
        assert!(resolver.lookup("get", "/x").is_some());
    }

    #[test]
    fn test_repeated_route_sequences_in_archive_order() {
        let archive = archive_of(vec![
            entry("GET", "https://example.com/x", 200),
            entry("GET", "https://example.com/x", 500),
            entry("GET", "https://example.com/x", 503),
        ]);
        let resolver = RouteResolver::build(&archive, Arc::new(PathAndQuery));

        let statuses: Vec<u16> = (0..5)
            .map(|_| resolver.lookup("GET", "/x").unwrap().status)
            .collect();
        assert_eq!(statuses, vec![200, 500, 503, 503, 503]);
    }

    #[test]
    fn test_addressing_mode_isolation() {
        let entries = vec![
            entry("GET", "https://one.example.com/x", 200),
            entry("GET", "https://two.example.com/x", 404),
        ];

        // Path mode folds the two hosts into one route
        let by_path = RouteResolver::build(&archive_of(entries.clone()), Arc::new(PathAndQuery));
        assert_eq!(by_path.route_count(), 1);
        assert_eq!(by_path.lookup("GET", "/x").unwrap().status, 200);
        assert_eq!(by_path.lookup("GET", "/x").unwrap().status, 404);

        // Absolute mode keeps them apart
        let by_url = RouteResolver::build(&archive_of(entries), Arc::new(AbsoluteUrl));
        assert_eq!(by_url.route_count(), 2);
        assert_eq!(
            by_url
                .lookup("GET", "https://two.example.com/x")
                .unwrap()
                .status,
            404
        );
    }

    #[test]
    fn test_entry_without_response_is_unmatchable() {
        let mut unfinished = entry("GET", "https://example.com/x", 200);
        unfinished.response = None;

        let resolver = RouteResolver::build(&archive_of(vec![unfinished]), Arc::new(PathAndQuery));
        assert!(resolver.lookup("GET", "/x").is_none());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_vary_header_strategy_is_pluggable() {
        let mut json_entry = entry("GET", "https://example.com/x", 200);
        json_entry.request.headers = vec![Header::new("accept", "application/json")];
        let mut xml_entry = entry("GET", "https://example.com/x", 201);
        xml_entry.request.headers = vec![Header::new("accept", "application/xml")];

        let resolver = RouteResolver::build(
            &archive_of(vec![json_entry, xml_entry]),
            Arc::new(VaryHeaderAware::new(["accept"])),
        );
        assert_eq!(resolver.route_count(), 2);

        let hit = resolver
            .lookup_with_headers(
                "GET",
                "https://example.com/x",
                &[Header::new("Accept", "application/xml")],
            )
            .unwrap();
        assert_eq!(hit.status, 201);
    }
}
