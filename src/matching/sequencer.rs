//! Per-route response sequencing
//!
//! A route recorded N times serves its responses front to back, but the
//! final response is never consumed: once one element remains it repeats on
//! every further lookup. Tests that replay a route many times rely on the
//! last recorded state persisting, so this is deliberately not a rotating
//! queue.

use std::collections::VecDeque;

use crate::har::Response;

/// Ordered cursor over the responses recorded for one route
#[derive(Debug, Clone, Default)]
pub struct ResponseSequencer {
    responses: VecDeque<Response>,
}

impl ResponseSequencer {
    /// Create an empty sequencer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response; only called while the resolver table is built
    pub fn push(&mut self, response: Response) {
        self.responses.push_back(response);
    }

    /// Next response to serve
    ///
    /// Pops from the front while more than one remains; the last one is
    /// returned without being removed. `None` only when never populated.
    pub fn next_response(&mut self) -> Option<Response> {
        if self.responses.len() > 1 {
            self.responses.pop_front()
        } else {
            self.responses.front().cloned()
        }
    }

    /// Number of responses still queued
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether the sequencer was never populated
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn response_with_status(status: u16) -> Response {
        Response {
            status,
            ..Response::default()
        }
    }

    #[test]
    fn test_empty_sequencer_is_none() {
        let mut seq = ResponseSequencer::new();
        assert!(seq.next_response().is_none());
    }

    #[test]
    fn test_single_response_repeats_forever() {
        let mut seq = ResponseSequencer::new();
        seq.push(response_with_status(200));

        for _ in 0..5 {
            assert_eq!(seq.next_response().unwrap().status, 200);
        }
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_fifo_then_sticky_last() {
        let mut seq = ResponseSequencer::new();
        for status in [200, 201, 202] {
            seq.push(response_with_status(status));
        }

        let served: Vec<u16> = (0..5)
            .map(|_| seq.next_response().unwrap().status)
            .collect();
        assert_eq!(served, vec![200, 201, 202, 202, 202]);
    }

    proptest! {
        #[test]
        fn prop_all_but_last_served_once_then_last_repeats(
            statuses in proptest::collection::vec(100u16..600, 1..10),
            extra_lookups in 0usize..5,
        ) {
            let mut seq = ResponseSequencer::new();
            for &status in &statuses {
                seq.push(response_with_status(status));
            }

            let lookups = statuses.len() + extra_lookups;
            let served: Vec<u16> = (0..lookups)
                .map(|_| seq.next_response().unwrap().status)
                .collect();

            let mut expected: Vec<u16> = statuses.clone();
            let last = *statuses.last().unwrap();
            expected.extend(std::iter::repeat(last).take(extra_lookups));

            prop_assert_eq!(served, expected);
        }
    }
}
