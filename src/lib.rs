//! Cassette - HAR-based HTTP record-replay for deterministic tests
//!
//! Replaces a live HTTP dependency with a previously captured archive of
//! exchanges: matched requests are answered from the archive, unmatched
//! requests are forwarded to the real transport and appended to it.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::multiple_crate_versions
)]

pub mod error;
pub mod har;
pub mod interceptor;
pub mod matching;
pub mod network;
pub mod replay;
pub mod server;

pub use error::{CassetteError, Result};
