//! HTTP Archive (HAR 1.2) data model, persistence, and recording

mod builder;
mod model;
mod store;

pub use builder::{ArchiveBuilder, ExchangeBuilder};
pub use model::{Content, Creator, Entry, Header, HttpArchive, Log, PostData, Request, Response};
pub use store::{canonical_path, load, save};

/// File extension appended to archive paths that omit it
pub const ARCHIVE_EXTENSION: &str = "har";

/// HAR format version written by this crate
pub const HAR_VERSION: &str = "1.2";
