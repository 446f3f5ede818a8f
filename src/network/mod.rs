//! Transport seam for forwarding unmatched requests

mod client;

pub use client::{HttpRequest, HttpResponse, HyperTransport, RequestBody, Transport};
