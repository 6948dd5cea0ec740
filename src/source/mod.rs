//! Source collaborator boundary.
//!
//! The calendar source is opaque to the core: given a date range it returns
//! loosely typed records or fails. All field validation happens in
//! [`crate::normalize`]; all error variants here are uniformly transient to
//! the coordinator.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

pub mod http;

pub use http::HttpEventSource;

/// Errors reported by a calendar source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Could not reach the source.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The source answered with a non-success HTTP status.
    #[error("unexpected HTTP status {code}")]
    Status {
        /// The status code received.
        code: u16,
    },

    /// The response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// Any other source-side failure.
    #[error("source error: {0}")]
    Other(String),
}

/// A calendar source that lists raw event records for a date range.
///
/// Implementations may hit the network; the coordinator issues at most one
/// `fetch` at a time and maps any error onto its failure path.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch raw event records for the inclusive window `[start, end]`.
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Value>, SourceError>;
}
