//! Error types for the stagewatch core.

/// Top-level error type for the watcher.
///
/// Transient source failures never surface through this type; the
/// coordinator absorbs them and reschedules per the backoff policy. Only
/// problems detected before any fetch (bad configuration, unusable source
/// endpoint) are reported synchronously.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration rejected at construction time.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
