//! HTTP calendar-feed source.
//!
//! Speaks a small JSON contract: `GET {base_url}/events?start=..&end=..`
//! answering with a JSON array of event records. Field validation is left to
//! the normalizer; this module only moves bytes and classifies transport
//! failures.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{EventSource, SourceError};
use crate::error::{Error, Result};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Calendar source backed by a JSON HTTP feed.
#[derive(Debug)]
pub struct HttpEventSource {
    /// Feed base URL without a trailing slash.
    base_url: String,
    /// Shared HTTP client with the per-request timeout applied.
    client: reqwest::Client,
}

impl HttpEventSource {
    /// Create a source for `base_url` with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a source with an explicit per-request timeout.
    ///
    /// The URL is validated here so a typo surfaces at setup time rather
    /// than as an endless retry loop.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let raw = base_url.into();
        let base_url = raw.trim_end_matches('/').to_owned();
        reqwest::Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid source URL `{raw}`: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { base_url, client })
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(err.to_string())
    } else if err.is_connect() {
        SourceError::Connect(err.to_string())
    } else if err.is_decode() {
        SourceError::Decode(err.to_string())
    } else {
        SourceError::Other(err.to_string())
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> std::result::Result<Vec<Value>, SourceError> {
        let url = format!("{}/events?start={start}&end={end}", self.base_url);
        debug!(%url, "fetching calendar feed");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                code: status.as_u16(),
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|err| classify_reqwest_error(&err))
    }
}
