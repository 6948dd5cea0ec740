//! Configuration handed to the update coordinator.
//!
//! The UI/configuration layer is an external collaborator; it produces a
//! [`WatchConfig`] and the coordinator validates it exactly once at
//! construction. A bad interval is rejected synchronously and never reaches
//! the retry machinery.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum allowed update interval in minutes.
pub const MIN_UPDATE_INTERVAL_MINUTES: u32 = 15;

/// Maximum allowed update interval in minutes (24 hours).
pub const MAX_UPDATE_INTERVAL_MINUTES: u32 = 1440;

/// Default steady-state update interval in minutes.
pub const DEFAULT_UPDATE_INTERVAL_MINUTES: u32 = 60;

/// Watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Steady-state fetch interval in minutes (15–1440).
    pub update_interval_minutes: u32,
    /// Performer names to watch for. Matched case-insensitively after
    /// whitespace trimming; empty entries are ignored.
    pub favorite_performers: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            update_interval_minutes: DEFAULT_UPDATE_INTERVAL_MINUTES,
            favorite_performers: Vec::new(),
        }
    }
}

impl WatchConfig {
    /// Parse a comma-separated performer list (`"Artist 1, Artist 2"`).
    ///
    /// Entries are trimmed; empty entries are dropped.
    pub fn parse_performers(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Check the update-interval bounds.
    ///
    /// Called once by [`crate::coordinator::UpdateCoordinator::new`]; not
    /// re-checked per cycle.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_UPDATE_INTERVAL_MINUTES..=MAX_UPDATE_INTERVAL_MINUTES)
            .contains(&self.update_interval_minutes)
        {
            return Err(Error::Config(format!(
                "update interval must be between {MIN_UPDATE_INTERVAL_MINUTES} and \
                 {MAX_UPDATE_INTERVAL_MINUTES} minutes, got {}",
                self.update_interval_minutes
            )));
        }
        Ok(())
    }

    /// The steady-state fetch interval as a [`std::time::Duration`].
    pub fn update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.update_interval_minutes) * 60)
    }
}
