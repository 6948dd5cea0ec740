//! Domain entities: events, per-venue views, favorite matches, snapshots.
//!
//! Everything here is plain data. Entities are built fresh on every fetch
//! cycle and never mutated afterwards; the coordinator replaces whole
//! [`Snapshot`] values so concurrent readers cannot observe a torn state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scheduled performance at a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Performer name as reported by the source.
    pub performer: String,
    /// Venue name as reported by the source.
    pub venue: String,
    /// Performance start (UTC; converted to the caller's zone for
    /// period classification).
    pub start_time: DateTime<Utc>,
    /// Performance end. Always after `start_time`; records violating that
    /// are discarded at normalization.
    pub end_time: DateTime<Utc>,
    /// Kind of event (e.g. "Live Music").
    pub event_type: String,
    /// Free-form description, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Time period a view covers, relative to the configured timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// The reference calendar date.
    Today,
    /// The calendar date after the reference date.
    Tomorrow,
}

impl Period {
    /// Stable lowercase identifier ("today" / "tomorrow").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-venue projection of events for both periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueView {
    /// Venue name.
    pub venue: String,
    /// Stable URL-safe identifier derived from `venue` (see [`venue_slug`]).
    pub slug: String,
    /// Today's events, ordered by start time (ties by performer).
    pub today: Vec<Event>,
    /// Tomorrow's events, same ordering.
    pub tomorrow: Vec<Event>,
}

impl VenueView {
    /// Create an empty view for `venue`.
    pub fn new(venue: impl Into<String>) -> Self {
        let venue = venue.into();
        let slug = venue_slug(&venue);
        Self {
            venue,
            slug,
            today: Vec::new(),
            tomorrow: Vec::new(),
        }
    }

    /// The event sequence for one period.
    pub fn events(&self, period: Period) -> &[Event] {
        match period {
            Period::Today => &self.today,
            Period::Tomorrow => &self.tomorrow,
        }
    }
}

/// Result of matching configured favorites against one period's events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMatch {
    /// Which period this result covers.
    pub period: Period,
    /// Whether any favorite performs in this period. Always equals
    /// `!matched_events.is_empty()`.
    pub is_match: bool,
    /// Matching events, ordered by start time across all venues.
    pub matched_events: Vec<Event>,
}

impl FavoriteMatch {
    /// An empty (no-match) result for `period`.
    pub fn empty(period: Period) -> Self {
        Self {
            period,
            is_match: false,
            matched_events: Vec::new(),
        }
    }
}

/// Favorite-match results for both periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMatches {
    /// Matches for the reference date.
    pub today: FavoriteMatch,
    /// Matches for the following date.
    pub tomorrow: FavoriteMatch,
}

impl FavoriteMatches {
    /// No matches in either period.
    pub fn empty() -> Self {
        Self {
            today: FavoriteMatch::empty(Period::Today),
            tomorrow: FavoriteMatch::empty(Period::Tomorrow),
        }
    }

    /// The result for one period.
    pub fn get(&self, period: Period) -> &FavoriteMatch {
        match period {
            Period::Today => &self.today,
            Period::Tomorrow => &self.tomorrow,
        }
    }
}

/// Immutable result of one fetch cycle.
///
/// Published whole by the coordinator; `is_stale` flips to `true` only by
/// republishing a copy when a later cycle fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Per-venue views keyed by venue name (sorted for deterministic
    /// iteration).
    pub venues: BTreeMap<String, VenueView>,
    /// Favorite-performer matches for both periods.
    pub favorites: FavoriteMatches,
    /// When the source data behind this snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
    /// `true` once a later fetch cycle has failed; the data itself is the
    /// last known good state.
    pub is_stale: bool,
}

/// Derive a stable URL-safe slug from a venue name.
///
/// Lowercases, collapses runs of non-alphanumeric characters into single
/// underscores, and trims leading/trailing underscores:
/// `"Lake Sumter Landing"` → `"lake_sumter_landing"`.
pub fn venue_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_separator = true;
    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_was_separator = false;
        } else if !last_was_separator {
            slug.push('_');
            last_was_separator = true;
        }
    }
    slug.trim_end_matches('_').to_owned()
}
