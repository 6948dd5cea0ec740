//! Favorite-performer matching.
//!
//! Matching is exact equality after trimming and lowercasing both sides.
//! No substring or fuzzy matching: "The Fixx" does not match "Fixx".

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Event, FavoriteMatch, FavoriteMatches, Period, VenueView};

/// Normalized set of favorite performer names.
///
/// Names are trimmed and lowercased on construction; empty entries are
/// dropped. Lookups apply the same normalization to the candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    names: BTreeSet<String>,
}

impl FavoriteSet {
    /// Build a set from raw performer names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .filter_map(|name| {
                let normalized = name.as_ref().trim().to_lowercase();
                (!normalized.is_empty()).then_some(normalized)
            })
            .collect();
        Self { names }
    }

    /// Whether no favorites are configured.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of distinct normalized favorites.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether `performer` matches a favorite (case-insensitive, trimmed).
    pub fn contains(&self, performer: &str) -> bool {
        self.names.contains(&performer.trim().to_lowercase())
    }
}

/// Scan all venues' events for favorite performers, per period.
///
/// Matched events are ordered by start time ascending across venues (ties by
/// performer, then venue), so the output is deterministic for identical
/// input. An empty favorite set yields two non-matches.
pub fn match_favorites(
    venues: &BTreeMap<String, VenueView>,
    favorites: &FavoriteSet,
) -> FavoriteMatches {
    FavoriteMatches {
        today: match_period(venues, favorites, Period::Today),
        tomorrow: match_period(venues, favorites, Period::Tomorrow),
    }
}

fn match_period(
    venues: &BTreeMap<String, VenueView>,
    favorites: &FavoriteSet,
    period: Period,
) -> FavoriteMatch {
    let mut matched: Vec<Event> = Vec::new();

    if !favorites.is_empty() {
        for view in venues.values() {
            for event in view.events(period) {
                if favorites.contains(&event.performer) {
                    matched.push(event.clone());
                }
            }
        }
        matched.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.performer.cmp(&b.performer))
                .then_with(|| a.venue.cmp(&b.venue))
        });
    }

    FavoriteMatch {
        period,
        is_match: !matched.is_empty(),
        matched_events: matched,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::{DateTime, Utc};

    fn event(performer: &str, venue: &str, start: &str) -> Event {
        let start_time = DateTime::parse_from_rfc3339(start).unwrap().with_timezone(&Utc);
        Event {
            performer: performer.to_owned(),
            venue: venue.to_owned(),
            start_time,
            end_time: start_time + chrono::TimeDelta::hours(2),
            event_type: "Live Music".to_owned(),
            description: None,
        }
    }

    fn venues(entries: Vec<(&str, Vec<Event>, Vec<Event>)>) -> BTreeMap<String, VenueView> {
        entries
            .into_iter()
            .map(|(name, today, tomorrow)| {
                let mut view = VenueView::new(name);
                view.today = today;
                view.tomorrow = tomorrow;
                (name.to_owned(), view)
            })
            .collect()
    }

    #[test]
    fn favorite_set_normalizes_names() {
        let set = FavoriteSet::new(["  ABBA ", "", "retro EXPRESS"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("abba "));
        assert!(set.contains("Retro Express"));
        assert!(!set.contains("abba tribute"));
    }

    #[test]
    fn matching_is_case_insensitive_and_trimmed() {
        let views = venues(vec![(
            "Town Square",
            vec![event("abba ", "Town Square", "2026-08-30T19:00:00Z")],
            vec![],
        )]);
        let matches = match_favorites(&views, &FavoriteSet::new(["ABBA"]));
        assert!(matches.today.is_match);
        assert_eq!(matches.today.matched_events.len(), 1);
        assert!(!matches.tomorrow.is_match);
    }

    #[test]
    fn exact_match_only_no_substrings() {
        let views = venues(vec![(
            "Town Square",
            vec![event("The Beatles Tribute", "Town Square", "2026-08-30T19:00:00Z")],
            vec![],
        )]);
        let matches = match_favorites(&views, &FavoriteSet::new(["The Beatles"]));
        assert!(!matches.today.is_match);
        assert!(matches.today.matched_events.is_empty());
    }

    #[test]
    fn empty_favorites_never_match() {
        let views = venues(vec![(
            "Town Square",
            vec![event("Anyone", "Town Square", "2026-08-30T19:00:00Z")],
            vec![],
        )]);
        let matches = match_favorites(&views, &FavoriteSet::default());
        assert!(!matches.today.is_match);
        assert!(!matches.tomorrow.is_match);
    }

    #[test]
    fn is_match_mirrors_matched_events() {
        let views = venues(vec![(
            "Lake Venue",
            vec![],
            vec![event("Retro Express", "Lake Venue", "2026-08-31T20:00:00Z")],
        )]);
        let matches = match_favorites(&views, &FavoriteSet::new(["retro express"]));
        assert_eq!(matches.tomorrow.is_match, !matches.tomorrow.matched_events.is_empty());
        assert!(matches.tomorrow.is_match);
        assert_eq!(matches.today.is_match, !matches.today.matched_events.is_empty());
    }

    #[test]
    fn matches_order_by_start_time_across_venues() {
        let views = venues(vec![
            (
                "Zebra Hall",
                vec![event("Fav", "Zebra Hall", "2026-08-30T18:00:00Z")],
                vec![],
            ),
            (
                "Alpha Stage",
                vec![event("Fav", "Alpha Stage", "2026-08-30T21:00:00Z")],
                vec![],
            ),
        ]);
        let matches = match_favorites(&views, &FavoriteSet::new(["Fav"]));
        let order: Vec<&str> = matches
            .today
            .matched_events
            .iter()
            .map(|e| e.venue.as_str())
            .collect();
        assert_eq!(order, vec!["Zebra Hall", "Alpha Stage"]);
    }

    #[test]
    fn matching_is_idempotent() {
        let views = venues(vec![(
            "Town Square",
            vec![event("Fav", "Town Square", "2026-08-30T19:00:00Z")],
            vec![event("Fav", "Town Square", "2026-08-31T19:00:00Z")],
        )]);
        let favorites = FavoriteSet::new(["fav"]);
        let first = match_favorites(&views, &favorites);
        let second = match_favorites(&views, &favorites);
        assert_eq!(first, second);
    }
}
