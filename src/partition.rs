//! Today/tomorrow partitioning of normalized events.
//!
//! Pure logic, no I/O. The coordinator resolves "now" once per cycle and
//! passes the resulting reference date here, so a cycle cannot straddle a
//! date boundary internally.

use chrono::{Days, NaiveDate, TimeZone};
use std::collections::BTreeMap;

use crate::model::{Event, Period, VenueView};

/// Classify events into per-venue today/tomorrow views.
///
/// `reference_date` is the caller's "today" in `tz`; tomorrow is the
/// following calendar day. An event belongs to the calendar date its start
/// time falls on when converted to `tz`; a performance crossing midnight is
/// attributed to its start date only (fixed policy, not derived from the
/// source). Events outside the two-day window are dropped.
///
/// Within each venue and period, events are ordered by start time ascending,
/// ties broken by performer name. The venue map is a `BTreeMap` so iteration
/// order is deterministic.
pub fn partition<Tz: TimeZone>(
    events: Vec<Event>,
    reference_date: NaiveDate,
    tz: &Tz,
) -> BTreeMap<String, VenueView> {
    let tomorrow = reference_date.checked_add_days(Days::new(1));
    let mut venues: BTreeMap<String, VenueView> = BTreeMap::new();

    for event in events {
        let local_date = event.start_time.with_timezone(tz).date_naive();
        let period = if local_date == reference_date {
            Period::Today
        } else if Some(local_date) == tomorrow {
            Period::Tomorrow
        } else {
            continue;
        };

        let view = venues
            .entry(event.venue.clone())
            .or_insert_with(|| VenueView::new(event.venue.clone()));
        match period {
            Period::Today => view.today.push(event),
            Period::Tomorrow => view.tomorrow.push(event),
        }
    }

    for view in venues.values_mut() {
        sort_events(&mut view.today);
        sort_events(&mut view.tomorrow);
    }

    venues
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.performer.cmp(&b.performer))
    });
}
