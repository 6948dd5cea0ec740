//! End-to-end coordinator scenarios: fetch → normalize → partition → match →
//! publish, plus the failure/recovery path.
//!
//! The source collaborator is scripted in-process; the HTTP source has its
//! own integration tests against a mock server.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta, Utc};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagewatch::{
    CoordinatorEvent, EventSource, Phase, RefreshOutcome, SourceError, UpdateCoordinator,
    WatchConfig,
};

type FetchResult = Result<Vec<Value>, SourceError>;

/// Source that pops scripted results and counts calls.
struct ScriptedSource {
    calls: AtomicUsize,
    script: Mutex<VecDeque<FetchResult>>,
}

impl ScriptedSource {
    fn new(script: Vec<FetchResult>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch(&self, _start: NaiveDate, _end: NaiveDate) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn record(performer: &str, venue: &str, start: chrono::DateTime<Utc>) -> Value {
    json!({
        "performer": performer,
        "venue": venue,
        "start_time": start.to_rfc3339(),
        "end_time": (start + TimeDelta::hours(2)).to_rfc3339(),
        "event_type": "Live Music",
    })
}

/// Opt-in test logging: `RUST_LOG=debug cargo test` shows coordinator traces.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn build(source: Arc<ScriptedSource>, favorites: &str) -> Arc<UpdateCoordinator<Utc>> {
    init_tracing();
    let config = WatchConfig {
        favorite_performers: WatchConfig::parse_performers(favorites),
        ..Default::default()
    };
    Arc::new(UpdateCoordinator::new(source, config, Utc).expect("valid config"))
}

/// Scenario: one event today at Town Square; the snapshot exposes it in the
/// venue's today sequence and nowhere else.
#[tokio::test]
async fn single_event_today_lands_in_today_view() {
    let source = ScriptedSource::new(vec![Ok(vec![record(
        "Test Band",
        "Town Square",
        Utc::now(),
    )])]);
    let coordinator = build(source, "");

    assert!(coordinator.current_snapshot().is_none());
    assert_eq!(coordinator.refresh(false).await, RefreshOutcome::Updated);

    let snapshot = coordinator.current_snapshot().expect("published snapshot");
    let view = &snapshot.venues["Town Square"];
    assert_eq!(view.today.len(), 1);
    assert_eq!(view.today[0].performer, "Test Band");
    assert!(view.tomorrow.is_empty());
    assert_eq!(view.slug, "town_square");
    assert!(!snapshot.is_stale);
}

/// Scenario: three consecutive source failures. Consumers keep the last good
/// data (stale) and the availability verdict flips.
#[tokio::test]
async fn three_failures_keep_stale_data_and_flip_availability() {
    let fail = || Err(SourceError::Connect("refused".into()));
    let source = ScriptedSource::new(vec![
        Ok(vec![record("Test Band", "Town Square", Utc::now())]),
        fail(),
        fail(),
        fail(),
    ]);
    let coordinator = build(source, "");

    coordinator.refresh(false).await;
    let good = coordinator.current_snapshot().expect("first snapshot");

    for expected_failures in 1..=3u32 {
        let outcome = coordinator.refresh(true).await;
        assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
        assert_eq!(coordinator.consecutive_failures(), expected_failures);
    }

    assert!(!coordinator.available());
    assert_eq!(coordinator.phase(), Phase::Unavailable);

    let stale = coordinator.current_snapshot().expect("retained snapshot");
    assert!(stale.is_stale);
    assert_eq!(stale.fetched_at, good.fetched_at);
    assert_eq!(stale.venues, good.venues);
}

/// Scenario: a favorite performs tomorrow; the tomorrow match fires and the
/// today match stays empty.
#[tokio::test]
async fn favorite_tomorrow_matches_only_tomorrow() {
    let source = ScriptedSource::new(vec![Ok(vec![record(
        "Retro Express",
        "Lake Venue",
        Utc::now() + TimeDelta::days(1),
    )])]);
    let coordinator = build(source, "Retro Express");

    coordinator.refresh(false).await;
    let snapshot = coordinator.current_snapshot().expect("published snapshot");

    assert!(snapshot.favorites.tomorrow.is_match);
    assert_eq!(snapshot.favorites.tomorrow.matched_events.len(), 1);
    assert_eq!(
        snapshot.favorites.tomorrow.matched_events[0].performer,
        "Retro Express"
    );
    assert!(!snapshot.favorites.today.is_match);
    assert!(snapshot.favorites.today.matched_events.is_empty());
}

/// A success after a run of failures resets the failure accounting and the
/// availability verdict.
#[tokio::test]
async fn success_after_failures_resets_accounting() {
    let fail = || Err(SourceError::Timeout("slow".into()));
    let source = ScriptedSource::new(vec![
        fail(),
        fail(),
        fail(),
        Ok(vec![record("Test Band", "Town Square", Utc::now())]),
    ]);
    let coordinator = build(source, "");

    for _ in 0..3 {
        coordinator.refresh(true).await;
    }
    assert!(!coordinator.available());
    assert_eq!(coordinator.consecutive_failures(), 3);

    assert_eq!(coordinator.refresh(true).await, RefreshOutcome::Updated);
    assert!(coordinator.available());
    assert_eq!(coordinator.consecutive_failures(), 0);
    assert_eq!(coordinator.phase(), Phase::Updated);
    assert!(!coordinator.current_snapshot().expect("snapshot").is_stale);
}

/// Failing before any success leaves no snapshot at all: "never fetched" is
/// distinguishable from "stale but present".
#[tokio::test]
async fn failures_before_first_success_leave_no_snapshot() {
    let source = ScriptedSource::new(vec![Err(SourceError::Status { code: 500 })]);
    let coordinator = build(source, "");

    let outcome = coordinator.refresh(false).await;
    assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
    assert!(coordinator.current_snapshot().is_none());
    assert_eq!(coordinator.phase(), Phase::FailedRetrying);
}

/// Subscribers get exactly one notification per completed cycle, success or
/// failure.
#[tokio::test]
async fn subscribers_hear_every_cycle_once() {
    let source = ScriptedSource::new(vec![
        Ok(Vec::new()),
        Err(SourceError::Other("boom".into())),
        Ok(Vec::new()),
    ]);
    let coordinator = build(source, "");
    let mut events = coordinator.subscribe();

    coordinator.refresh(false).await;
    coordinator.refresh(true).await;
    coordinator.refresh(true).await;

    assert_eq!(events.recv().await.unwrap(), CoordinatorEvent::Updated);
    assert_eq!(events.recv().await.unwrap(), CoordinatorEvent::RefreshFailed);
    assert_eq!(events.recv().await.unwrap(), CoordinatorEvent::Updated);
    assert!(events.try_recv().is_err());
}

/// A watch subscriber observes the publication without ever blocking on the
/// fetch itself.
#[tokio::test]
async fn watch_receiver_observes_publication() {
    let source = ScriptedSource::new(vec![Ok(vec![record(
        "Test Band",
        "Town Square",
        Utc::now(),
    )])]);
    let coordinator = build(source, "");
    let mut snapshots = coordinator.watch_snapshots();
    assert!(snapshots.borrow().is_none());

    let waiter = tokio::spawn(async move {
        snapshots.changed().await.expect("sender alive");
        snapshots.borrow().clone().expect("snapshot present")
    });

    coordinator.refresh(false).await;
    let seen = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("watch notified")
        .expect("waiter task");
    assert_eq!(seen.venues["Town Square"].today.len(), 1);
}

/// Bad records are dropped per-record, not per-batch.
#[tokio::test]
async fn malformed_records_do_not_poison_the_cycle() {
    let good = record("Test Band", "Town Square", Utc::now());
    let source = ScriptedSource::new(vec![Ok(vec![
        json!({"performer": "No Times", "venue": "Town Square"}),
        good,
        json!(42),
    ])]);
    let coordinator = build(source, "");

    assert_eq!(coordinator.refresh(false).await, RefreshOutcome::Updated);
    let snapshot = coordinator.current_snapshot().expect("snapshot");
    assert_eq!(snapshot.venues["Town Square"].today.len(), 1);
}

/// The background loop issues the first fetch on start and stops cleanly on
/// shutdown.
#[tokio::test]
async fn polling_loop_fetches_once_on_start() {
    let source = ScriptedSource::new(Vec::new());
    let coordinator = build(Arc::clone(&source), "");

    let handle = coordinator.start();
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.current_snapshot().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first cycle completed");

    handle.shutdown().await;
    // Steady-state interval is 60 minutes, so exactly one fetch ran.
    assert_eq!(source.calls(), 1);
}
