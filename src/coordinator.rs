//! Update coordinator: the single-flight polling engine that owns the
//! authoritative snapshot.
//!
//! One coordinator instance drives the whole data flow: on each cycle it
//! asks the source for a two-day window, normalizes and partitions the
//! records, matches favorites, and atomically publishes a fresh
//! [`Snapshot`]. Failures keep the previous snapshot (marked stale), adjust
//! the retry schedule, and never surface as errors to consumers.
//!
//! Concurrency model: the source call is the only suspension point. Snapshot
//! publication goes through a `watch` channel holding `Option<Arc<Snapshot>>`,
//! so readers see a single atomic pointer handoff and never wait on a fetch
//! in flight.

use chrono::{Days, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::error::Result;
use crate::favorites::{FavoriteSet, match_favorites};
use crate::model::Snapshot;
use crate::normalize::normalize;
use crate::partition::partition;
use crate::retry::{MAX_CONSECUTIVE_FAILURES, RetryState};
use crate::source::{EventSource, SourceError};

/// Buffer size for the change-notification channel.
const EVENT_CHANNEL_SIZE: usize = 16;

/// Lifecycle phase of the coordinator's fetch state machine.
///
/// `Unavailable` is not terminal: the next scheduled cycle re-enters
/// `Fetching` and a success recovers automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No fetch attempted yet.
    Initial,
    /// A fetch is in flight.
    Fetching,
    /// The last cycle succeeded.
    Updated,
    /// The last cycle failed; retrying within the availability budget.
    FailedRetrying,
    /// Three or more consecutive failures.
    Unavailable,
}

/// Change notification delivered to subscribers after every completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// A fresh snapshot was published.
    Updated,
    /// The cycle failed; any previous snapshot is retained as stale.
    RefreshFailed,
}

/// Outcome of one [`UpdateCoordinator::refresh`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fresh snapshot was published.
    Updated,
    /// The fetch failed; the next attempt follows the backoff schedule.
    Failed {
        /// The source failure that ended the cycle.
        error: SourceError,
    },
    /// No fetch was issued: either a concurrent cycle completed on our
    /// behalf, or a non-forced call landed inside the backoff window.
    Skipped,
}

/// Mutable bookkeeping owned by the coordinator.
struct Shared {
    retry: RetryState,
    phase: Phase,
}

/// Single-flight, failure-tolerant polling coordinator.
///
/// Construction validates the configuration; everything after that is
/// infallible from the caller's perspective. Wrap in an [`Arc`] and call
/// [`start`](Self::start) to drive cycles on a timer, or call
/// [`refresh`](Self::refresh) directly.
pub struct UpdateCoordinator<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    source: Arc<dyn EventSource>,
    favorites: FavoriteSet,
    timezone: Tz,
    update_interval: Duration,
    shared: Mutex<Shared>,
    /// Single-flight gate: held for the whole fetch cycle. Waiters resolve
    /// once the in-flight cycle completes, without a second source call.
    fetch_gate: AsyncMutex<()>,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    snapshot_rx: watch::Receiver<Option<Arc<Snapshot>>>,
    events_tx: broadcast::Sender<CoordinatorEvent>,
}

impl<Tz> UpdateCoordinator<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    /// Create a coordinator for `source` with the given configuration and
    /// reference timezone.
    ///
    /// Fails fast with [`crate::Error::Config`] on an interval outside
    /// 15–1440 minutes; this is the only synchronous error path.
    pub fn new(source: Arc<dyn EventSource>, config: WatchConfig, timezone: Tz) -> Result<Self> {
        config.validate()?;
        let favorites = FavoriteSet::new(&config.favorite_performers);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Ok(Self {
            source,
            favorites,
            timezone,
            update_interval: config.update_interval(),
            shared: Mutex::new(Shared {
                retry: RetryState::default(),
                phase: Phase::Initial,
            }),
            fetch_gate: AsyncMutex::new(()),
            snapshot_tx,
            snapshot_rx,
            events_tx,
        })
    }

    /// The last published snapshot, or `None` if no fetch has ever
    /// succeeded.
    ///
    /// "Never fetched" (`None`) is deliberately distinguishable from "stale
    /// but present" (`Some` with `is_stale == true`).
    pub fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot_rx.borrow().clone()
    }

    /// A watch receiver over published snapshots, for consumers that want to
    /// await changes instead of polling.
    pub fn watch_snapshots(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to per-cycle change notifications.
    ///
    /// Exactly one event is sent per completed cycle, success or failure.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events_tx.subscribe()
    }

    /// Current state-machine phase.
    pub fn phase(&self) -> Phase {
        self.lock_shared().phase
    }

    /// Whether consumers should treat the data as available.
    pub fn available(&self) -> bool {
        self.lock_shared().retry.available
    }

    /// Fetch attempts that failed since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock_shared().retry.consecutive_failures
    }

    /// Run one fetch cycle.
    ///
    /// Single-flight: if a cycle is already in flight, this call waits for
    /// it and returns [`RefreshOutcome::Skipped`] without touching the
    /// source — the in-flight cycle's result is observable via
    /// [`current_snapshot`](Self::current_snapshot) and
    /// [`phase`](Self::phase). A non-forced call inside the backoff window
    /// is also `Skipped`; `force` bypasses the window but never the
    /// single-flight guard.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        match self.fetch_gate.try_lock() {
            Ok(_guard) => {
                if !force && self.in_backoff() {
                    debug!("refresh skipped: backoff window has not elapsed");
                    return RefreshOutcome::Skipped;
                }
                self.run_cycle().await
            }
            Err(_) => {
                let _wait = self.fetch_gate.lock().await;
                debug!("refresh coalesced into an in-flight cycle");
                RefreshOutcome::Skipped
            }
        }
    }

    /// Spawn the background polling loop.
    ///
    /// The loop refreshes immediately, then sleeps for the steady-state
    /// interval after a success or the policy delay after a failure. The
    /// returned handle cancels a pending sleep on shutdown; an in-flight
    /// fetch runs to completion.
    pub fn start(self: &Arc<Self>) -> CoordinatorHandle {
        let coordinator = Arc::clone(self);
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let _ = coordinator.refresh(false).await;
                let delay = coordinator.next_delay();
                debug!(delay_secs = delay.as_secs(), "next fetch cycle scheduled");
                tokio::select! {
                    _ = loop_cancel.cancelled() => {
                        debug!("coordinator loop stopped");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        });
        CoordinatorHandle { cancel, task }
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        // Resolve "now" exactly once so the window cannot straddle a date
        // boundary within a cycle.
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);

        self.set_phase(Phase::Fetching);
        debug!(%today, %tomorrow, "fetching events window");

        match self.source.fetch(today, tomorrow).await {
            Ok(records) => {
                let batch = normalize(&records);
                if batch.skipped > 0 {
                    warn!(skipped = batch.skipped, "discarded malformed event records");
                }
                let venues = partition(batch.events, today, &self.timezone);
                let favorites = match_favorites(&venues, &self.favorites);
                let snapshot = Arc::new(Snapshot {
                    venues,
                    favorites,
                    fetched_at: Utc::now(),
                    is_stale: false,
                });

                let recovered_from = {
                    let mut shared = self.lock_shared();
                    let failures = shared.retry.consecutive_failures;
                    shared.retry.record_success();
                    shared.phase = Phase::Updated;
                    failures
                };
                if recovered_from > 0 {
                    info!(
                        failures = recovered_from,
                        "recovered from consecutive fetch failures"
                    );
                }
                debug!(venues = snapshot.venues.len(), "published fresh snapshot");

                self.snapshot_tx.send_replace(Some(snapshot));
                let _ = self.events_tx.send(CoordinatorEvent::Updated);
                RefreshOutcome::Updated
            }
            Err(err) => {
                let decision = {
                    let mut shared = self.lock_shared();
                    let decision = shared.retry.record_failure(Utc::now());
                    shared.phase = if decision.available {
                        Phase::FailedRetrying
                    } else {
                        Phase::Unavailable
                    };
                    decision
                };
                warn!(
                    failure = self.consecutive_failures(),
                    max = MAX_CONSECUTIVE_FAILURES,
                    retry_in_secs = decision.delay.as_secs(),
                    error = %err,
                    "event fetch failed; keeping previous snapshot"
                );
                if !decision.available {
                    error!("maximum consecutive failures reached; data is unavailable until a fetch succeeds");
                }

                // Retain the last good snapshot, republished whole with the
                // stale flag set. fetched_at is unchanged, so readers still
                // observe non-decreasing snapshot times.
                self.snapshot_tx.send_modify(|current| {
                    if let Some(snapshot) = current {
                        if !snapshot.is_stale {
                            let mut stale = (**snapshot).clone();
                            stale.is_stale = true;
                            *snapshot = Arc::new(stale);
                        }
                    }
                });
                let _ = self.events_tx.send(CoordinatorEvent::RefreshFailed);
                RefreshOutcome::Failed { error: err }
            }
        }
    }

    fn in_backoff(&self) -> bool {
        self.lock_shared().retry.in_backoff(Utc::now())
    }

    /// Delay before the next scheduled cycle: the remaining backoff when a
    /// retry is pending, the steady-state interval otherwise.
    fn next_delay(&self) -> Duration {
        match self.lock_shared().retry.next_retry_at {
            Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => self.update_interval,
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.lock_shared().phase = phase;
    }

    fn lock_shared(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Handle to a running coordinator loop.
pub struct CoordinatorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Stop scheduling further cycles and wait for the loop to exit.
    ///
    /// A pending sleep is cancelled without side effects; an in-flight fetch
    /// runs to completion first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
