//! Stagewatch: a failure-tolerant polling engine for venue performance
//! calendars.
//!
//! The crate periodically asks a calendar source for a two-day window of
//! performances, reshapes the answer into per-venue today/tomorrow views,
//! detects appearances by favorite performers, and publishes the result as
//! an immutable snapshot.
//!
//! # Architecture
//!
//! Leaf-first, with the coordinator orchestrating the pure stages:
//! - **Normalizer** ([`normalize`]): loosely typed source records →
//!   validated [`Event`]s, bad records skipped and counted
//! - **Partitioner** ([`partition`]): events → per-venue today/tomorrow
//!   views under a caller-supplied timezone
//! - **Favorite matcher** ([`favorites`]): case-insensitive exact matching
//!   against the configured performer list
//! - **Retry policy** ([`retry`]): pure failure-count → (delay,
//!   availability) schedule
//! - **Coordinator** ([`coordinator`]): single-flight fetch cycles on a
//!   timer, owning the last-good [`Snapshot`] and the retry bookkeeping
//!
//! Consumers read [`UpdateCoordinator::current_snapshot`] (an atomic
//! pointer handoff, never blocked by a fetch in flight) and subscribe to
//! per-cycle change notifications.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use stagewatch::{HttpEventSource, UpdateCoordinator, WatchConfig};
//!
//! # async fn example() -> stagewatch::Result<()> {
//! let source = Arc::new(HttpEventSource::new("https://calendar.example.com")?);
//! let config = WatchConfig {
//!     favorite_performers: WatchConfig::parse_performers("Retro Express, The Fixx"),
//!     ..Default::default()
//! };
//! let coordinator = Arc::new(UpdateCoordinator::new(source, config, Utc)?);
//! let handle = coordinator.start();
//!
//! if let Some(snapshot) = coordinator.current_snapshot() {
//!     for (venue, view) in &snapshot.venues {
//!         println!("{venue}: {} events today", view.today.len());
//!     }
//! }
//! # handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod favorites;
pub mod model;
pub mod normalize;
pub mod partition;
pub mod retry;
pub mod source;

pub use config::WatchConfig;
pub use coordinator::{
    CoordinatorEvent, CoordinatorHandle, Phase, RefreshOutcome, UpdateCoordinator,
};
pub use error::{Error, Result};
pub use favorites::FavoriteSet;
pub use model::{Event, FavoriteMatch, FavoriteMatches, Period, Snapshot, VenueView};
pub use normalize::{NormalizedBatch, normalize};
pub use partition::partition;
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use source::{EventSource, HttpEventSource, SourceError};
