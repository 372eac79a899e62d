// crates/client/src/lib.rs
//! Client-side synchronization layer for an AI Lab instance.
//!
//! Components:
//! - [`api::ApiClient`] — thin request/response wrapper that attaches
//!   credentials and decodes typed JSON envelopes.
//! - [`poll::JobsWatch`] / [`poll::JobWatch`] — cadence-driven reconciled
//!   views of the job collection and a single job, with submit/cancel.
//! - [`feed::LeaderboardFeed`] — live leaderboard snapshots over SSE, with
//!   a polling transport selected when streaming is structurally absent.
//! - [`award::AwardProcessor`] — XP awards with an offline local-accounting
//!   fallback behind an injectable [`store::StatsStore`].
//!
//! Every component owns its state and its timer/transport exclusively and
//! releases both on `stop()`/drop. Failures degrade to "keep the last known
//! good state and keep trying"; nothing here panics the process.

pub mod admin;
pub mod api;
pub mod auth;
pub mod award;
pub mod error;
pub mod feed;
pub mod poll;
mod sse;
pub mod store;

pub use api::ApiClient;
pub use auth::{EnvTokens, StaticTokens, TokenSource};
pub use award::{AwardOutcome, AwardProcessor, LevelUp};
pub use error::{ApiError, AwardError, StoreError};
pub use feed::{FeedConfig, LeaderboardFeed, SnapshotView, TransportPreference};
pub use poll::{CancelOutcome, JobWatch, JobsWatch, PollConfig, PollView};
pub use store::{JsonStatsStore, MemoryStatsStore, StatsStore};
