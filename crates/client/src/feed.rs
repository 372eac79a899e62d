// crates/client/src/feed.rs
//! Live leaderboard feed.
//!
//! Prefers the persistent server-push event stream; when that endpoint is
//! structurally absent the subscription runs a polling loop with the same
//! wholesale-replace semantics and the same output shape. The transport is
//! resolved once, at subscription start, and never renegotiated mid-session.
//!
//! Stream disconnects are handled by reconnecting with exponential backoff
//! (1 s doubling to a 30 s cap, reset after a connection that delivered at
//! least one snapshot). A message that fails to parse is logged and
//! discarded; it never closes the stream or touches the held snapshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use ailab_types::{LeaderboardRow, LeaderboardSnapshot};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::sse::SseDecoder;

/// Fallback transport cadence.
pub const FEED_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How the subscription picks its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPreference {
    /// Probe the stream endpoint once; fall back to polling only when the
    /// endpoint is structurally absent (404/405/501).
    Auto,
    /// Always stream, reconnecting on failure.
    Stream,
    /// Always poll.
    Poll,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub transport: TransportPreference,
    pub poll_interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            transport: TransportPreference::Auto,
            poll_interval: FEED_POLL_INTERVAL,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// The held leaderboard state, identical for both transports.
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    /// Most recently applied snapshot, replaced wholesale.
    pub rows: Option<Vec<LeaderboardRow>>,
    /// Most recent transport/fetch error; cleared by the next applied
    /// snapshot. Never clears `rows`.
    pub error: Option<String>,
    /// Bumped once per applied snapshot.
    pub revision: u64,
}

struct FeedShared {
    tx: watch::Sender<SnapshotView>,
    cancel: CancellationToken,
}

impl FeedShared {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(SnapshotView::default());
        Self { tx, cancel: CancellationToken::new() }
    }

    fn apply_rows(&self, rows: Vec<LeaderboardRow>) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.tx.send_modify(|view| {
            view.rows = Some(rows);
            view.error = None;
            view.revision += 1;
        });
    }

    fn apply_error(&self, message: String) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.tx.send_modify(|view| {
            view.error = Some(message);
        });
    }
}

/// One transport strategy. Exactly one source runs per subscription.
#[async_trait]
trait SnapshotSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Drive the transport until the subscription is cancelled.
    async fn run(&self, shared: Arc<FeedShared>);
}

/// Server-push transport over the persistent event stream.
struct StreamSource {
    api: ApiClient,
    config: FeedConfig,
    /// Connection already opened by the Auto probe, consumed on first use.
    initial: Mutex<Option<reqwest::Response>>,
}

impl StreamSource {
    fn new(api: ApiClient, config: FeedConfig, initial: Option<reqwest::Response>) -> Self {
        Self { api, config, initial: Mutex::new(initial) }
    }

    fn take_initial(&self) -> Option<reqwest::Response> {
        match self.initial.lock() {
            Ok(mut guard) => guard.take(),
            Err(e) => {
                tracing::error!("stream handoff mutex poisoned: {e}");
                None
            }
        }
    }

    /// Consume one connection until it ends. Returns how many snapshots it
    /// delivered; a transport error mid-stream surfaces as `Err`.
    async fn connect_once(&self, shared: &FeedShared) -> Result<u64, ApiError> {
        let resp = match self.take_initial() {
            Some(resp) => resp,
            None => self.api.open_leaderboard_stream().await?,
        };
        tracing::debug!("leaderboard stream connected");

        let mut body = resp.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut applied = 0u64;
        loop {
            let chunk = tokio::select! {
                _ = shared.cancel.cancelled() => return Ok(applied),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                // Server closed the stream cleanly.
                return Ok(applied);
            };
            for payload in decoder.feed(&chunk?) {
                match serde_json::from_str::<LeaderboardSnapshot>(&payload) {
                    Ok(snapshot) => {
                        shared.apply_rows(snapshot.rows);
                        applied += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding malformed stream message");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for StreamSource {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn run(&self, shared: Arc<FeedShared>) {
        let mut backoff = self.config.initial_backoff;
        loop {
            if shared.cancel.is_cancelled() {
                return;
            }
            match self.connect_once(&shared).await {
                Ok(applied) if applied > 0 => {
                    tracing::info!(applied, "leaderboard stream ended, reconnecting");
                    backoff = self.config.initial_backoff;
                }
                Ok(_) => {
                    tracing::info!("leaderboard stream ended before any snapshot");
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "leaderboard stream failed"
                    );
                    shared.apply_error(e.to_string());
                }
            }
            tokio::select! {
                _ = shared.cancel.cancelled() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }
}

/// Pull transport: periodic snapshot fetches, same output shape.
struct PollSource {
    api: ApiClient,
    interval: Duration,
}

#[async_trait]
impl SnapshotSource for PollSource {
    fn name(&self) -> &'static str {
        "poll"
    }

    async fn run(&self, shared: Arc<FeedShared>) {
        let mut ticks = tokio::time::interval(self.interval);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shared.cancel.cancelled() => return,
                _ = ticks.tick() => {
                    match self.api.leaderboard().await {
                        Ok(snapshot) => shared.apply_rows(snapshot.rows),
                        Err(e) => {
                            tracing::warn!(error = %e, "leaderboard poll failed");
                            shared.apply_error(e.to_string());
                        }
                    }
                }
            }
        }
    }
}

/// Resolve the transport once, per the configured preference.
async fn select_source(
    api: ApiClient,
    config: FeedConfig,
    shared: &FeedShared,
) -> Option<Box<dyn SnapshotSource>> {
    match config.transport {
        TransportPreference::Poll => {
            Some(Box::new(PollSource { api, interval: config.poll_interval }))
        }
        TransportPreference::Stream => Some(Box::new(StreamSource::new(api, config, None))),
        TransportPreference::Auto => {
            let probe = tokio::select! {
                _ = shared.cancel.cancelled() => return None,
                probe = api.open_leaderboard_stream() => probe,
            };
            match probe {
                Ok(resp) => Some(Box::new(StreamSource::new(api, config, Some(resp)))),
                Err(e) if matches!(e.status(), Some(404 | 405 | 501)) => {
                    tracing::info!(
                        error = %e,
                        "leaderboard stream endpoint unavailable, polling instead"
                    );
                    Some(Box::new(PollSource { api, interval: config.poll_interval }))
                }
                // Transient failure: the endpoint may exist, keep streaming
                // and let the reconnect loop retry it.
                Err(e) => {
                    tracing::warn!(error = %e, "leaderboard stream probe failed, will retry");
                    shared.apply_error(e.to_string());
                    Some(Box::new(StreamSource::new(api, config, None)))
                }
            }
        }
    }
}

/// A live leaderboard subscription.
///
/// Exactly one transport is active for its lifetime; `stop()` (or drop)
/// releases the stream or the timer, after which the view never mutates
/// again.
pub struct LeaderboardFeed {
    shared: Arc<FeedShared>,
}

impl LeaderboardFeed {
    pub fn start(api: ApiClient) -> Self {
        Self::with_config(api, FeedConfig::default())
    }

    pub fn with_config(api: ApiClient, config: FeedConfig) -> Self {
        let shared = Arc::new(FeedShared::new());
        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let Some(source) = select_source(api, config, &task_shared).await else {
                return;
            };
            tracing::info!(transport = source.name(), "leaderboard feed started");
            source.run(task_shared).await;
        });
        Self { shared }
    }

    pub fn subscribe(&self) -> watch::Receiver<SnapshotView> {
        self.shared.tx.subscribe()
    }

    pub fn view(&self) -> SnapshotView {
        self.shared.tx.borrow().clone()
    }

    pub fn stop(&self) {
        self.shared.cancel.cancel();
    }
}

impl Drop for LeaderboardFeed {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
