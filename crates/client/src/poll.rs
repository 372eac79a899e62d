// crates/client/src/poll.rs
//! Cadence-driven reconciled views of the job collection and of a single job.
//!
//! Each watch owns one timer task and publishes its held state through a
//! `tokio::sync::watch` channel. On every tick one fetch is issued without
//! awaiting the previous one; responses carry a monotonically increasing
//! sequence stamp and only the newest ever applies, so a slow early response
//! can never overwrite fresher data. Fetch failures keep the last-good state
//! and never stop the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use ailab_types::{Job, JobSummary, SubmitAck};

use crate::api::ApiClient;
use crate::error::ApiError;

/// Collection view cadence.
pub const JOBS_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Detail view cadence — tighter, a user is actively watching one job finish.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll cadence override, mainly for tests and embedders.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
}

impl PollConfig {
    pub fn collection() -> Self {
        Self { interval: JOBS_POLL_INTERVAL }
    }

    pub fn detail() -> Self {
        Self { interval: JOB_POLL_INTERVAL }
    }
}

/// The held state of one polling subscription.
///
/// `data` is the most recently applied successful response, replaced
/// wholesale. `error` is the message from the most recent failed fetch, or
/// `None` after any success; a failure never clears `data`.
#[derive(Debug, Clone)]
pub struct PollView<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    /// Sequence stamp of the applied response; 0 until the first applies.
    pub seq: u64,
}

impl<T> Default for PollView<T> {
    fn default() -> Self {
        Self { data: None, error: None, seq: 0 }
    }
}

/// Outcome of a cancel request routed through a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The held status is terminal; no request was issued.
    AlreadyTerminal,
    /// The server acknowledged the cancel; a refresh was forced.
    Requested,
}

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Shared core of both watch types: sequence stamping, the apply gate, and
/// the timer loop.
struct PollHandle<T> {
    tx: watch::Sender<PollView<T>>,
    fetch: FetchFn<T>,
    issued: AtomicU64,
    applied: Mutex<u64>,
    cancel: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> PollHandle<T> {
    fn new(fetch: FetchFn<T>) -> Arc<Self> {
        let (tx, _rx) = watch::channel(PollView::default());
        Arc::new(Self {
            tx,
            fetch,
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
            cancel: CancellationToken::new(),
        })
    }

    /// Start the recurring timer. The first tick fires immediately, so the
    /// initial fetch goes out with no startup delay.
    fn spawn_loop(self: &Arc<Self>, interval: Duration) {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = handle.cancel.cancelled() => break,
                    _ = ticks.tick() => handle.spawn_fetch(),
                }
            }
        });
    }

    /// Issue one sequence-stamped fetch, out of band of the timer.
    fn spawn_fetch(self: &Arc<Self>) {
        let seq = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let fut = (self.fetch)();
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            let result = fut.await;
            handle.apply(seq, result);
        });
    }

    fn apply(&self, seq: u64, result: Result<T, ApiError>) {
        // Liveness check: a response landing after teardown is discarded.
        if self.cancel.is_cancelled() {
            return;
        }
        let mut applied = match self.applied.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("poll apply mutex poisoned: {e}");
                return;
            }
        };
        if seq <= *applied {
            tracing::debug!(seq, newest = *applied, "discarding stale poll response");
            return;
        }
        *applied = seq;
        self.tx.send_modify(|view| {
            view.seq = seq;
            match result {
                Ok(data) => {
                    view.data = Some(data);
                    view.error = None;
                }
                Err(e) => {
                    tracing::warn!(seq, error = %e, "poll fetch failed, keeping last-good state");
                    view.error = Some(e.to_string());
                }
            }
        });
    }

    fn view(&self) -> PollView<T> {
        self.tx.borrow().clone()
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Reconciled view of the job collection, refreshed every 5 seconds.
///
/// Also the entry point for submitting jobs and cancelling them from the
/// listing; both force one out-of-band refresh on acknowledgement so the UI
/// reflects the change without waiting for the next tick.
pub struct JobsWatch {
    api: ApiClient,
    handle: Arc<PollHandle<Vec<JobSummary>>>,
}

impl JobsWatch {
    pub fn start(api: ApiClient) -> Self {
        Self::with_config(api, PollConfig::collection())
    }

    pub fn with_config(api: ApiClient, config: PollConfig) -> Self {
        let fetch_api = api.clone();
        let handle = PollHandle::new(Arc::new(move || {
            let api = fetch_api.clone();
            async move { api.list_jobs().await }.boxed()
        }));
        handle.spawn_loop(config.interval);
        Self { api, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollView<Vec<JobSummary>>> {
        self.handle.tx.subscribe()
    }

    pub fn view(&self) -> PollView<Vec<JobSummary>> {
        self.handle.view()
    }

    /// Force one fetch now, without waiting for the next tick.
    pub fn refresh(&self) {
        self.handle.spawn_fetch();
    }

    /// Submit a new job and refresh the collection on acknowledgement.
    pub async fn submit(
        &self,
        language: &str,
        payload: serde_json::Value,
    ) -> Result<SubmitAck, ApiError> {
        let ack = self.api.submit_job(language, payload).await?;
        if ack.ok {
            self.refresh();
        }
        Ok(ack)
    }

    /// Cancel a job from the listing. If the held status is already
    /// terminal this is a local no-op: no request is issued.
    pub async fn cancel(&self, job_id: u64) -> Result<CancelOutcome, ApiError> {
        let held_terminal = self
            .view()
            .data
            .as_deref()
            .and_then(|jobs| jobs.iter().find(|j| j.id == job_id))
            .is_some_and(|j| j.status.is_terminal());
        if held_terminal {
            return Ok(CancelOutcome::AlreadyTerminal);
        }
        self.api.cancel_job(job_id).await?;
        self.refresh();
        Ok(CancelOutcome::Requested)
    }

    /// Stop polling. No further ticks fire and any in-flight response is
    /// discarded; the held view stays readable but never mutates again.
    pub fn stop(&self) {
        self.handle.stop();
    }
}

impl Drop for JobsWatch {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

/// Reconciled view of one job's detail, refreshed every 3 seconds.
pub struct JobWatch {
    api: ApiClient,
    job_id: u64,
    handle: Arc<PollHandle<Job>>,
}

impl JobWatch {
    pub fn start(api: ApiClient, job_id: u64) -> Self {
        Self::with_config(api, job_id, PollConfig::detail())
    }

    pub fn with_config(api: ApiClient, job_id: u64, config: PollConfig) -> Self {
        let fetch_api = api.clone();
        let handle = PollHandle::new(Arc::new(move || {
            let api = fetch_api.clone();
            async move { api.get_job(job_id).await }.boxed()
        }));
        handle.spawn_loop(config.interval);
        Self { api, job_id, handle }
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn subscribe(&self) -> watch::Receiver<PollView<Job>> {
        self.handle.tx.subscribe()
    }

    pub fn view(&self) -> PollView<Job> {
        self.handle.view()
    }

    pub fn refresh(&self) {
        self.handle.spawn_fetch();
    }

    /// Cancel the watched job, suppressed locally once the held status is
    /// terminal.
    pub async fn cancel(&self) -> Result<CancelOutcome, ApiError> {
        let held_terminal = self
            .view()
            .data
            .as_ref()
            .is_some_and(|job| job.status.is_terminal());
        if held_terminal {
            return Ok(CancelOutcome::AlreadyTerminal);
        }
        self.api.cancel_job(self.job_id).await?;
        self.refresh();
        Ok(CancelOutcome::Requested)
    }

    pub fn stop(&self) {
        self.handle.stop();
    }
}

impl Drop for JobWatch {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokens;
    use ailab_types::JobStatus;
    use pretty_assertions::assert_eq;

    /// A cadence long enough that only forced/initial fetches happen within
    /// a test's lifetime.
    const PARKED: PollConfig = PollConfig { interval: Duration::from_secs(3600) };

    fn api(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(server.url(), Arc::new(StaticTokens::default()))
    }

    async fn wait_for<T: Clone>(
        rx: &mut watch::Receiver<PollView<T>>,
        pred: impl FnMut(&PollView<T>) -> bool,
    ) -> PollView<T> {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
            .await
            .expect("timed out waiting for poll state")
            .expect("poll channel closed")
            .clone()
    }

    #[tokio::test]
    async fn first_fetch_is_immediate_and_replaces_wholesale() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs")
            .with_status(200)
            .with_body(
                r#"{"jobs": [{"id": 2, "status": "running"}, {"id": 1, "status": "queued"}]}"#,
            )
            .create_async()
            .await;

        let watch = JobsWatch::with_config(api(&server), PARKED);
        let mut rx = watch.subscribe();
        let view = wait_for(&mut rx, |v| v.data.is_some()).await;

        // Server ordering preserved as received.
        let jobs = view.data.unwrap();
        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_last_good_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs")
            .with_status(200)
            .with_body(r#"{"jobs": [{"id": 1, "status": "running"}]}"#)
            .create_async()
            .await;

        let watch =
            JobsWatch::with_config(api(&server), PollConfig { interval: Duration::from_millis(40) });
        let mut rx = watch.subscribe();
        wait_for(&mut rx, |v| v.data.is_some()).await;

        // Newest mock wins from here on: the endpoint starts failing.
        server
            .mock("GET", "/jobs")
            .with_status(500)
            .with_body(r#"{"ok": false, "error": "db down"}"#)
            .create_async()
            .await;

        let view = wait_for(&mut rx, |v| v.error.is_some()).await;
        assert!(view.error.unwrap().contains("db down"));
        // Stale-but-available: the last-good collection is still held.
        assert_eq!(view.data.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_freezes_the_view() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs")
            .with_status(200)
            .with_body(r#"{"jobs": []}"#)
            .create_async()
            .await;

        let watch =
            JobsWatch::with_config(api(&server), PollConfig { interval: Duration::from_millis(20) });
        let mut rx = watch.subscribe();
        wait_for(&mut rx, |v| v.seq > 0).await;

        watch.stop();
        let frozen_seq = watch.view().seq;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(watch.view().seq, frozen_seq);
    }

    #[test]
    fn stale_responses_never_overwrite_newer_ones() {
        let handle: Arc<PollHandle<Vec<JobSummary>>> =
            PollHandle::new(Arc::new(|| async { Ok(Vec::new()) }.boxed()));

        let newer = vec![JobSummary { id: 1, status: JobStatus::Finished, created_at: None }];
        let older = vec![JobSummary { id: 1, status: JobStatus::Running, created_at: None }];

        // Response 2 lands before response 1 (slow early fetch).
        handle.apply(2, Ok(newer.clone()));
        handle.apply(1, Ok(older));

        let view = handle.view();
        assert_eq!(view.seq, 2);
        assert_eq!(view.data.unwrap(), newer);
    }

    #[test]
    fn stale_error_does_not_mask_newer_success() {
        let handle: Arc<PollHandle<Vec<JobSummary>>> =
            PollHandle::new(Arc::new(|| async { Ok(Vec::new()) }.boxed()));

        handle.apply(2, Ok(vec![]));
        handle.apply(1, Err(ApiError::decode("late failure")));

        let view = handle.view();
        assert_eq!(view.seq, 2);
        assert_eq!(view.error, None);
    }

    #[test]
    fn responses_after_teardown_are_discarded() {
        let handle: Arc<PollHandle<Vec<JobSummary>>> =
            PollHandle::new(Arc::new(|| async { Ok(Vec::new()) }.boxed()));

        handle.stop();
        handle.apply(1, Ok(vec![]));
        assert_eq!(handle.view().seq, 0);
        assert!(handle.view().data.is_none());
    }

    #[tokio::test]
    async fn cancel_terminal_job_issues_no_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs")
            .with_status(200)
            .with_body(r#"{"jobs": [{"id": 5, "status": "finished"}]}"#)
            .create_async()
            .await;
        let cancel_mock = server
            .mock("POST", "/jobs/5/cancel")
            .expect(0)
            .create_async()
            .await;

        let watch = JobsWatch::with_config(api(&server), PARKED);
        let mut rx = watch.subscribe();
        wait_for(&mut rx, |v| v.data.is_some()).await;

        let outcome = watch.cancel(5).await.unwrap();
        assert_eq!(outcome, CancelOutcome::AlreadyTerminal);
        cancel_mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancel_running_job_acks_and_forces_refresh() {
        let mut server = mockito::Server::new_async().await;
        // Initial fetch + forced post-cancel refresh, nothing in between
        // (the timer is parked).
        let list_mock = server
            .mock("GET", "/jobs")
            .with_status(200)
            .with_body(r#"{"jobs": [{"id": 5, "status": "running"}]}"#)
            .expect(2)
            .create_async()
            .await;
        let cancel_mock = server
            .mock("POST", "/jobs/5/cancel")
            .with_status(200)
            .with_body(r#"{"ok": true, "cancelled": true}"#)
            .create_async()
            .await;

        let watch = JobsWatch::with_config(api(&server), PARKED);
        let mut rx = watch.subscribe();
        wait_for(&mut rx, |v| v.data.is_some()).await;

        let outcome = watch.cancel(5).await.unwrap();
        assert_eq!(outcome, CancelOutcome::Requested);

        wait_for(&mut rx, |v| v.seq >= 2).await;
        cancel_mock.assert_async().await;
        list_mock.assert_async().await;
    }

    #[tokio::test]
    async fn detail_watch_tracks_one_job_and_suppresses_terminal_cancel() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/9")
            .with_status(200)
            .with_body(
                r#"{"job": {"id": 9, "status": "failed", "language": "python",
                            "output": "Traceback (most recent call last): ..."}}"#,
            )
            .create_async()
            .await;
        let cancel_mock = server
            .mock("POST", "/jobs/9/cancel")
            .expect(0)
            .create_async()
            .await;

        let watch = JobWatch::with_config(api(&server), 9, PARKED);
        let mut rx = watch.subscribe();
        let view = wait_for(&mut rx, |v| v.data.is_some()).await;
        assert_eq!(view.data.as_ref().unwrap().status, JobStatus::Failed);

        let outcome = watch.cancel().await.unwrap();
        assert_eq!(outcome, CancelOutcome::AlreadyTerminal);
        cancel_mock.assert_async().await;
    }
}
