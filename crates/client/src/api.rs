// crates/client/src/api.rs
//! Thin request/response wrapper around the platform HTTP API.
//!
//! Attaches credentials, decodes typed JSON envelopes, and converts every
//! failure mode into [`ApiError`] — nothing escapes this boundary as a raw
//! `reqwest` panic or an untyped body. Callers branch on the result.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use ailab_types::{
    AwardReceipt, AwardRequest, CancelAck, Job, JobEnvelope, JobSummary, JobsEnvelope,
    LeaderboardSnapshot, SubmitAck, SubmitRequest,
};

use crate::auth::TokenSource;
use crate::error::ApiError;

/// Server-supplied error body, e.g. `{"ok": false, "error": "not authorized"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the AI Lab API.
///
/// Cheap to clone; clones share the underlying connection pool and token
/// source.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    /// Create a client rooted at `base_url` (e.g. `http://127.0.0.1:8000/api/v1`).
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer credential, read fresh for this request.
    fn with_bearer(&self, req: RequestBuilder) -> RequestBuilder {
        match self.tokens.bearer() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Attach the admin token. Administrative calls never carry the bearer
    /// header; the two credential kinds stay in separate fields.
    fn with_admin(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.tokens.admin_token() {
            Some(token) => Ok(req.header("X-Admin-Token", token)),
            None => Err(ApiError::AdminTokenMissing),
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    }
                });
            return Err(ApiError::Status { status: status.as_u16(), message });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(e.to_string()))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.with_bearer(self.http.get(self.url(path))).send().await?;
        Self::decode(resp).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, ApiError> {
        let resp = self
            .with_bearer(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// POST with an empty body (control requests like cancel).
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .with_bearer(self.http.post(self.url(path)))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub(crate) async fn admin_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let req = self.with_admin(self.http.get(self.url(path)))?;
        Self::decode(req.send().await?).await
    }

    pub(crate) async fn admin_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, ApiError> {
        let req = self.with_admin(self.http.post(self.url(path)))?;
        Self::decode(req.json(body).send().await?).await
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>, ApiError> {
        let env: JobsEnvelope = self.get_json("/jobs").await?;
        Ok(env.jobs)
    }

    pub async fn get_job(&self, job_id: u64) -> Result<Job, ApiError> {
        let env: JobEnvelope = self.get_json(&format!("/jobs/{job_id}")).await?;
        Ok(env.job)
    }

    pub async fn submit_job(
        &self,
        language: &str,
        payload: serde_json::Value,
    ) -> Result<SubmitAck, ApiError> {
        let body = SubmitRequest { language: language.to_string(), payload };
        self.post_json("/jobs", &body).await
    }

    pub async fn cancel_job(&self, job_id: u64) -> Result<CancelAck, ApiError> {
        self.post_empty(&format!("/jobs/{job_id}/cancel")).await
    }

    // ── Leaderboard ─────────────────────────────────────────────────────

    pub async fn leaderboard(&self) -> Result<LeaderboardSnapshot, ApiError> {
        self.get_json("/leaderboard").await
    }

    /// Open the persistent leaderboard stream. Returns the raw response so
    /// the caller can consume the event-stream body incrementally.
    pub async fn open_leaderboard_stream(&self) -> Result<Response, ApiError> {
        let resp = self
            .with_bearer(self.http.get(self.url("/leaderboard/stream")))
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: if body.is_empty() { status.to_string() } else { body },
            });
        }
        Ok(resp)
    }

    // ── XP ──────────────────────────────────────────────────────────────

    pub async fn award_xp(&self, req: &AwardRequest) -> Result<AwardReceipt, ApiError> {
        self.post_json("/xp/award", req).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base_url", &self.base_url).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokens;
    use ailab_types::JobStatus;
    use pretty_assertions::assert_eq;

    fn client(server: &mockito::ServerGuard, tokens: StaticTokens) -> ApiClient {
        ApiClient::new(server.url(), Arc::new(tokens))
    }

    #[tokio::test]
    async fn attaches_bearer_header_when_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs")
            .match_header("authorization", "Bearer user-token")
            .with_status(200)
            .with_body(r#"{"ok": true, "jobs": []}"#)
            .create_async()
            .await;

        let api = client(&server, StaticTokens::bearer("user-token"));
        let jobs = api.list_jobs().await.unwrap();
        assert!(jobs.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"jobs": [{"id": 1, "status": "running"}]}"#)
            .create_async()
            .await;

        let api = client(&server, StaticTokens::default());
        let jobs = api.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Running);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn admin_calls_use_distinct_header_not_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/admin/badges")
            .match_header("x-admin-token", "sekrit")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"badges": []}"#)
            .create_async()
            .await;

        // Both tokens configured; admin path must pick only the admin one.
        let tokens = StaticTokens {
            bearer: Some("user-token".into()),
            admin: Some("sekrit".into()),
        };
        let api = client(&server, tokens);
        let badges = api.list_badges().await.unwrap();
        assert!(badges.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn admin_call_without_token_fails_before_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/admin/badges").expect(0).create_async().await;

        let api = client(&server, StaticTokens::bearer("user-token"));
        let err = api.list_badges().await.unwrap_err();
        assert!(matches!(err, ApiError::AdminTokenMissing));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_surfaces_server_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/7")
            .with_status(403)
            .with_body(r#"{"ok": false, "error": "not authorized"}"#)
            .create_async()
            .await;

        let api = client(&server, StaticTokens::default());
        let err = api.get_job(7).await.unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "not authorized");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_with_opaque_body_falls_back_to_raw_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/leaderboard")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let api = client(&server, StaticTokens::default());
        let err = api.leaderboard().await.unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/3")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let api = client(&server, StaticTokens::default());
        let err = api.get_job(3).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn submit_posts_language_and_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/jobs")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "language": "python",
                "payload": {"command": "print(1+1)"}
            })))
            .with_status(201)
            .with_body(r#"{"ok": true, "job_id": 42, "status": "queued"}"#)
            .create_async()
            .await;

        let api = client(&server, StaticTokens::default());
        let ack = api
            .submit_job("python", serde_json::json!({"command": "print(1+1)"}))
            .await
            .unwrap();
        assert!(ack.ok);
        assert_eq!(ack.job_id, Some(42));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn award_round_trips_receipt() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/xp/award")
            .with_status(200)
            .with_body(r#"{"ok": true, "leveled_up": true, "new_level": 4, "new_xp": 2550}"#)
            .create_async()
            .await;

        let api = client(&server, StaticTokens::default());
        let receipt = api
            .award_xp(&AwardRequest {
                user_id: 1,
                xp: 100,
                source: "lab".into(),
                source_id: None,
                idempotency_key: None,
            })
            .await
            .unwrap();
        assert!(receipt.leveled_up);
        assert_eq!(receipt.new_level, Some(4));
        assert_eq!(receipt.new_xp, Some(2550));
    }
}
