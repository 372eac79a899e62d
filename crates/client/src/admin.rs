// crates/client/src/admin.rs
//! Administrative catalog endpoints (badges, award rules).
//!
//! These authenticate with `X-Admin-Token` through the client's admin
//! request path; the bearer credential is never attached.

use serde::Serialize;

use ailab_types::{AwardRule, Badge, BadgesEnvelope, RulesEnvelope};

use crate::api::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
struct CreateBadge<'a> {
    code: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateRule<'a> {
    code: &'a str,
    rule_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a serde_json::Value>,
}

impl ApiClient {
    pub async fn list_badges(&self) -> Result<Vec<Badge>, ApiError> {
        let env: BadgesEnvelope = self.admin_get("/admin/badges").await?;
        Ok(env.badges)
    }

    pub async fn create_badge(
        &self,
        code: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Badge, ApiError> {
        self.admin_post("/admin/badges", &CreateBadge { code, name, description }).await
    }

    pub async fn list_rules(&self) -> Result<Vec<AwardRule>, ApiError> {
        let env: RulesEnvelope = self.admin_get("/admin/rules").await?;
        Ok(env.rules)
    }

    pub async fn create_rule(
        &self,
        code: &str,
        rule_type: &str,
        params: Option<&serde_json::Value>,
    ) -> Result<AwardRule, ApiError> {
        self.admin_post("/admin/rules", &CreateRule { code, rule_type, params }).await
    }
}
