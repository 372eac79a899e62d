// crates/types/src/admin.rs
//! Admin catalog items (badges and award rules).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: u64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRule {
    pub id: u64,
    pub code: String,
    pub rule_type: String,
    /// Rule-type-specific parameters, opaque to the client.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BadgesEnvelope {
    #[serde(default)]
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesEnvelope {
    #[serde(default)]
    pub rules: Vec<AwardRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badges_envelope_decodes() {
        let env: BadgesEnvelope = serde_json::from_str(
            r#"{"badges": [{"id": 1, "code": "first_job", "name": "First Job"}]}"#,
        )
        .unwrap();
        assert_eq!(env.badges.len(), 1);
        assert_eq!(env.badges[0].code, "first_job");
        assert_eq!(env.badges[0].description, None);
    }

    #[test]
    fn rule_params_stay_opaque() {
        let env: RulesEnvelope = serde_json::from_str(
            r#"{"rules": [{"id": 2, "code": "streak", "rule_type": "threshold",
                           "params": {"days": 7}}]}"#,
        )
        .unwrap();
        assert_eq!(env.rules[0].params.as_ref().unwrap()["days"], 7);
    }
}
