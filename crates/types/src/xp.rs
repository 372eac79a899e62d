// crates/types/src/xp.rs
//! XP award requests, receipts, and the local fallback stats record.

use serde::{Deserialize, Serialize};

/// Body for `POST /xp/award`.
#[derive(Debug, Clone, Serialize)]
pub struct AwardRequest {
    pub user_id: u64,
    pub xp: u64,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Server deduplicates repeated awards carrying the same key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// `POST /xp/award` response.
///
/// `leveled_up`, `new_level`, and `new_xp` are authoritative server values;
/// consumers must not recompute them locally.
#[derive(Debug, Clone, Deserialize)]
pub struct AwardReceipt {
    pub ok: bool,
    #[serde(default)]
    pub leveled_up: bool,
    #[serde(default)]
    pub new_level: Option<u32>,
    #[serde(default)]
    pub new_xp: Option<u64>,
    #[serde(default)]
    pub next_level_threshold: Option<u64>,
    /// Set when an idempotency key or source pair matched an earlier award.
    #[serde(default)]
    pub duplicate: bool,
}

/// Locally persisted stats used when the award endpoint is unreachable.
///
/// The local record tracks totals only; it has no knowledge of the server's
/// leveling thresholds, so `level` advances only when a server receipt says
/// so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalStats {
    #[serde(default)]
    pub xp: u64,
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    1
}

impl Default for LocalStats {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}
