// crates/client/src/award.rs
//! XP awards with an offline local-accounting fallback.
//!
//! The server is the only authority on leveling; a successful receipt's
//! `new_level`/`new_xp` pass through untouched. When the award endpoint is
//! unreachable the amount is credited to the injected local stats record
//! instead and the level-transition event is built from local data —
//! availability over correctness, the local path never learns the server's
//! thresholds.

use std::sync::Arc;

use ailab_types::{AwardReceipt, AwardRequest};

use crate::api::ApiClient;
use crate::error::AwardError;
use crate::store::StatsStore;

/// A level-transition event for the presentation layer to celebrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub level: u32,
    pub xp: u64,
}

/// Result of one award submission.
#[derive(Debug, Clone)]
pub enum AwardOutcome {
    /// The server recorded the award. `level_up` is present iff the receipt
    /// said so, carrying the server-supplied values.
    Recorded {
        receipt: AwardReceipt,
        level_up: Option<LevelUp>,
    },
    /// The endpoint was unreachable; the amount was credited locally. The
    /// event reports the locally-known level with the updated local total.
    Deferred { level_up: LevelUp },
}

impl AwardOutcome {
    pub fn level_up(&self) -> Option<&LevelUp> {
        match self {
            AwardOutcome::Recorded { level_up, .. } => level_up.as_ref(),
            AwardOutcome::Deferred { level_up } => Some(level_up),
        }
    }

    /// True when the award only exists in the local record so far.
    pub fn is_deferred(&self) -> bool {
        matches!(self, AwardOutcome::Deferred { .. })
    }
}

pub struct AwardProcessor {
    api: ApiClient,
    user_id: u64,
    store: Arc<dyn StatsStore>,
}

impl AwardProcessor {
    pub fn new(api: ApiClient, user_id: u64, store: Arc<dyn StatsStore>) -> Self {
        Self { api, user_id, store }
    }

    pub async fn award(
        &self,
        xp: u64,
        source: &str,
        source_id: Option<&str>,
    ) -> Result<AwardOutcome, AwardError> {
        self.award_with_key(xp, source, source_id, None).await
    }

    /// Award with an idempotency key so a retried submission cannot credit
    /// twice server-side.
    pub async fn award_with_key(
        &self,
        xp: u64,
        source: &str,
        source_id: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<AwardOutcome, AwardError> {
        let req = AwardRequest {
            user_id: self.user_id,
            xp,
            source: source.to_string(),
            source_id: source_id.map(str::to_string),
            idempotency_key: idempotency_key.map(str::to_string),
        };

        match self.api.award_xp(&req).await {
            Ok(receipt) => {
                self.sync_local(&receipt);
                let level_up = receipt.leveled_up.then(|| LevelUp {
                    level: receipt.new_level.unwrap_or(1),
                    xp: receipt.new_xp.unwrap_or_default(),
                });
                Ok(AwardOutcome::Recorded { receipt, level_up })
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(error = %e, xp, source, "award endpoint unreachable, crediting locally");
                let stats = self.store.update(&mut |s| s.xp += xp)?;
                Ok(AwardOutcome::Deferred {
                    level_up: LevelUp { level: stats.level, xp: stats.xp },
                })
            }
            // Server-reported failures (rate limit, validation, auth) are
            // real answers, not connectivity loss: no local credit.
            Err(e) => Err(e.into()),
        }
    }

    /// Keep the local record aligned with server truth so a later offline
    /// award reports the freshest known level.
    fn sync_local(&self, receipt: &AwardReceipt) {
        let (Some(new_xp), Some(new_level)) = (receipt.new_xp, receipt.new_level) else {
            return;
        };
        if let Err(e) = self.store.update(&mut |s| {
            s.xp = new_xp;
            s.level = new_level;
        }) {
            tracing::warn!(error = %e, "failed to sync local stats from receipt");
        }
    }
}
