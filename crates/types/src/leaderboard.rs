// crates/types/src/leaderboard.rs
//! Leaderboard rows and snapshots.

use serde::{Deserialize, Serialize};

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based, unique within a snapshot.
    pub rank: u32,
    pub user_id: u64,
    pub display_name: String,
    pub xp: u64,
    pub level: u32,
}

/// A complete, self-consistent ranked listing. Always replaces any prior
/// listing wholesale; rows are never merged across snapshots.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LeaderboardSnapshot {
    #[serde(default)]
    pub rows: Vec<LeaderboardRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_decodes_rows_in_order() {
        let body = r#"{"ok": true, "rows": [
            {"rank": 1, "user_id": 7, "display_name": "ada", "xp": 500, "level": 3},
            {"rank": 2, "user_id": 4, "display_name": "grace", "xp": 320, "level": 2}
        ]}"#;
        let snap: LeaderboardSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snap.rows.len(), 2);
        assert_eq!(snap.rows[0].rank, 1);
        assert_eq!(snap.rows[0].user_id, 7);
        assert_eq!(snap.rows[1].display_name, "grace");
    }

    #[test]
    fn snapshot_without_rows_is_empty() {
        let snap: LeaderboardSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snap.rows.is_empty());
    }
}
