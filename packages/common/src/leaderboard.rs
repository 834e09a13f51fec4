use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::FieldSpec;

const USER_ID: FieldSpec = FieldSpec::new("user_id", &["user_id", "id"]);
const USER_NAME: FieldSpec = FieldSpec::new("user_name", &["user_name", "username", "name"]);
const SCORE: FieldSpec = FieldSpec::new("score", &["score", "points"]);
const ENTRIES: FieldSpec = FieldSpec::new("entries", &["message"]);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user_name: String,
    pub score: f64,
}

impl LeaderboardEntry {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            user_id: USER_ID.string_or(raw, ""),
            user_name: USER_NAME.string_or(raw, "Unknown"),
            score: SCORE.number(raw).unwrap_or(0.0),
        }
    }
}

/// Ranked entries of one contest, in the order the server sent them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardView {
    pub contest_id: String,
    pub entries: Vec<LeaderboardEntry>,
    pub last_updated: DateTime<Utc>,
}

impl LeaderboardView {
    pub fn new(
        contest_id: impl Into<String>,
        entries: Vec<LeaderboardEntry>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            contest_id: contest_id.into(),
            entries,
            last_updated: observed_at,
        }
    }

    /// 1-based rank and entry of `user_name`, by position in the server order.
    pub fn rank_of(&self, user_name: &str) -> Option<(usize, &LeaderboardEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.user_name == user_name)
            .map(|(index, entry)| (index + 1, entry))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Full ranked set pushed by the server: `{"message": [...]}`.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardUpdate {
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardUpdate {
    /// `None` unless the payload carries an array under `message`.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        ENTRIES.array(raw).map(|items| Self {
            entries: items.iter().map(LeaderboardEntry::from_raw).collect(),
        })
    }
}

impl<'de> Deserialize<'de> for LeaderboardUpdate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Self::from_raw(&raw)
            .ok_or_else(|| serde::de::Error::custom("leaderboard payload has no 'message' array"))
    }
}
