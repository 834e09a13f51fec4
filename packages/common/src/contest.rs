use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{FieldSpec, as_string};

const CONTEST_ID: FieldSpec = FieldSpec::new("contest_id", &["contest_id", "id"]);
const TITLE: FieldSpec = FieldSpec::new("title", &["template_id", "contestName", "title"]);
const START_TIME: FieldSpec = FieldSpec::new("start_time", &["start_datetime", "startTime"]);
const END_TIME: FieldSpec = FieldSpec::new("end_time", &["end_datetime", "endTime"]);
const PROBLEM_IDS: FieldSpec = FieldSpec::new("problem_ids", &["problems_id", "problems"]);
const PRIZES: FieldSpec = FieldSpec::new("prizes", &["prize", "prizes"]);

/// A contest as listed by the contest service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContestSummary {
    pub contest_id: String,
    /// Template id; doubles as the contest title for registration and the
    /// leaderboard.
    pub title: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub problem_ids: Vec<String>,
    pub prizes: Vec<String>,
}

impl ContestSummary {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            contest_id: CONTEST_ID.string_or(raw, ""),
            title: TITLE.string_or(raw, ""),
            start_time: START_TIME.string(raw),
            end_time: END_TIME.string(raw),
            problem_ids: PROBLEM_IDS
                .array(raw)
                .map(|ids| ids.iter().filter_map(as_string).collect())
                .unwrap_or_default(),
            prizes: parse_prizes(raw),
        }
    }

    /// Problems are published when the contest starts.
    pub fn has_problems(&self) -> bool {
        !self.problem_ids.is_empty()
    }
}

/// Prizes arrive either as an array or as a JSON-encoded array string.
/// Anything unparseable yields no prizes.
pub fn parse_prizes(raw: &Value) -> Vec<String> {
    PRIZES
        .resolve(raw, |value| match value {
            Value::Array(items) => Some(items.iter().filter_map(as_string).collect()),
            Value::String(encoded) => serde_json::from_str::<Vec<Value>>(encoded)
                .ok()
                .map(|items| items.iter().filter_map(as_string).collect()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Contest details handed from the listing to the contest page through the
/// local store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContestSnapshot {
    pub contest_id: String,
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub problems: Vec<String>,
    pub prize: Vec<String>,
}

impl ContestSnapshot {
    /// Normalize a stored snapshot, accepting both the snapshot's own keys and
    /// the listing's keys.
    pub fn from_raw(raw: &Value) -> Self {
        let summary = ContestSummary::from_raw(raw);
        Self {
            contest_name: if summary.title.is_empty() {
                summary.contest_id.clone()
            } else {
                summary.title
            },
            contest_id: summary.contest_id,
            start_time: summary.start_time,
            end_time: summary.end_time,
            problems: summary.problem_ids,
            prize: summary.prizes,
        }
    }
}

impl From<&ContestSummary> for ContestSnapshot {
    fn from(contest: &ContestSummary) -> Self {
        Self {
            contest_id: contest.contest_id.clone(),
            contest_name: contest.title.clone(),
            start_time: contest.start_time.clone(),
            end_time: contest.end_time.clone(),
            problems: contest.problem_ids.clone(),
            prize: contest.prizes.clone(),
        }
    }
}

pub const PLACEHOLDER_DESCRIPTION: &str =
    "Problem details not available. Please try again later.";

/// A problem listed on the contest page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub time_limit: f64,
    pub memory_limit: f64,
    /// Set when details could not be fetched and this is a placeholder.
    pub error: Option<String>,
}

const PROBLEM_TITLE: FieldSpec = FieldSpec::new("title", &["title", "name"]);
const DESCRIPTION: FieldSpec = FieldSpec::new("description", &["description", "statement"]);
const DIFFICULTY: FieldSpec = FieldSpec::new("difficulty", &["difficulty"]);
const TIME_LIMIT: FieldSpec = FieldSpec::new("time_limit", &["time_limit"]);
const MEMORY_LIMIT: FieldSpec = FieldSpec::new("memory_limit", &["memory_limit"]);

impl ProblemSummary {
    /// The id is the one requested, whatever the record says.
    pub fn from_raw(id: &str, raw: &Value) -> Self {
        Self {
            id: id.to_string(),
            title: PROBLEM_TITLE.string_or(raw, &format!("Problem {id}")),
            description: DESCRIPTION.string_or(raw, ""),
            difficulty: DIFFICULTY.string_or(raw, "Unknown"),
            time_limit: TIME_LIMIT.number(raw).unwrap_or(0.0),
            memory_limit: MEMORY_LIMIT.number(raw).unwrap_or(0.0),
            error: None,
        }
    }

    pub fn placeholder(id: &str, error: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Problem {id}"),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            difficulty: "Unknown".to_string(),
            time_limit: 0.0,
            memory_limit: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}
