use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a submission as seen by the client.
///
/// Backends report status with inconsistent spelling and casing, so parsing is
/// lenient (see [`SubmissionStatus::from_str`]). The canonical serialized form
/// is SCREAMING_CASE and parses back to the same value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Queued, not yet picked up by a judge.
    Pending,
    /// Being compiled or run.
    Processing,
    /// Judging finished.
    Completed,
    /// Judging aborted (compile error, system error, ...).
    Failed,
    /// Missing or unrecognized status.
    #[default]
    Unknown,
}

impl SubmissionStatus {
    /// Returns true if judging is over and no further updates are expected.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true while the judge is still working on the submission.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Status only moves forward: a final status never changes, `Unknown`
    /// never overwrites a known status, and `Processing` never goes back to
    /// `Pending`.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        if self.is_final() || next == Self::Unknown {
            return false;
        }
        match self {
            Self::Unknown => true,
            Self::Pending => true,
            Self::Processing => next != Self::Pending,
            Self::Completed | Self::Failed => false,
        }
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Unknown,
    ];

    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pending" | "queued" | "waiting" => Ok(Self::Pending),
            "processing" | "running" | "compiling" | "judging" | "in_progress" => {
                Ok(Self::Processing)
            }
            "completed" | "complete" | "accepted" | "success" | "done" | "finished" => {
                Ok(Self::Completed)
            }
            "failed" | "failure" | "error" | "compilation_error" | "system_error" => {
                Ok(Self::Failed)
            }
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}

impl SubmissionStatus {
    /// Parse leniently, mapping anything unrecognized to `Unknown`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

/// Outcome of a single test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCaseStatus {
    Passed,
    Failed,
}

impl TestCaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for TestCaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
