use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{SubmissionStatus, TestCaseStatus};

/// Accepted source keys for each logical submission field.
pub mod fields {
    use crate::normalize::FieldSpec;

    pub const ID: FieldSpec = FieldSpec::new("id", &["id", "submission_id"]);
    pub const STATUS: FieldSpec = FieldSpec::new("status", &["status"]);
    pub const LANGUAGE: FieldSpec =
        FieldSpec::new("language", &["programming_language", "language"]);
    pub const SOURCE_CODE: FieldSpec = FieldSpec::new("source_code", &["source_code", "code"]);
    pub const RUNTIME_MS: FieldSpec =
        FieldSpec::new("runtime_ms", &["execution_time", "runtime", "runtime_ms"]);
    pub const MEMORY_MB: FieldSpec =
        FieldSpec::new("memory_mb", &["memory_used", "memory", "memory_mb"]);
    pub const TEST_CASES_PASSED: FieldSpec = FieldSpec::new(
        "test_cases_passed",
        &["passed_test_cases", "test_cases_passed"],
    );
    pub const TOTAL_TEST_CASES: FieldSpec =
        FieldSpec::new("total_test_cases", &["total_test_cases"]);
    pub const TEST_RESULTS: FieldSpec =
        FieldSpec::new("test_results", &["test_results", "submission_tests"]);
    pub const PROBLEM_ID: FieldSpec = FieldSpec::new("problem.id", &["problem_id", "problem.id"]);
    pub const PROBLEM_TITLE: FieldSpec =
        FieldSpec::new("problem.title", &["problem_title", "problem.title"]);
    pub const CREATED_AT: FieldSpec =
        FieldSpec::new("created_at", &["submitted_at", "created_at"]);
    pub const ERROR_MESSAGE: FieldSpec =
        FieldSpec::new("error_message", &["error_message", "error"]);
    pub const MESSAGE: FieldSpec = FieldSpec::new("message", &["message"]);
    pub const STREAM_URL: FieldSpec =
        FieldSpec::new("stream_url", &["ws_url", "websocket_url", "stream_url"]);

    pub mod test_case {
        use crate::normalize::FieldSpec;

        pub const STATUS: FieldSpec = FieldSpec::new("status", &["status"]);
        pub const PASSED: FieldSpec = FieldSpec::new("passed", &["passed"]);
        pub const INPUT: FieldSpec = FieldSpec::new("input", &["input"]);
        pub const EXPECTED_OUTPUT: FieldSpec = FieldSpec::new(
            "expected_output",
            &["expected_output", "expected", "actual"],
        );
        pub const ACTUAL_OUTPUT: FieldSpec =
            FieldSpec::new("actual_output", &["actual_output", "output"]);
        pub const STDOUT: FieldSpec = FieldSpec::new("stdout", &["stdout"]);
        pub const ERROR_TEXT: FieldSpec =
            FieldSpec::new("error_text", &["error_text", "error", "stderr"]);
        pub const RUNTIME_MS: FieldSpec =
            FieldSpec::new("runtime_ms", &["runtime_ms", "execution_time", "runtime"]);
    }
}

pub const UNKNOWN_LANGUAGE: &str = "Unknown";
pub const UNKNOWN_PROBLEM: &str = "Unknown Problem";

/// Reference to the problem a submission was made for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemRef {
    pub id: Option<String>,
    pub title: String,
}

/// Result of one test case, in the order the server reported them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub index: usize,
    pub status: TestCaseStatus,
    pub input: Value,
    pub expected_output: Value,
    pub actual_output: Value,
    pub stdout: Option<String>,
    pub error_text: Option<String>,
    pub runtime_ms: Option<f64>,
}

impl TestCaseResult {
    /// Normalize one raw test-case record found at `index`.
    ///
    /// Status comes from a `status` string (`passed` counts as passing) or a
    /// boolean `passed`; anything else is a failure.
    pub fn from_raw(index: usize, raw: &Value) -> Self {
        use fields::test_case as f;

        let passed = f::STATUS
            .resolve(raw, |v| v.as_str().map(|s| s.trim().eq_ignore_ascii_case("passed")))
            .or_else(|| f::PASSED.boolean(raw))
            .unwrap_or(false);

        Self {
            index,
            status: if passed {
                TestCaseStatus::Passed
            } else {
                TestCaseStatus::Failed
            },
            input: f::INPUT.raw(raw).cloned().unwrap_or(Value::Null),
            expected_output: f::EXPECTED_OUTPUT.raw(raw).cloned().unwrap_or(Value::Null),
            actual_output: f::ACTUAL_OUTPUT.raw(raw).cloned().unwrap_or(Value::Null),
            stdout: f::STDOUT.string(raw),
            error_text: f::ERROR_TEXT.string(raw),
            runtime_ms: f::RUNTIME_MS.number(raw),
        }
    }
}

/// Canonical, fully populated view of a submission.
///
/// Built once at the boundary by [`SubmissionView::normalize`]; serialized
/// field names are accepted keys of the fallback table, so normalizing the
/// serialized form again yields the same view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionView {
    pub id: String,
    pub status: SubmissionStatus,
    pub language: String,
    pub source_code: String,
    pub runtime_ms: Option<f64>,
    pub memory_mb: Option<f64>,
    pub test_cases_passed: u32,
    pub total_test_cases: u32,
    pub test_results: Vec<TestCaseResult>,
    pub problem: ProblemRef,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
    /// Latest free-text progress message pushed by the stream.
    pub message: Option<String>,
    /// Streaming endpoint supplied by the server for in-progress submissions.
    pub stream_url: Option<String>,
    /// When the last merged update was observed, if the caller recorded it.
    pub observed_at: Option<DateTime<Utc>>,
}

impl SubmissionView {
    /// Normalize a raw submission record.
    ///
    /// `requested_id` is the id used for the fetch and is the default when the
    /// record carries none; `now` is the default creation time.
    pub fn normalize(requested_id: &str, raw: &Value, now: DateTime<Utc>) -> Self {
        use fields as f;

        let test_results: Vec<TestCaseResult> = f::TEST_RESULTS
            .array(raw)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| TestCaseResult::from_raw(index, item))
                    .collect()
            })
            .unwrap_or_default();

        let total_test_cases = f::TOTAL_TEST_CASES.count(raw).unwrap_or(0);
        let test_cases_passed = f::TEST_CASES_PASSED
            .count(raw)
            .unwrap_or(0)
            .min(total_test_cases);

        Self {
            id: f::ID.string_or(raw, requested_id),
            status: f::STATUS
                .resolve(raw, |v| v.as_str().map(SubmissionStatus::parse_lenient))
                .unwrap_or_default(),
            language: f::LANGUAGE.string_or(raw, UNKNOWN_LANGUAGE),
            source_code: f::SOURCE_CODE.string_or(raw, ""),
            runtime_ms: f::RUNTIME_MS.number(raw),
            memory_mb: f::MEMORY_MB.number(raw),
            test_cases_passed,
            total_test_cases,
            test_results,
            problem: ProblemRef {
                id: f::PROBLEM_ID.string(raw),
                title: f::PROBLEM_TITLE.string_or(raw, UNKNOWN_PROBLEM),
            },
            created_at: f::CREATED_AT.timestamp(raw).unwrap_or(now),
            error_message: f::ERROR_MESSAGE.string(raw),
            message: f::MESSAGE.string(raw),
            stream_url: f::STREAM_URL.string(raw),
            observed_at: None,
        }
    }

    /// Fraction of passed test cases in percent, `None` when there are none.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_test_cases == 0 {
            return None;
        }
        Some(f64::from(self.test_cases_passed) / f64::from(self.total_test_cases) * 100.0)
    }

    /// Accuracy formatted with one decimal (`"66.7%"`), or `"N/A"`.
    pub fn accuracy_label(&self) -> String {
        match self.accuracy() {
            Some(pct) => format!("{pct:.1}%"),
            None => "N/A".to_string(),
        }
    }

    pub fn badge(&self) -> ResultBadge {
        match self.accuracy() {
            None => ResultBadge::NotAvailable,
            Some(pct) if pct >= 100.0 => ResultBadge::AllPassed,
            Some(pct) if pct > 0.0 => ResultBadge::PartiallyPassed,
            Some(_) => ResultBadge::AllFailed,
        }
    }
}

/// Pass/fail summary shown next to a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultBadge {
    AllPassed,
    PartiallyPassed,
    AllFailed,
    NotAvailable,
}

impl ResultBadge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AllPassed => "All Tests Passed",
            Self::PartiallyPassed => "Partially Passed",
            Self::AllFailed => "All Tests Failed",
            Self::NotAvailable => "No Test Results",
        }
    }
}

/// Partial update pushed over a submission stream.
///
/// Only `status` is required by the wire format; every other field is applied
/// only when present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmissionUpdate {
    pub status: Option<SubmissionStatus>,
    pub message: Option<String>,
    pub test_results: Option<Vec<TestCaseResult>>,
    pub test_cases_passed: Option<u32>,
    pub total_test_cases: Option<u32>,
    pub runtime_ms: Option<f64>,
    pub memory_mb: Option<f64>,
    pub error_message: Option<String>,
}

impl SubmissionUpdate {
    /// Build an update from a decoded stream payload, using the same fallback
    /// table as the initial fetch.
    pub fn from_raw(raw: &Value) -> Self {
        use fields as f;

        Self {
            status: f::STATUS.resolve(raw, |v| v.as_str().map(SubmissionStatus::parse_lenient)),
            message: f::MESSAGE.string(raw),
            test_results: f::TEST_RESULTS.array(raw).map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| TestCaseResult::from_raw(index, item))
                    .collect()
            }),
            test_cases_passed: f::TEST_CASES_PASSED.count(raw),
            total_test_cases: f::TOTAL_TEST_CASES.count(raw),
            runtime_ms: f::RUNTIME_MS.number(raw),
            memory_mb: f::MEMORY_MB.number(raw),
            error_message: f::ERROR_MESSAGE.string(raw),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_final())
    }
}

impl From<&SubmissionView> for SubmissionUpdate {
    /// A full snapshot (e.g. from polling) expressed as an update.
    fn from(view: &SubmissionView) -> Self {
        Self {
            status: Some(view.status),
            message: view.message.clone(),
            test_results: Some(view.test_results.clone()),
            test_cases_passed: Some(view.test_cases_passed),
            total_test_cases: Some(view.total_test_cases),
            runtime_ms: view.runtime_ms,
            memory_mb: view.memory_mb,
            error_message: view.error_message.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for SubmissionUpdate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        if !raw.is_object() {
            return Err(serde::de::Error::custom("update payload must be a JSON object"));
        }
        if fields::STATUS.raw(&raw).is_none() {
            return Err(serde::de::Error::missing_field("status"));
        }
        Ok(Self::from_raw(&raw))
    }
}
