use common::normalize::FieldSpec;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{ApiClient, ErrorMessages};

const ANALYSIS_ERRORS: ErrorMessages =
    ErrorMessages::new(&["detail", "message"], "Complexity analysis failed");

const TIME: FieldSpec = FieldSpec::new("time_complexity", &["message.time complexity"]);
const SPACE: FieldSpec = FieldSpec::new("space_complexity", &["message.space complexity"]);

/// Estimated asymptotic cost of a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexityReport {
    pub time_complexity: String,
    pub space_complexity: String,
}

impl ComplexityReport {
    fn from_raw(raw: &Value) -> Option<Self> {
        let time_complexity = TIME.string(raw);
        let space_complexity = SPACE.string(raw);
        if time_complexity.is_none() && space_complexity.is_none() {
            return None;
        }
        Some(Self {
            time_complexity: time_complexity.unwrap_or_else(|| "Unknown".into()),
            space_complexity: space_complexity.unwrap_or_else(|| "Unknown".into()),
        })
    }
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    code: &'a str,
}

/// Best-effort complexity estimates. Never fails the caller.
#[derive(Clone)]
pub struct ComplexityAnalyzer {
    api: ApiClient,
    url: String,
}

impl ComplexityAnalyzer {
    pub fn new(api: ApiClient, url: impl Into<String>) -> Self {
        Self {
            api,
            url: url.into(),
        }
    }

    pub async fn analyze(&self, code: &str) -> Option<ComplexityReport> {
        if code.trim().is_empty() {
            return None;
        }
        let raw = match self
            .api
            .post_json(&self.url, None, &AnalysisRequest { code }, ANALYSIS_ERRORS)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Complexity analysis unavailable");
                return None;
            }
        };
        let report = ComplexityReport::from_raw(&raw);
        if report.is_none() {
            debug!("Complexity analysis response had no estimates");
        }
        report
    }
}
