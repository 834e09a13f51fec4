//! Merging streamed updates into view state.
//!
//! Merges are pure: the only time they record is the `observed_at` the caller
//! passes in. Updates are applied in arrival order; the payloads carry no
//! sequence number, so the latest delivered value of a field always wins.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::leaderboard::{LeaderboardUpdate, LeaderboardView};
use crate::submission::{SubmissionUpdate, SubmissionView};

/// Apply a partial update to a submission view.
///
/// Present fields overwrite, absent fields are kept. `test_results` is
/// replaced as a whole when present. A status change that would move the
/// submission backwards is ignored, and counts are clamped so that
/// `test_cases_passed <= total_test_cases` still holds.
pub fn merge_submission(
    base: &SubmissionView,
    update: &SubmissionUpdate,
    observed_at: Option<DateTime<Utc>>,
) -> SubmissionView {
    let mut merged = base.clone();

    if let Some(status) = update.status {
        if base.status.can_transition_to(status) {
            merged.status = status;
        } else if status != base.status {
            debug!(
                submission_id = %base.id,
                from = %base.status,
                to = %status,
                "Ignoring backward status transition"
            );
        }
    }

    if let Some(message) = &update.message {
        merged.message = Some(message.clone());
    }
    if let Some(results) = &update.test_results {
        merged.test_results = results.clone();
    }
    if let Some(total) = update.total_test_cases {
        merged.total_test_cases = total;
    }
    if let Some(passed) = update.test_cases_passed {
        merged.test_cases_passed = passed;
    }
    merged.test_cases_passed = merged.test_cases_passed.min(merged.total_test_cases);

    if update.runtime_ms.is_some() {
        merged.runtime_ms = update.runtime_ms;
    }
    if update.memory_mb.is_some() {
        merged.memory_mb = update.memory_mb;
    }
    if let Some(error) = &update.error_message {
        merged.error_message = Some(error.clone());
    }
    if observed_at.is_some() {
        merged.observed_at = observed_at;
    }

    merged
}

/// Replace the leaderboard with the full ranked set from `update`.
pub fn merge_leaderboard(
    base: &LeaderboardView,
    update: &LeaderboardUpdate,
    observed_at: DateTime<Utc>,
) -> LeaderboardView {
    LeaderboardView {
        contest_id: base.contest_id.clone(),
        entries: update.entries.clone(),
        last_updated: observed_at,
    }
}
