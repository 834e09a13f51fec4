//! Plain-text rendering of views.

use std::fmt::Write;

use client::complexity::ComplexityReport;
use common::contest::{ContestSnapshot, ContestSummary, ProblemSummary};
use common::{LeaderboardView, SubmissionView, TestCaseStatus};
use serde_json::Value;

fn metric(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v} {unit}"),
        None => "N/A".to_string(),
    }
}

fn io(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn submission(view: &SubmissionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Submission #{} [{}]", view.id, view.status);
    let _ = writeln!(out, "  Problem:   {}", view.problem.title);
    let _ = writeln!(out, "  Language:  {}", view.language);
    let _ = writeln!(out, "  Submitted: {}", view.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(
        out,
        "  Result:    {} ({}/{} passed, accuracy {})",
        view.badge().label(),
        view.test_cases_passed,
        view.total_test_cases,
        view.accuracy_label()
    );
    let _ = writeln!(out, "  Runtime:   {}", metric(view.runtime_ms, "ms"));
    let _ = writeln!(out, "  Memory:    {}", metric(view.memory_mb, "MB"));
    if let Some(message) = &view.message {
        let _ = writeln!(out, "  Progress:  {message}");
    }
    if let Some(error) = &view.error_message {
        let _ = writeln!(out, "  Error:     {error}");
    }

    for case in &view.test_results {
        let mark = match case.status {
            TestCaseStatus::Passed => "PASS",
            TestCaseStatus::Failed => "FAIL",
        };
        let _ = write!(out, "  #{:<3} {mark}", case.index + 1);
        if let Some(runtime) = case.runtime_ms {
            let _ = write!(out, "  {runtime} ms");
        }
        out.push('\n');
        if case.status == TestCaseStatus::Failed {
            let _ = writeln!(out, "        input:    {}", io(&case.input));
            let _ = writeln!(out, "        expected: {}", io(&case.expected_output));
            let _ = writeln!(out, "        actual:   {}", io(&case.actual_output));
            if let Some(error) = &case.error_text {
                let _ = writeln!(out, "        error:    {error}");
            }
        }
    }
    out
}

pub fn contests(contests: &[ContestSummary]) -> String {
    let (ongoing, upcoming): (Vec<_>, Vec<_>) = contests.iter().partition(|c| c.has_problems());
    let mut out = String::new();
    for (heading, group) in [("Ongoing contests", ongoing), ("Upcoming contests", upcoming)] {
        let _ = writeln!(out, "{heading}");
        if group.is_empty() {
            out.push_str("  (none)\n");
        }
        for contest in group {
            let _ = writeln!(
                out,
                "  [{}] {}  {} -> {}  problems: {}",
                contest.contest_id,
                contest.title,
                contest.start_time.as_deref().unwrap_or("?"),
                contest.end_time.as_deref().unwrap_or("?"),
                contest.problem_ids.len()
            );
            if !contest.prizes.is_empty() {
                let _ = writeln!(out, "      prizes: {}", contest.prizes.join(", "));
            }
        }
    }
    out
}

pub fn snapshot(snapshot: &ContestSnapshot) -> String {
    format!(
        "Entered {} (contest {}), {} problems\n",
        snapshot.contest_name,
        snapshot.contest_id,
        snapshot.problems.len()
    )
}

pub fn problems(problems: &[ProblemSummary]) -> String {
    let mut out = String::new();
    for problem in problems {
        let _ = writeln!(
            out,
            "  [{}] {}  ({}, {} s, {} MB)",
            problem.id, problem.title, problem.difficulty, problem.time_limit, problem.memory_limit
        );
        match &problem.error {
            Some(error) => {
                let _ = writeln!(out, "      {} ({error})", problem.description);
            }
            None if !problem.description.is_empty() => {
                let first_line = problem.description.lines().next().unwrap_or_default();
                let _ = writeln!(out, "      {first_line}");
            }
            None => {}
        }
    }
    out
}

pub fn leaderboard(view: &LeaderboardView, current_user: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Leaderboard: {} (updated {})",
        view.contest_id,
        view.last_updated.format("%H:%M:%S")
    );
    if view.is_empty() {
        out.push_str("  No participants yet\n");
        return out;
    }
    if let Some((rank, entry)) = current_user.and_then(|user| view.rank_of(user)) {
        let _ = writeln!(out, "  Your rank: #{rank} with {} points", entry.score);
    }
    for (i, entry) in view.entries.iter().enumerate() {
        let marker = if Some(entry.user_name.as_str()) == current_user {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, " {marker}{:>4}  {:<24} {}", i + 1, entry.user_name, entry.score);
    }
    out
}

pub fn complexity(report: &ComplexityReport) -> String {
    format!(
        "Time complexity:  {}\nSpace complexity: {}\n",
        report.time_complexity, report.space_complexity
    )
}
