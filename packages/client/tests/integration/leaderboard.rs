use client::fetcher::LeaderboardSource;
use client::{ClientError, TrackerEvent};
use serde_json::json;

use crate::common::{Reply, Script, TestApp};

fn standings() -> serde_json::Value {
    json!({
        "message": [
            {"user_id": 1, "user_name": "ada", "score": 300},
            {"user_id": 2, "user_name": "bob", "score": 200},
            {"user_id": 3, "username": "cyd", "points": 100}
        ]
    })
}

#[tokio::test]
async fn fetches_snapshot_by_contest_title() {
    let app = TestApp::spawn().await;
    app.backend.leaderboard(Reply::ok(standings()));

    let view = app.state.fetcher.fetch_leaderboard("Weekly 3").await.unwrap();

    assert_eq!(view.contest_id, "Weekly 3");
    assert_eq!(view.entries.len(), 3);
    assert_eq!(view.entries[2].user_name, "cyd");
    assert_eq!(view.entries[2].score, 100.0);
    assert_eq!(view.rank_of("bob").map(|(rank, _)| rank), Some(2));
    assert_eq!(app.backend.requests_to("leaderboard?Weekly 3").len(), 1);
}

#[tokio::test]
async fn payload_without_entries_is_empty_response() {
    let app = TestApp::spawn().await;
    app.backend
        .leaderboard(Reply::ok(json!({"message": "Contest not started"})));

    let err = app
        .state
        .fetcher
        .fetch_leaderboard("Weekly 3")
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::EmptyResponse);
}

#[tokio::test]
async fn stream_replaces_standings() {
    let app = TestApp::spawn().await;
    app.backend.leaderboard(Reply::ok(standings()));
    app.backend.stream(
        "leaderboard/Weekly_3",
        Script::frames(&[
            json!({"message": "not a list"}),
            json!({"message": [
                {"user_id": 2, "user_name": "bob", "score": 400},
                {"user_id": 1, "user_name": "ada", "score": 300}
            ]}),
        ]),
    );

    let mut tracker = app.state.leaderboard_tracker();
    tracker.load("Weekly 3").await.unwrap();
    assert_eq!(tracker.rank_of("bob").map(|(rank, _)| rank), Some(2));

    match tracker.next_event().await {
        Some(TrackerEvent::Updated(view)) => {
            assert_eq!(view.entries.len(), 2);
            assert_eq!(view.contest_id, "Weekly 3");
        }
        other => panic!("expected update, got {other:?}"),
    }
    let (rank, entry) = tracker.rank_of("bob").unwrap();
    assert_eq!(rank, 1);
    assert_eq!(entry.score, 400.0);
    assert_eq!(tracker.rank_of("cyd"), None);
    assert_eq!(
        app.backend.connections.lock().unwrap().as_slice(),
        ["leaderboard/Weekly_3"]
    );

    tracker.close();
}
