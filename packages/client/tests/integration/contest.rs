use ::common::contest::{ContestSnapshot, PLACEHOLDER_DESCRIPTION};
use client::{ClientError, LocalStore, Session};
use serde_json::json;

use crate::common::{Reply, TestApp};

fn session() -> Session {
    Session::new("secret-token").with_user(7, "ada")
}

fn snapshot(problems: &[&str]) -> ContestSnapshot {
    ContestSnapshot {
        contest_id: "3".into(),
        contest_name: "weekly-3".into(),
        start_time: None,
        end_time: None,
        problems: problems.iter().map(|p| p.to_string()).collect(),
        prize: Vec::new(),
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn lists_contests_with_both_prize_encodings() {
        let app = TestApp::spawn().await;
        app.backend.contests(Reply::ok(json!({
            "contests": [
                {
                    "contest_id": 1,
                    "template_id": "weekly-1",
                    "start_datetime": "2024-03-01T10:00:00Z",
                    "end_datetime": "2024-03-01T12:00:00Z",
                    "problems_id": [4, 5],
                    "prize": ["Gold", "Silver"]
                },
                {
                    "contest_id": 2,
                    "template_id": "weekly-2",
                    "prizes": "[\"T-shirt\"]"
                }
            ]
        })));

        let contests = app.state.contests.list_contests().await.unwrap();

        assert_eq!(contests.len(), 2);
        assert_eq!(contests[0].title, "weekly-1");
        assert_eq!(contests[0].problem_ids, ["4", "5"]);
        assert_eq!(contests[0].prizes, ["Gold", "Silver"]);
        assert!(contests[0].has_problems());
        assert_eq!(contests[1].prizes, ["T-shirt"]);
        assert!(!contests[1].has_problems());
    }

    #[tokio::test]
    async fn missing_contest_array_is_empty_listing() {
        let app = TestApp::spawn().await;
        app.backend.contests(Reply::ok(json!({"detail": "nothing scheduled"})));

        let contests = app.state.contests.list_contests().await.unwrap();
        assert!(contests.is_empty());
    }
}

mod registration {
    use super::*;

    fn contest() -> ::common::contest::ContestSummary {
        ::common::contest::ContestSummary::from_raw(&json!({
            "contest_id": 3,
            "template_id": "weekly-3",
            "start_datetime": "2024-03-08T10:00:00Z",
            "end_datetime": "2024-03-08T12:00:00Z",
            "problems_id": ["10", "11"],
            "prize": ["Gold"]
        }))
    }

    #[tokio::test]
    async fn registers_and_stores_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("store.json"));
        let app = TestApp::spawn_with_store(Some(store.clone())).await;
        app.backend
            .registration(Reply::ok(json!({"message": "Registered"})));

        let snapshot = app
            .state
            .contests
            .register(&session(), &contest())
            .await
            .unwrap();

        assert_eq!(snapshot.contest_name, "weekly-3");
        assert_eq!(snapshot.problems, ["10", "11"]);

        let requests = app.backend.requests_to("register");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1.as_deref(), Some("secret-token"));
        assert_eq!(
            requests[0].2,
            json!({"user_id": 7, "contest_title": "weekly-3"})
        );

        let stored = store.current_contest().await.unwrap();
        assert_eq!(stored, Some(snapshot));
    }

    #[tokio::test]
    async fn requires_user_id() {
        let app = TestApp::spawn().await;

        let err = app
            .state
            .contests
            .register(&Session::new("secret-token"), &contest())
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::AuthRequired);
        assert!(app.backend.requests_to("register").is_empty());
    }

    #[tokio::test]
    async fn contest_without_problems_is_rejected() {
        let app = TestApp::spawn().await;
        let mut contest = contest();
        contest.problem_ids.clear();

        let err = app
            .state
            .contests
            .register(&session(), &contest)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Validation("Contest problems are not available yet".into())
        );
    }

    #[tokio::test]
    async fn rejection_prefers_message_over_detail() {
        let app = TestApp::spawn().await;
        app.backend.registration(Reply::json(
            400,
            json!({"message": "Already registered", "detail": "duplicate"}),
        ));

        let err = app
            .state
            .contests
            .register(&session(), &contest())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Already registered");
    }
}

mod problems {
    use super::*;

    fn problem(id: &str) -> Reply {
        Reply::ok(json!({
            "title": format!("Problem title {id}"),
            "description": "Add two numbers.",
            "difficulty": "Easy",
            "time_limit": 1.5,
            "memory_limit": 256
        }))
    }

    #[tokio::test]
    async fn one_failure_becomes_a_placeholder() {
        let app = TestApp::spawn().await;
        for id in ["1", "2", "4", "5"] {
            app.backend.problem(id, problem(id));
        }
        app.backend.problem(
            "3",
            Reply::json(500, json!({"message": "Problem store unavailable"})),
        );

        let problems = app
            .state
            .contests
            .load_problems(&session(), &snapshot(&["1", "2", "3", "4", "5"]))
            .await
            .unwrap();

        assert_eq!(problems.len(), 5);
        let ids: Vec<_> = problems.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);

        let failed = &problems[2];
        assert!(failed.is_placeholder());
        assert_eq!(failed.title, "Problem 3");
        assert_eq!(failed.description, PLACEHOLDER_DESCRIPTION);
        assert_eq!(failed.difficulty, "Unknown");
        assert_eq!(failed.error.as_deref(), Some("Problem store unavailable"));

        for loaded in problems.iter().filter(|p| p.id != "3") {
            assert!(!loaded.is_placeholder());
            assert_eq!(loaded.difficulty, "Easy");
            assert_eq!(loaded.time_limit, 1.5);
        }
        assert_eq!(app.backend.requests_to("problem/").len(), 5);
    }

    #[tokio::test]
    async fn unauthorized_item_fails_the_load() {
        let app = TestApp::spawn().await;
        app.backend.problem("1", problem("1"));
        app.backend
            .problem("2", Reply::json(401, json!({"detail": "expired"})));

        let err = app
            .state
            .contests
            .load_problems(&session(), &snapshot(&["1", "2"]))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::AuthRequired);
    }

    #[tokio::test]
    async fn empty_problem_list_is_an_error() {
        let app = TestApp::spawn().await;

        let err = app
            .state
            .contests
            .load_problems(&session(), &snapshot(&[]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Validation("No valid problems found for this contest".into())
        );
    }
}
