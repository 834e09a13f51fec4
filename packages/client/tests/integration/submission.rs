use ::common::submission::ResultBadge;
use ::common::{SubmissionStatus, TestCaseStatus};
use client::fetcher::SubmissionSource;
use client::{ClientError, Session, TrackerEvent};
use serde_json::json;

use crate::common::{Reply, Script, TestApp};

fn session() -> Session {
    Session::new("secret-token").with_user(7, "ada")
}

mod fetch {
    use super::*;

    #[tokio::test]
    async fn normalizes_alternate_field_names() {
        let app = TestApp::spawn().await;
        app.backend.submission(
            "42",
            vec![Reply::ok(json!({
                "status": "COMPLETED",
                "language": "python",
                "code": "print(1)",
                "runtime": 12.5,
                "memory": 3.25,
                "test_cases_passed": 2,
                "total_test_cases": 3,
                "problem": {"id": 9, "title": "Two Sum"},
                "created_at": "2024-03-01T10:00:00Z",
                "submission_tests": [
                    {"status": "passed", "input": "1 2", "expected_output": "3", "actual_output": "3"},
                    {"status": "passed", "input": "2 2", "expected_output": "4", "actual_output": "4"},
                    {"status": "failed", "input": "0 0", "expected_output": "0", "actual_output": "1"}
                ]
            }))],
        );

        let view = app.state.fetcher.fetch_submission("42", &session()).await.unwrap();

        assert_eq!(view.id, "42");
        assert_eq!(view.status, SubmissionStatus::Completed);
        assert_eq!(view.language, "python");
        assert_eq!(view.source_code, "print(1)");
        assert_eq!(view.runtime_ms, Some(12.5));
        assert_eq!(view.memory_mb, Some(3.25));
        assert_eq!(view.problem.id.as_deref(), Some("9"));
        assert_eq!(view.problem.title, "Two Sum");
        assert_eq!(view.test_results.len(), 3);
        assert_eq!(view.test_results[2].status, TestCaseStatus::Failed);
        assert_eq!(view.accuracy_label(), "66.7%");
        assert_eq!(view.badge(), ResultBadge::PartiallyPassed);

        let requests = app.backend.requests_to("submission/42");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1.as_deref(), Some("secret-token"));
    }

    #[tokio::test]
    async fn sparse_record_gets_defaults() {
        let app = TestApp::spawn().await;
        app.backend.submission("5", vec![Reply::ok(json!({"status": "PENDING"}))]);

        let view = app.state.fetcher.fetch_submission("5", &session()).await.unwrap();

        assert_eq!(view.language, "Unknown");
        assert_eq!(view.problem.title, "Unknown Problem");
        assert_eq!(view.test_cases_passed, 0);
        assert_eq!(view.total_test_cases, 0);
        assert!(view.test_results.is_empty());
        assert_eq!(view.accuracy_label(), "N/A");
    }

    #[tokio::test]
    async fn not_found_uses_detail_message() {
        let app = TestApp::spawn().await;

        let err = app
            .state
            .fetcher
            .fetch_submission("404", &session())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::FetchFailed {
                status: Some(404),
                message: "Submission not found".into()
            }
        );
    }

    #[tokio::test]
    async fn server_error_without_message_uses_generic_text() {
        let app = TestApp::spawn().await;
        app.backend.submission(
            "1",
            vec![Reply {
                status: 500,
                body: "<html>oops</html>".into(),
            }],
        );

        let err = app
            .state
            .fetcher
            .fetch_submission("1", &session())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to fetch submission details");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_body_is_empty_response() {
        let app = TestApp::spawn().await;
        app.backend.submission("1", vec![Reply::empty()]);

        let err = app
            .state
            .fetcher
            .fetch_submission("1", &session())
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::EmptyResponse);
    }

    #[tokio::test]
    async fn rejected_token_is_auth_required() {
        let app = TestApp::spawn().await;
        app.backend.submission(
            "1",
            vec![Reply::json(401, json!({"detail": "Token expired"}))],
        );

        let err = app
            .state
            .fetcher
            .fetch_submission("1", &session())
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::AuthRequired);
    }

    #[tokio::test]
    async fn validation_happens_before_any_request() {
        let app = TestApp::spawn().await;

        let missing_id = app.state.fetcher.fetch_submission("  ", &session()).await;
        let missing_token = app
            .state
            .fetcher
            .fetch_submission("1", &Session::anonymous())
            .await;

        assert_eq!(missing_id.unwrap_err(), ClientError::MissingIdentifier);
        assert_eq!(missing_token.unwrap_err(), ClientError::AuthRequired);
        assert!(app.backend.requests_to("submission").is_empty());
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failure() {
        let mut app = TestApp::spawn().await;
        app.state.fetcher = client::ResultFetcher::new(
            client::http::ApiClient::new(&app.state.config.http).unwrap(),
            app.state.config.api.clone(),
            ::common::retry::RetryPolicy {
                max_retries: 2,
                base_delay_ms: 5,
                max_delay_ms: 20,
            },
        );
        app.backend.submission(
            "3",
            vec![
                Reply::json(503, json!({"message": "busy"})),
                Reply::ok(json!({"status": "COMPLETED"})),
            ],
        );

        let view = app
            .state
            .fetcher
            .fetch_submission_with_retry("3", &session())
            .await
            .unwrap();

        assert_eq!(view.status, SubmissionStatus::Completed);
        assert_eq!(app.backend.requests_to("submission/3").len(), 2);
    }

    #[tokio::test]
    async fn tracker_load_uses_configured_retries() {
        let mut app = TestApp::spawn().await;
        app.state.fetcher = client::ResultFetcher::new(
            client::http::ApiClient::new(&app.state.config.http).unwrap(),
            app.state.config.api.clone(),
            ::common::retry::RetryPolicy {
                max_retries: 1,
                base_delay_ms: 5,
                max_delay_ms: 20,
            },
        );
        app.backend.submission(
            "4",
            vec![
                Reply::json(502, json!({"message": "bad gateway"})),
                Reply::ok(json!({"status": "COMPLETED"})),
            ],
        );

        let mut tracker = app.state.submission_tracker();
        let view = tracker.load("4", &session()).await.unwrap();

        assert_eq!(view.status, SubmissionStatus::Completed);
        assert_eq!(app.backend.requests_to("submission/4").len(), 2);
    }
}

mod live {
    use super::*;

    #[tokio::test]
    async fn stream_updates_until_completed() {
        let app = TestApp::spawn().await;
        app.backend.submission(
            "11",
            vec![Reply::ok(json!({"status": "PROCESSING", "total_test_cases": 2}))],
        );
        app.backend.stream(
            "submission/11",
            Script::frames(&[
                json!({"status": "PROCESSING", "message": "50%"}),
                json!({"status": "PROCESSING", "message": "80%", "test_cases_passed": 1}),
                json!({"status": "COMPLETED", "test_cases_passed": 2}),
            ]),
        );

        let mut tracker = app.state.submission_tracker();
        let view = tracker.load("11", &session()).await.unwrap();
        assert_eq!(view.status, SubmissionStatus::Processing);

        match tracker.next_event().await {
            Some(TrackerEvent::Updated(view)) => assert_eq!(view.message.as_deref(), Some("50%")),
            other => panic!("expected update, got {other:?}"),
        }
        match tracker.next_event().await {
            Some(TrackerEvent::Updated(view)) => {
                assert_eq!(view.message.as_deref(), Some("80%"));
                assert_eq!(view.test_cases_passed, 1);
            }
            other => panic!("expected update, got {other:?}"),
        }
        match tracker.next_event().await {
            Some(TrackerEvent::Finished(view)) => {
                assert_eq!(view.status, SubmissionStatus::Completed);
                assert_eq!(view.message.as_deref(), Some("80%"));
                assert_eq!(view.test_cases_passed, 2);
                assert_eq!(view.badge(), ResultBadge::AllPassed);
            }
            other => panic!("expected finish, got {other:?}"),
        }
        assert_eq!(tracker.next_event().await, None);
        assert_eq!(
            app.backend.connections.lock().unwrap().as_slice(),
            ["submission/11"]
        );
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let app = TestApp::spawn().await;
        app.backend
            .submission("12", vec![Reply::ok(json!({"status": "PENDING"}))]);
        app.backend.stream(
            "submission/12",
            Script::raw(&[
                "not json at all",
                r#"{"status": "PROCESSING", "message": "running"}"#,
                r#"{"status": "FAILED", "error_message": "Compilation error"}"#,
            ]),
        );

        let mut tracker = app.state.submission_tracker();
        tracker.load("12", &session()).await.unwrap();

        assert!(matches!(
            tracker.next_event().await,
            Some(TrackerEvent::Updated(_))
        ));
        match tracker.next_event().await {
            Some(TrackerEvent::Finished(view)) => {
                assert_eq!(view.status, SubmissionStatus::Failed);
                assert_eq!(view.error_message.as_deref(), Some("Compilation error"));
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_hang_up_falls_back_to_polling() {
        let app = TestApp::spawn().await;
        app.backend.submission(
            "13",
            vec![
                Reply::ok(json!({"status": "PROCESSING"})),
                Reply::ok(json!({"status": "COMPLETED", "test_cases_passed": 1, "total_test_cases": 1})),
            ],
        );
        app.backend.stream(
            "submission/13",
            Script::frames(&[json!({"status": "PROCESSING", "message": "queued"})]).then_hang_up(),
        );

        let mut tracker = app.state.submission_tracker();
        tracker.load("13", &session()).await.unwrap();

        assert!(matches!(
            tracker.next_event().await,
            Some(TrackerEvent::Updated(_))
        ));
        assert!(matches!(
            tracker.next_event().await,
            Some(TrackerEvent::Notice(_))
        ));
        match tracker.next_event().await {
            Some(TrackerEvent::Finished(view)) => {
                assert_eq!(view.status, SubmissionStatus::Completed);
                assert_eq!(view.message.as_deref(), Some("queued"));
            }
            other => panic!("expected finish, got {other:?}"),
        }
        assert_eq!(app.backend.requests_to("submission/13").len(), 2);
    }

    #[tokio::test]
    async fn completed_submission_never_connects() {
        let app = TestApp::spawn().await;
        app.backend
            .submission("14", vec![Reply::ok(json!({"status": "COMPLETED"}))]);

        let mut tracker = app.state.submission_tracker();
        tracker.load("14", &session()).await.unwrap();

        assert!(matches!(
            tracker.next_event().await,
            Some(TrackerEvent::Finished(_))
        ));
        assert!(app.backend.connections.lock().unwrap().is_empty());
    }
}
