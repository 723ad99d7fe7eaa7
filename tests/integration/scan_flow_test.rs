//! Integration tests for code scanning and visit sessions.

mod helpers;

use chrono::Duration;

use visitpoint_core::error::{EngineError, ScanError, SessionError};
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_entity::code::{CodePayload, ScanIntent};
use visitpoint_entity::session::{CloseReason, SessionStatus, Transition};

use helpers::TestApp;

#[tokio::test]
async fn test_toggle_code_checks_in_then_out() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    let first = app
        .engine
        .scan(&app.code(venue, None), user, app.now())
        .await
        .unwrap();
    assert_eq!(first.transition, Transition::CheckedIn);
    assert_eq!(first.session.status, SessionStatus::Open);
    assert_eq!(first.awarded_points, 100);

    app.advance(Duration::minutes(30));
    let second = app
        .engine
        .scan(&app.code(venue, None), user, app.now())
        .await
        .unwrap();
    assert_eq!(second.transition, Transition::CheckedOut);
    assert_eq!(second.session.id, first.session.id);
    assert_eq!(second.session.close_reason, Some(CloseReason::Manual));
    assert_eq!(second.awarded_points, 0);
}

#[tokio::test]
async fn test_in_out_in_yields_distinct_sessions() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    let a = app.scan_in(user, venue).await;
    app.advance(Duration::minutes(10));
    app.scan_out(user, venue).await;
    app.advance(Duration::minutes(10));
    let b = app.scan_in(user, venue).await;

    assert_ne!(a.session.id, b.session.id);
    let history = app.engine.get_visit_history(user).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, b.session.id);
    assert_eq!(history[0].status, SessionStatus::Open);
    assert_eq!(history[1].status, SessionStatus::Closed);
}

#[tokio::test]
async fn test_same_code_twice_is_replayed() {
    let app = TestApp::new();
    let venue = VenueId::new();
    let code = app.code(venue, None);

    app.engine.scan(&code, UserId::new(), app.now()).await.unwrap();
    let err = app
        .engine
        .scan(&code, UserId::new(), app.now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::Replayed)));
    assert_eq!(err.code(), "REPLAYED");
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let app = TestApp::new();
    let code = app.code(VenueId::new(), None);

    app.advance(Duration::seconds(301));
    let err = app
        .engine
        .scan(&code, UserId::new(), app.now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::Expired { .. })));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_code_at_window_edge_is_accepted() {
    let app = TestApp::new();
    let code = app.code(VenueId::new(), None);

    app.advance(Duration::seconds(300));
    assert!(app.engine.scan(&code, UserId::new(), app.now()).await.is_ok());
}

#[tokio::test]
async fn test_malformed_and_forged_codes() {
    let app = TestApp::new();
    let user = UserId::new();

    for raw in ["", "hello", "v1.abc", "v2.e30.e30", "v1.!!!.???"] {
        let err = app.engine.scan(raw, user, app.now()).await.unwrap_err();
        assert!(
            matches!(err, EngineError::Scan(ScanError::Malformed(_))),
            "{raw:?} gave {err:?}"
        );
    }

    let other = visitpoint_engine::CodeIssuer::new("a-completely-different-secret");
    let forged = other
        .issue(VenueId::new(), None, None, app.now())
        .unwrap();
    let err = app.engine.scan(&forged, user, app.now()).await.unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::Malformed(_))));

    let oversized = "v1.".to_string() + &"a".repeat(4096);
    let err = app.engine.scan(&oversized, user, app.now()).await.unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::Malformed(_))));
}

#[tokio::test]
async fn test_exit_code_without_session_is_not_open() {
    let app = TestApp::new();
    let code = app.code(VenueId::new(), Some(ScanIntent::Out));
    let err = app
        .engine
        .scan(&code, UserId::new(), app.now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Session(SessionError::NotOpen { .. })));
}

#[tokio::test]
async fn test_entry_code_twice_is_already_open() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());
    app.scan_in(user, venue).await;

    let code = app.code(venue, Some(ScanIntent::In));
    let err = app.engine.scan(&code, user, app.now()).await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_OPEN");
}

#[tokio::test]
async fn test_self_identifying_code_overrides_scanner() {
    let app = TestApp::new();
    let (owner, scanner, venue) = (UserId::new(), UserId::new(), VenueId::new());

    let code = app
        .engine
        .issuer()
        .issue(venue, Some(owner), Some(ScanIntent::In), app.now())
        .unwrap();
    let outcome = app.engine.scan(&code, scanner, app.now()).await.unwrap();

    assert_eq!(outcome.session.user_id, owner);
    assert_eq!(app.balance(owner).await, 100);
    assert_eq!(app.balance(scanner).await, 0);
}

#[tokio::test]
async fn test_scan_as_current_user() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    let code = app.code(venue, None);
    assert!(app.engine.scan_as_current_user(&code).await.is_err());

    app.identity.sign_in(user);
    let code = app.code(venue, None);
    let outcome = app.engine.scan_as_current_user(&code).await.unwrap();
    assert_eq!(outcome.session.user_id, user);
}

#[tokio::test]
async fn test_hand_built_payload_round_trips() {
    let app = TestApp::new();
    let venue = VenueId::new();
    let payload = CodePayload {
        venue_id: venue,
        issued_at: app.now().timestamp(),
        nonce: "door-7-0001".to_string(),
        user_id: None,
        intent: Some(ScanIntent::In),
    };
    let code = app.engine.issuer().encode(&payload).unwrap();
    assert_eq!(app.engine.issuer().decode(&code).unwrap(), payload);

    let outcome = app.engine.scan(&code, UserId::new(), app.now()).await.unwrap();
    assert_eq!(outcome.session.venue_id, venue);
}

#[tokio::test]
async fn test_present_visitors_view() {
    let app = TestApp::new();
    let venue = VenueId::new();
    let (early, late) = (UserId::new(), UserId::new());

    app.scan_in(early, venue).await;
    app.advance(Duration::minutes(45));
    app.scan_in(late, venue).await;
    app.advance(Duration::minutes(5));

    let present = app.engine.get_present_visitors(venue).await.unwrap();
    assert_eq!(present.len(), 2);
    assert_eq!(present[0].user_id, early);
    assert_eq!(present[0].stayed_minutes, 50);
    assert_eq!(present[1].since, "5m ago");

    app.scan_out(early, venue).await;
    let present = app.engine.get_present_visitors(venue).await.unwrap();
    assert_eq!(present.len(), 1);
    assert_eq!(present[0].user_id, late);
}

#[tokio::test]
async fn test_visit_history_range_filter() {
    let app = TestApp::new();
    let user = UserId::new();
    let (a, b) = (VenueId::new(), VenueId::new());

    app.scan_in(user, a).await;
    app.advance(Duration::hours(1));
    app.scan_out(user, a).await;
    app.advance(Duration::days(2));
    let mark = app.now();
    app.scan_in(user, b).await;

    let recent = app
        .engine
        .get_visit_history_in(
            user,
            visitpoint_core::types::time_range::TimeRange::between(mark, mark + Duration::days(1)),
        )
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].venue_id, b);
}

#[tokio::test]
async fn test_failed_check_in_releases_the_code() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());
    let code = app.code(venue, None);

    app.sessions.set_offline(true);
    let err = app.engine.scan(&code, user, app.now()).await.unwrap_err();
    assert!(err.is_retryable());

    app.sessions.set_offline(false);
    let outcome = app.engine.scan(&code, user, app.now()).await.unwrap();
    assert_eq!(outcome.transition, Transition::CheckedIn);
}
