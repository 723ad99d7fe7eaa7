//! Integration tests for the auto-close sweep.

mod helpers;

use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;

use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_entity::job::Job;
use visitpoint_entity::ledger::PointReason;
use visitpoint_entity::session::{CloseReason, SessionStatus};
use visitpoint_worker::JobHandler;
use visitpoint_worker::jobs::{AUTO_CLOSE_JOB, AutoCloseJobHandler};

use helpers::TestApp;

#[tokio::test]
async fn test_nine_hour_session_is_auto_closed_once() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    app.scan_in(user, venue).await;
    app.advance(Duration::hours(9));

    let report = app.engine.auto_close_expired(app.now()).await.unwrap();
    assert_eq!(report.closed.len(), 1);
    assert_eq!(report.closed[0].status, SessionStatus::Closed);
    assert_eq!(report.closed[0].close_reason, Some(CloseReason::Auto));
    assert_eq!(report.closed[0].check_out_at, Some(app.now()));
    assert_eq!(report.awarded.len(), 1);
    assert_eq!(report.awarded[0].reason, PointReason::LongStay);

    for _ in 0..3 {
        app.advance(Duration::minutes(1));
        let again = app.engine.auto_close_expired(app.now()).await.unwrap();
        assert!(again.closed.is_empty());
        assert!(again.awarded.is_empty());
    }

    let page = app.engine.get_point_history(user, None, None).await.unwrap();
    let long_stays = page
        .items
        .iter()
        .filter(|e| e.reason == PointReason::LongStay)
        .count();
    assert_eq!(long_stays, 1);
    assert_eq!(app.balance(user).await, 250);
    assert!(app.engine.get_present_visitors(venue).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sessions_within_limit_stay_open() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    app.scan_in(user, venue).await;
    app.advance(Duration::hours(8));

    let report = app.engine.auto_close_expired(app.now()).await.unwrap();
    assert!(report.closed.is_empty());
    assert_eq!(app.engine.get_present_visitors(venue).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_check_in_after_auto_close_starts_new_session() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    let first = app.scan_in(user, venue).await;
    app.advance(Duration::hours(10));
    app.engine.auto_close_expired(app.now()).await.unwrap();

    let second = app.scan_in(user, venue).await;
    assert_ne!(first.session.id, second.session.id);
    assert_eq!(second.awarded_points, 100);
}

#[tokio::test]
async fn test_provider_fault_is_retried_on_next_sweep() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    app.scan_in(user, venue).await;
    app.advance(Duration::hours(9));

    app.sessions.set_offline(true);
    assert!(app.engine.auto_close_expired(app.now()).await.is_err());

    app.sessions.set_offline(false);
    let report = app.engine.auto_close_expired(app.now()).await.unwrap();
    assert_eq!(report.closed.len(), 1);
    assert_eq!(report.awarded.len(), 1);
}

#[tokio::test]
async fn test_sweep_does_not_block_other_check_ins() {
    let app = TestApp::new();
    let venue = VenueId::new();
    let (stayer, newcomer) = (UserId::new(), UserId::new());

    app.scan_in(stayer, venue).await;
    app.advance(Duration::hours(9));

    let engine = Arc::clone(&app.engine);
    let now = app.now();
    let sweep = tokio::spawn(async move { engine.auto_close_expired(now).await });
    let arrived = app.scan_in(newcomer, venue).await;
    let report = sweep.await.unwrap().unwrap();

    assert_eq!(arrived.session.user_id, newcomer);
    assert_eq!(report.closed.len(), 1);
    assert_eq!(report.closed[0].user_id, stayer);
}

#[tokio::test]
async fn test_worker_handler_uses_engine_clock() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());
    app.scan_in(user, venue).await;
    app.advance(Duration::hours(12));

    let handler = AutoCloseJobHandler::new(Arc::clone(&app.engine));
    let result = handler
        .execute(&Job::new(AUTO_CLOSE_JOB, app.now()))
        .await
        .unwrap()
        .unwrap_or(Value::Null);
    assert_eq!(result["closed"], 1);
    assert_eq!(result["awarded_points"], 150);

    let history = app.engine.get_visit_history(user).await.unwrap();
    assert_eq!(history[0].close_reason, Some(CloseReason::Auto));
    assert_eq!(history[0].check_out_at, Some(app.now()));
}
