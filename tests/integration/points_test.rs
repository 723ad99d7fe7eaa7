//! Integration tests for awards, redemptions and the points views.

mod helpers;

use chrono::Duration;

use visitpoint_core::error::LedgerError;
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_entity::ledger::{EntryKind, PointReason, RewardKind};

use helpers::TestApp;

#[tokio::test]
async fn test_three_hour_visit_earns_check_in_and_long_stay() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    let arrived = app.scan_in(user, venue).await;
    assert_eq!(arrived.awarded_points, 100);

    app.advance(Duration::hours(3));
    let left = app.scan_out(user, venue).await;
    assert_eq!(left.awarded_points, 150);
    assert!(!left.unsettled);

    let page = app.engine.get_point_history(user, None, None).await.unwrap();
    let reasons: Vec<PointReason> = page.items.iter().rev().map(|e| e.reason).collect();
    assert_eq!(reasons, vec![PointReason::CheckIn, PointReason::LongStay]);
    assert_eq!(app.balance(user).await, 250);
}

#[tokio::test]
async fn test_short_visit_earns_only_check_in() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    app.scan_in(user, venue).await;
    app.advance(Duration::minutes(119));
    assert_eq!(app.scan_out(user, venue).await.awarded_points, 0);
    assert_eq!(app.balance(user).await, 100);
}

#[tokio::test]
async fn test_long_stay_threshold_is_inclusive() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    app.scan_in(user, venue).await;
    app.advance(Duration::minutes(120));
    assert_eq!(app.scan_out(user, venue).await.awarded_points, 150);
}

#[tokio::test]
async fn test_venue_override_changes_amounts() {
    let venue = VenueId::new();
    let mut config = visitpoint_core::config::AppConfig::with_secret(helpers::SECRET);
    config.rules.venues.insert(
        venue,
        visitpoint_core::config::VenueRules {
            check_in_bonus: 300,
            long_stay_bonus: 0,
            ..Default::default()
        },
    );
    let app = TestApp::with_config(config);
    let user = UserId::new();

    assert_eq!(app.scan_in(user, venue).await.awarded_points, 300);
    app.advance(Duration::hours(5));
    assert_eq!(app.scan_out(user, venue).await.awarded_points, 0);
    assert_eq!(app.engine.rules_for(&venue).check_in_bonus, 300);
    assert_eq!(app.engine.rules_for(&VenueId::new()).check_in_bonus, 100);
}

#[tokio::test]
async fn test_balance_matches_sum_of_entries() {
    let app = TestApp::new();
    let user = UserId::new();
    let now = app.now();

    app.engine.correct(user, 700, "opening balance", now).await.unwrap();
    app.engine.redeem(user, RewardKind::DrinkDiscount, now).await.unwrap();
    app.engine.correct(user, -50, "double award", now).await.unwrap();
    app.engine.redeem(user, RewardKind::SpecialItem, now).await.unwrap();

    let page = app.engine.get_point_history(user, Some(100), None).await.unwrap();
    let sum: i64 = page.items.iter().map(|e| e.signed_amount()).sum();
    assert_eq!(sum, 50);
    assert_eq!(app.balance(user).await, 50);
    assert_eq!(page.items[0].resulting_balance, 50);
}

#[tokio::test]
async fn test_overspend_is_rejected_and_writes_nothing() {
    let app = TestApp::new();
    let user = UserId::new();
    let now = app.now();
    app.engine.correct(user, 400, "seed", now).await.unwrap();

    let err = app
        .engine
        .redeem(user, RewardKind::SpecialItem, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance {
            balance: 400,
            requested: 500
        }
    ));
    assert_eq!(err.code(), "INSUFFICIENT_BALANCE");

    let page = app.engine.get_point_history(user, None, None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(app.balance(user).await, 400);
}

#[tokio::test]
async fn test_redeem_once_per_event() {
    let app = TestApp::new();
    let user = UserId::new();
    let now = app.now();
    app.engine.correct(user, 250, "seed", now).await.unwrap();

    let first = app
        .engine
        .redeem_once(user, RewardKind::DrinkDiscount, "order-42", now)
        .await
        .unwrap();
    let again = app
        .engine
        .redeem_once(user, RewardKind::DrinkDiscount, "order-42", now)
        .await
        .unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.kind, EntryKind::Spent);
    assert_eq!(app.balance(user).await, 150);
}

#[tokio::test]
async fn test_referral_counts_once_per_referee() {
    let app = TestApp::new();
    let (alice, bob, carol) = (UserId::new(), UserId::new(), UserId::new());
    let now = app.now();

    let entry = app.engine.award_referral(alice, carol, now).await.unwrap().unwrap();
    assert_eq!(entry.amount, 50);
    assert_eq!(entry.reason, PointReason::Referral);

    let repeat = app.engine.award_referral(alice, carol, now).await.unwrap();
    assert_eq!(repeat.map(|e| e.id), Some(entry.id));
    assert!(app.engine.award_referral(bob, carol, now).await.unwrap().is_none());
    assert!(app.engine.award_referral(bob, bob, now).await.unwrap().is_none());

    assert_eq!(app.balance(alice).await, 50);
    assert_eq!(app.balance(bob).await, 0);
}

#[tokio::test]
async fn test_corrections() {
    let app = TestApp::new();
    let user = UserId::new();
    let now = app.now();

    let zero = app.engine.correct(user, 0, "noop", now).await.unwrap_err();
    assert_eq!(zero.code(), "NON_POSITIVE_AMOUNT");

    let negative = app.engine.correct(user, -10, "too much", now).await.unwrap_err();
    assert_eq!(negative.code(), "INSUFFICIENT_BALANCE");

    let up = app.engine.correct(user, 120, "missed scan", now).await.unwrap();
    assert_eq!(up.kind, EntryKind::Earned);
    assert_eq!(up.note.as_deref(), Some("missed scan"));
    let down = app.engine.correct(user, -20, "double award", now).await.unwrap();
    assert_eq!(down.kind, EntryKind::Spent);
    assert_eq!(down.amount, 20);
    assert_eq!(app.balance(user).await, 100);
}

#[tokio::test]
async fn test_points_summary_window() {
    let app = TestApp::new();
    let user = UserId::new();

    app.engine.correct(user, 2_000, "old", app.now()).await.unwrap();
    app.advance(Duration::days(40));
    app.engine.correct(user, 300, "recent", app.now()).await.unwrap();
    app.engine
        .redeem(user, RewardKind::VipMembership, app.now())
        .await
        .unwrap();

    let summary = app.engine.get_points_summary(user).await.unwrap();
    assert_eq!(summary.balance, 1_300);
    assert_eq!(summary.earned, 300);
    assert_eq!(summary.spent, 1_000);
    assert_eq!(summary.window_days, 30);
    assert_eq!(summary.balance_display(), "1,300pt");
}

#[tokio::test]
async fn test_point_history_pages() {
    let app = TestApp::new();
    let user = UserId::new();
    for i in 1..=5 {
        app.engine
            .correct(user, i * 10, "step", app.now())
            .await
            .unwrap();
        app.advance(Duration::minutes(1));
    }

    let first = app.engine.get_point_history(user, Some(2), None).await.unwrap();
    assert_eq!(
        first.items.iter().map(|e| e.amount).collect::<Vec<_>>(),
        vec![50, 40]
    );
    let second = app
        .engine
        .get_point_history(user, Some(2), first.next_cursor)
        .await
        .unwrap();
    assert_eq!(
        second.items.iter().map(|e| e.amount).collect::<Vec<_>>(),
        vec![30, 20]
    );
    let last = app
        .engine
        .get_point_history(user, Some(2), second.next_cursor)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(last.next_cursor.is_none());
}

#[tokio::test]
async fn test_failed_award_is_settled_on_next_sweep() {
    let app = TestApp::new();
    let (user, venue) = (UserId::new(), VenueId::new());

    app.scan_in(user, venue).await;
    app.advance(Duration::hours(3));

    app.ledgers.set_offline(true);
    let left = app.scan_out(user, venue).await;
    assert!(left.unsettled);
    assert_eq!(left.awarded_points, 0);
    assert_eq!(app.engine.unsettled_sessions(), vec![left.session.id]);

    let report = app.engine.auto_close_expired(app.now()).await.unwrap();
    assert!(report.awarded.is_empty());
    assert_eq!(app.engine.unsettled_sessions().len(), 1);

    app.ledgers.set_offline(false);
    let report = app.engine.auto_close_expired(app.now()).await.unwrap();
    assert_eq!(report.awarded.len(), 1);
    assert_eq!(report.awarded[0].reason, PointReason::LongStay);
    assert!(app.engine.unsettled_sessions().is_empty());
    assert_eq!(app.balance(user).await, 250);
}
