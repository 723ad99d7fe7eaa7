//! Randomized concurrent interleavings against the engine.

mod helpers;

use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;
use proptest::prelude::*;

use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_entity::code::ScanIntent;
use visitpoint_entity::ledger::{PointReason, RewardKind};
use visitpoint_entity::session::{SessionStatus, Transition};
use visitpoint_engine::ScanOutcome;

use helpers::TestApp;

#[derive(Debug, Clone, Copy)]
enum Op {
    In,
    Out,
    Toggle,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::In), Just(Op::Out), Just(Op::Toggle)]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn at_most_one_open_session_per_pair(ops in prop::collection::vec(op(), 1..24)) {
        let (opened, closed, open_now, total) = runtime().block_on(async {
            let app = TestApp::new();
            let (user, venue) = (UserId::new(), VenueId::new());

            let tasks = ops.iter().map(|op| {
                let intent = match op {
                    Op::In => Some(ScanIntent::In),
                    Op::Out => Some(ScanIntent::Out),
                    Op::Toggle => None,
                };
                let code = app.code(venue, intent);
                let engine = Arc::clone(&app.engine);
                let now = app.now();
                tokio::spawn(async move { engine.scan(&code, user, now).await })
            });

            let mut opened = 0;
            let mut closed = 0;
            for result in join_all(tasks).await {
                match result.expect("task") {
                    Ok(outcome) if outcome.transition == Transition::CheckedIn => opened += 1,
                    Ok(_) => closed += 1,
                    Err(e) => assert!(
                        matches!(e.code(), "ALREADY_OPEN" | "NOT_OPEN"),
                        "unexpected error {e}"
                    ),
                }
            }

            let history = app.engine.get_visit_history(user).await.expect("history");
            let open_now = history.iter().filter(|s| s.status == SessionStatus::Open).count();
            (opened, closed, open_now, history.len())
        });

        prop_assert!(open_now <= 1);
        prop_assert_eq!(total, opened);
        prop_assert_eq!(opened - closed, open_now);
    }

    #[test]
    fn concurrent_appends_keep_balance_equal_to_sum(amounts in prop::collection::vec(-200i64..400, 1..40)) {
        let (balance, sum, entries, accepted) = runtime().block_on(async {
            let app = TestApp::new();
            let user = UserId::new();
            app.engine.correct(user, 1_000, "seed", app.now()).await.expect("seed");

            let tasks = amounts.iter().filter(|a| **a != 0).map(|amount| {
                let engine = Arc::clone(&app.engine);
                let (amount, now) = (*amount, app.now());
                tokio::spawn(async move { engine.correct(user, amount, "concurrent", now).await })
            });
            let accepted = join_all(tasks)
                .await
                .into_iter()
                .filter(|r| matches!(r, Ok(Ok(_))))
                .count();

            let page = app.engine.get_point_history(user, Some(100), None).await.expect("history");
            let sum: i64 = page.items.iter().map(|e| e.signed_amount()).sum();
            (app.balance(user).await, sum, page.items.len(), accepted)
        });

        prop_assert_eq!(balance, sum);
        prop_assert!(balance >= 0);
        prop_assert_eq!(entries, accepted + 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemptions_never_overdraw() {
    let app = TestApp::new();
    let user = UserId::new();
    app.engine.correct(user, 1_000, "seed", app.now()).await.unwrap();

    let tasks = (0..20).map(|_| {
        let engine = Arc::clone(&app.engine);
        let now = app.now();
        tokio::spawn(async move { engine.redeem(user, RewardKind::DrinkDiscount, now).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let granted = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.code() == "INSUFFICIENT_BALANCE"))
        .count();
    assert_eq!((granted, refused), (10, 10));
    assert_eq!(app.balance(user).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_users_do_not_interfere() {
    let app = TestApp::new();
    let venue = VenueId::new();
    let users: Vec<UserId> = (0..16).map(|_| UserId::new()).collect();

    let tasks = users.iter().map(|user| {
        let code = app.code(venue, Some(ScanIntent::In));
        let engine = Arc::clone(&app.engine);
        let (user, now) = (*user, app.now());
        tokio::spawn(async move { engine.scan(&code, user, now).await })
    });
    for result in join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }

    assert_eq!(app.engine.get_present_visitors(venue).await.unwrap().len(), 16);
    for user in users {
        assert_eq!(app.balance(user).await, 100);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_code_scanned_concurrently_resolves_once() {
    let app = TestApp::new();
    let venue = VenueId::new();
    let code = app.code(venue, Some(ScanIntent::In));

    let tasks = (0..16).map(|_| {
        let engine = Arc::clone(&app.engine);
        let (code, now) = (code.clone(), app.now());
        tokio::spawn(async move { engine.scan(&code, UserId::new(), now).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let replayed = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.code() == "REPLAYED"))
        .count();
    assert_eq!((accepted, replayed), (1, 15));
    assert_eq!(app.engine.get_present_visitors(venue).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_check_out_racing_auto_close_closes_once() {
    for _ in 0..25 {
        let app = TestApp::new();
        let (user, venue) = (UserId::new(), VenueId::new());
        app.scan_in(user, venue).await;
        app.advance(Duration::hours(9));
        let now = app.now();

        let leaving = tokio::spawn({
            let engine = Arc::clone(&app.engine);
            async move { engine.check_out(user, venue, now).await }
        });
        let sweep = tokio::spawn({
            let engine = Arc::clone(&app.engine);
            async move { engine.auto_close_expired(now).await }
        });
        let left = leaving.await.unwrap();
        let report = sweep.await.unwrap().unwrap();

        let closed_by_user = match &left {
            Ok(ScanOutcome { transition, .. }) => {
                assert_eq!(*transition, Transition::CheckedOut);
                1
            }
            Err(e) => {
                assert_eq!(e.code(), "NOT_OPEN");
                0
            }
        };
        assert_eq!(closed_by_user + report.closed.len(), 1);

        let history = app.engine.get_visit_history(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SessionStatus::Closed);

        let page = app.engine.get_point_history(user, Some(100), None).await.unwrap();
        let long_stays = page
            .items
            .iter()
            .filter(|e| e.reason == PointReason::LongStay)
            .count();
        assert_eq!(long_stays, 1);
        assert_eq!(app.balance(user).await, 250);
    }
}
