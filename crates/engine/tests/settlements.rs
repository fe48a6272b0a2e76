use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineError, ExpenseCmd, MoneyCents, Settlement, SettlementStatus};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob", "carol"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

/// Dinner for 90 paid by alice, equal split across alice/bob/carol: leaves
/// two pending settlements of 30 toward alice. Returns the group id and the
/// bob→alice settlement.
async fn group_with_debt(engine: &Engine) -> (String, Settlement) {
    let group_id = engine.new_group("Trip", "alice", Utc::now()).await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "alice")
        .await
        .unwrap();
    engine
        .add_group_member(&group_id, "carol", "alice")
        .await
        .unwrap();

    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Dinner",
                MoneyCents::new(90_00),
                NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(90_00)),
        )
        .await
        .unwrap();

    let settlement = engine
        .group_settlements(&group_id, "alice")
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.paid_by == "bob")
        .expect("missing bob settlement");
    assert_eq!(settlement.amount, MoneyCents::new(30_00));

    (group_id, settlement)
}

async fn reload(engine: &Engine, group_id: &str, id: uuid::Uuid) -> Settlement {
    engine
        .group_settlements(group_id, "alice")
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.id == id)
        .expect("settlement disappeared")
}

#[tokio::test]
async fn partial_payments_accumulate_then_await_confirmation() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    let status = engine
        .record_payment(&id, "bob", MoneyCents::new(10_00), Utc::now())
        .await
        .unwrap();
    assert_eq!(status, SettlementStatus::Partial);

    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.partial_paid, MoneyCents::new(10_00));
    assert_eq!(row.remaining(), MoneyCents::new(20_00));

    // The closing payment clamps partial_paid to exactly the total.
    let status = engine
        .record_payment(&id, "bob", MoneyCents::new(20_00), Utc::now())
        .await
        .unwrap();
    assert_eq!(status, SettlementStatus::AwaitingConfirmation);

    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.partial_paid, MoneyCents::new(30_00));
    assert!(row.settled_at.is_none());
}

#[tokio::test]
async fn payment_one_cent_short_of_total_counts_as_full() {
    let (engine, _db) = engine_with_db().await;
    let (_group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    // 29.99 of 30.00 is within the one-cent tolerance: treated as complete.
    let status = engine
        .record_payment(&id, "bob", MoneyCents::new(29_99), Utc::now())
        .await
        .unwrap();
    assert_eq!(status, SettlementStatus::AwaitingConfirmation);
}

#[tokio::test]
async fn overpayment_is_rejected_with_both_amounts() {
    let (engine, _db) = engine_with_db().await;
    let (_group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    engine
        .record_payment(&id, "bob", MoneyCents::new(10_00), Utc::now())
        .await
        .unwrap();

    let err = engine
        .record_payment(&id, "bob", MoneyCents::new(25_00), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Overpayment {
            remaining: MoneyCents::new(20_00),
            attempted: MoneyCents::new(25_00),
        }
    );
}

#[tokio::test]
async fn only_the_creditor_confirms_receipt() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    engine.mark_paid(&id, "bob", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::AwaitingConfirmation);

    // The debtor cannot confirm their own payment.
    let err = engine.confirm(&id, "bob", Utc::now()).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.confirm(&id, "alice", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::Paid);
    assert!(row.settled_at.is_some());
}

#[tokio::test]
async fn receiver_initiated_mark_paid_still_requires_confirmation() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    // Whichever party initiates, the row waits for explicit confirmation.
    engine.mark_paid(&id, "alice", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::AwaitingConfirmation);
}

#[tokio::test]
async fn confirm_before_mark_paid_is_an_invalid_transition() {
    let (engine, _db) = engine_with_db().await;
    let (_group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    let err = engine.confirm(&id, "alice", Utc::now()).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}

#[tokio::test]
async fn cancellation_is_decided_by_the_creditor() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    engine.request_cancel(&id, "bob", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::CancelRequest);

    let err = engine
        .approve_cancel(&id, "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // Rejection reverts to pending with amounts untouched.
    engine.reject_cancel(&id, "alice", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::Pending);
    assert_eq!(row.amount, MoneyCents::new(30_00));

    engine.request_cancel(&id, "alice", Utc::now()).await.unwrap();
    engine.approve_cancel(&id, "alice", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::Cancelled);
    assert!(row.settled_at.is_some());
}

#[tokio::test]
async fn terminal_settlements_reject_further_payments() {
    let (engine, _db) = engine_with_db().await;
    let (_group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    engine.mark_paid(&id, "bob", Utc::now()).await.unwrap();
    engine.confirm(&id, "alice", Utc::now()).await.unwrap();

    let err = engine
        .record_payment(&id, "bob", MoneyCents::new(1_00), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}

#[tokio::test]
async fn non_parties_cannot_see_the_settlement() {
    let (engine, _db) = engine_with_db().await;
    let (_group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    // carol is a group member but not a party to bob→alice; she gets the
    // same answer as for a settlement that does not exist.
    let err = engine
        .record_payment(&id, "carol", MoneyCents::new(5_00), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("settlement not exists".to_string())
    );

    let err = engine.confirm(&id, "carol", Utc::now()).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("settlement not exists".to_string())
    );
}

#[tokio::test]
async fn reminders_are_creditor_only_and_change_nothing() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    let err = engine
        .send_reminder(&id, "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.send_reminder(&id, "alice", Utc::now()).await.unwrap();
    let row = reload(&engine, &group_id, settlement.id).await;
    assert_eq!(row.status, SettlementStatus::Pending);

    // The nudge reached the debtor's feed.
    let feed = engine.notifications_for_user("bob").await.unwrap();
    assert!(feed.iter().any(|n| n.message.contains("Reminder")));
}

#[tokio::test]
async fn payments_notify_both_parties_after_commit() {
    let (engine, _db) = engine_with_db().await;
    let (_group_id, settlement) = group_with_debt(&engine).await;
    let id = settlement.id.to_string();

    engine
        .record_payment(&id, "bob", MoneyCents::new(30_00), Utc::now())
        .await
        .unwrap();

    let alice_feed = engine.notifications_for_user("alice").await.unwrap();
    assert!(
        alice_feed
            .iter()
            .any(|n| n.message.contains("completed full payment"))
    );
    let bob_feed = engine.notifications_for_user("bob").await.unwrap();
    assert!(!bob_feed.is_empty());

    let first = &alice_feed[0];
    assert!(!first.is_read);
    engine
        .mark_notification_read(first.id, "alice")
        .await
        .unwrap();
    // Another user cannot touch someone else's notification.
    let err = engine
        .mark_notification_read(first.id, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn settlements_for_user_filters_by_party_and_group() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, _settlement) = group_with_debt(&engine).await;

    // carol is a party to her own debt toward alice, not bob's.
    let carols = engine.settlements_for_user("carol", None).await.unwrap();
    assert_eq!(carols.len(), 1);
    assert_eq!(carols[0].paid_by, "carol");

    let in_group = engine
        .settlements_for_user("alice", Some(&group_id))
        .await
        .unwrap();
    assert_eq!(in_group.len(), 2);

    let elsewhere = engine
        .settlements_for_user("alice", Some("no-such-group"))
        .await
        .unwrap();
    assert!(elsewhere.is_empty());
}
