use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineError, ExpenseCmd, MoneyCents, SettlementStatus, SplitSpec};
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

async fn trip_group(engine: &Engine) -> String {
    let group_id = engine.new_group("Trip", "alice", Utc::now()).await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "alice")
        .await
        .unwrap();
    engine
        .add_group_member(&group_id, "carol", "alice")
        .await
        .unwrap();
    group_id
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

fn custom(shares: &[(&str, i64)]) -> SplitSpec {
    let map: BTreeMap<String, MoneyCents> = shares
        .iter()
        .map(|(user, cents)| (user.to_string(), MoneyCents::new(*cents)))
        .collect();
    SplitSpec::Custom(map)
}

#[tokio::test]
async fn dinner_paid_by_one_member_settles_toward_them() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Dinner",
                MoneyCents::new(90_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(90_00)),
        )
        .await
        .unwrap();

    let settlements = engine.group_settlements(&group_id, "alice").await.unwrap();
    assert_eq!(settlements.len(), 2);

    // The matcher walks debtors in ascending username order: bob then carol,
    // both toward the sole creditor alice.
    let bob = settlements
        .iter()
        .find(|s| s.paid_by == "bob")
        .expect("missing bob settlement");
    assert_eq!(bob.paid_to, "alice");
    assert_eq!(bob.amount, MoneyCents::new(30_00));
    assert_eq!(bob.status, SettlementStatus::Pending);

    let carol = settlements
        .iter()
        .find(|s| s.paid_by == "carol")
        .expect("missing carol settlement");
    assert_eq!(carol.paid_to, "alice");
    assert_eq!(carol.amount, MoneyCents::new(30_00));
    assert_eq!(carol.status, SettlementStatus::Pending);
}

#[tokio::test]
async fn equal_split_puts_the_rounding_cent_on_the_first_member() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let expense_id = engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Groceries",
                MoneyCents::new(100_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(100_00)),
        )
        .await
        .unwrap();

    let (expense, payers, splits) = engine
        .expense_detail(&group_id, expense_id, "bob")
        .await
        .unwrap();
    assert_eq!(expense.amount, MoneyCents::new(100_00));
    assert_eq!(payers, vec![("alice".to_string(), MoneyCents::new(100_00))]);

    // alice is first in ascending username order, so she carries the extra
    // cent; the stored rows sum to the total exactly.
    assert_eq!(
        splits,
        vec![
            ("alice".to_string(), MoneyCents::new(33_34)),
            ("bob".to_string(), MoneyCents::new(33_33)),
            ("carol".to_string(), MoneyCents::new(33_33)),
        ]
    );
}

#[tokio::test]
async fn multi_payer_custom_split_matches_creditors_in_order() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "bob",
                "Hotel",
                MoneyCents::new(100_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(60_00))
            .payer("bob", MoneyCents::new(40_00))
            .split(custom(&[
                ("alice", 20_00),
                ("bob", 30_00),
                ("carol", 50_00),
            ])),
        )
        .await
        .unwrap();

    // Net: alice +40, bob +10, carol -50. Carol pays alice first (smaller
    // username among creditors), then bob.
    let settlements = engine.group_settlements(&group_id, "bob").await.unwrap();
    assert_eq!(settlements.len(), 2);
    assert!(settlements.iter().any(|s| s.paid_by == "carol"
        && s.paid_to == "alice"
        && s.amount == MoneyCents::new(40_00)));
    assert!(settlements.iter().any(|s| s.paid_by == "carol"
        && s.paid_to == "bob"
        && s.amount == MoneyCents::new(10_00)));
}

#[tokio::test]
async fn payer_total_must_match_expense_total() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let err = engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Taxi",
                MoneyCents::new(100_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(80_00)),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::SplitMismatch {
            expected: MoneyCents::new(100_00),
            provided: MoneyCents::new(80_00),
        }
    );
}

#[tokio::test]
async fn failed_submission_rolls_back_every_row() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    // Custom shares don't reach the total: the whole submission must vanish.
    let err = engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Broken",
                MoneyCents::new(100_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(100_00))
            .split(custom(&[("bob", 40_00)])),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SplitMismatch { .. }));

    assert!(engine.list_expenses(&group_id, "alice").await.unwrap().is_empty());
    assert!(engine
        .group_settlements(&group_id, "alice")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn same_direction_transfers_accumulate() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    for _ in 0..2 {
        engine
            .add_expense(
                ExpenseCmd::new(
                    &group_id,
                    "alice",
                    "Lunch",
                    MoneyCents::new(20_00),
                    date(),
                    Utc::now(),
                )
                .payer("alice", MoneyCents::new(20_00))
                .split(custom(&[("bob", 20_00)])),
            )
            .await
            .unwrap();
    }

    let settlements = engine.group_settlements(&group_id, "alice").await.unwrap();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].paid_by, "bob");
    assert_eq!(settlements[0].paid_to, "alice");
    assert_eq!(settlements[0].amount, MoneyCents::new(40_00));
}

#[tokio::test]
async fn opposite_direction_transfers_net_against_each_other() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    // bob owes alice 50.
    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Tickets",
                MoneyCents::new(50_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(50_00))
            .split(custom(&[("bob", 50_00)])),
        )
        .await
        .unwrap();

    // alice owes bob 30: the reverse row shrinks to 20.
    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "bob",
                "Fuel",
                MoneyCents::new(30_00),
                date(),
                Utc::now(),
            )
            .payer("bob", MoneyCents::new(30_00))
            .split(custom(&[("alice", 30_00)])),
        )
        .await
        .unwrap();

    let settlements = engine.group_settlements(&group_id, "alice").await.unwrap();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].paid_by, "bob");
    assert_eq!(settlements[0].paid_to, "alice");
    assert_eq!(settlements[0].amount, MoneyCents::new(20_00));

    // alice owes bob another 20: exact cancellation deletes the row.
    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "bob",
                "Parking",
                MoneyCents::new(20_00),
                date(),
                Utc::now(),
            )
            .payer("bob", MoneyCents::new(20_00))
            .split(custom(&[("alice", 20_00)])),
        )
        .await
        .unwrap();

    assert!(engine
        .group_settlements(&group_id, "alice")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn netting_past_zero_flips_the_direction() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    // bob owes alice 40.
    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "alice",
                "Dinner",
                MoneyCents::new(40_00),
                date(),
                Utc::now(),
            )
            .payer("alice", MoneyCents::new(40_00))
            .split(custom(&[("bob", 40_00)])),
        )
        .await
        .unwrap();

    // alice owes bob 60: the old row disappears, a 20 row points back.
    engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "bob",
                "Show",
                MoneyCents::new(60_00),
                date(),
                Utc::now(),
            )
            .payer("bob", MoneyCents::new(60_00))
            .split(custom(&[("alice", 60_00)])),
        )
        .await
        .unwrap();

    let settlements = engine.group_settlements(&group_id, "alice").await.unwrap();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].paid_by, "alice");
    assert_eq!(settlements[0].paid_to, "bob");
    assert_eq!(settlements[0].amount, MoneyCents::new(20_00));
    assert_eq!(settlements[0].status, SettlementStatus::Pending);
}

#[tokio::test]
async fn non_members_cannot_submit_or_list() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Duo", "alice", Utc::now()).await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "alice")
        .await
        .unwrap();

    let err = engine
        .add_expense(
            ExpenseCmd::new(
                &group_id,
                "carol",
                "Sneaky",
                MoneyCents::new(10_00),
                date(),
                Utc::now(),
            )
            .payer("carol", MoneyCents::new(10_00)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.list_expenses(&group_id, "carol").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn expenses_list_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    for (title, day) in [("Old", 1), ("New", 20)] {
        engine
            .add_expense(
                ExpenseCmd::new(
                    &group_id,
                    "alice",
                    title,
                    MoneyCents::new(30_00),
                    NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
                    Utc::now(),
                )
                .payer("alice", MoneyCents::new(30_00)),
            )
            .await
            .unwrap();
    }

    let expenses = engine.list_expenses(&group_id, "carol").await.unwrap();
    let titles: Vec<&str> = expenses.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["New", "Old"]);
}
