//! Expense submission and listing.
//!
//! `add_expense` is the engine's central pipeline: validate the payers,
//! compute the per-member shares, persist expense/payers/splits, derive net
//! positions, match them into transfers and fold each transfer into the
//! settlement ledger — all inside one transaction. A failure at any step
//! rolls back every row, so the ledger can never observe a half-applied
//! expense.

use std::collections::BTreeMap;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseCmd, MoneyCents, ResultEngine, expense_payers, expense_splits,
    expenses, matcher::match_transfers, positions::net_positions, split::compute_splits,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

impl Engine {
    /// Submits a shared expense and re-derives the group's settlements.
    pub async fn add_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Uuid> {
        let title = normalize_required_name(&cmd.title, "expense title")?;
        let description = normalize_optional_text(cmd.description.as_deref());
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense amount must be > 0".to_string(),
            ));
        }

        // Drop non-positive payer entries, then check conservation: the money
        // put down must match the expense total within tolerance.
        let mut payers: BTreeMap<String, MoneyCents> = BTreeMap::new();
        let mut total_paid = MoneyCents::ZERO;
        for (user_id, paid) in &cmd.payers {
            if paid.is_positive() {
                total_paid += *paid;
                payers.insert(user_id.clone(), *paid);
            }
        }
        if payers.is_empty() {
            return Err(EngineError::InvalidAmount(
                "at least one payer must pay a positive amount".to_string(),
            ));
        }
        if !total_paid.approx_eq(cmd.amount) {
            return Err(EngineError::SplitMismatch {
                expected: cmd.amount,
                provided: total_paid,
            });
        }

        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;

            let members = self.group_member_ids(&db_tx, &cmd.group_id).await?;
            let splits = compute_splits(
                cmd.amount,
                cmd.split.mode(),
                &members,
                cmd.split.custom_shares(),
            )?;

            let expense = Expense::new(
                cmd.group_id.clone(),
                title,
                description,
                cmd.amount,
                cmd.expense_date,
                cmd.user_id.clone(),
                cmd.submitted_at,
            )?;
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;

            for (user_id, paid) in &payers {
                expense_payers::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    expense_id: ActiveValue::Set(expense.id.to_string()),
                    user_id: ActiveValue::Set(user_id.clone()),
                    paid_cents: ActiveValue::Set(paid.cents()),
                }
                .insert(&db_tx)
                .await?;
            }

            for (user_id, owed) in &splits {
                expense_splits::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    expense_id: ActiveValue::Set(expense.id.to_string()),
                    user_id: ActiveValue::Set(user_id.clone()),
                    owed_cents: ActiveValue::Set(owed.cents()),
                }
                .insert(&db_tx)
                .await?;
            }

            // Transfers come out sorted by ascending debtor/creditor, so
            // concurrent submissions touch settlement rows in the same order.
            let net = net_positions(&payers, &splits);
            for transfer in match_transfers(&net) {
                self.apply_transfer(&db_tx, &cmd.group_id, &transfer, cmd.submitted_at)
                    .await?;
            }

            Ok(expense.id)
        })
    }

    /// Lists a group's expenses, newest first (members only).
    pub async fn list_expenses(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let rows = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(expenses::Column::ExpenseDate)
                .order_by_desc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            rows.into_iter().map(Expense::try_from).collect()
        })
    }

    /// Loads one expense with its payer and split rows (members only).
    pub async fn expense_detail(
        &self,
        group_id: &str,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<(Expense, Vec<(String, MoneyCents)>, Vec<(String, MoneyCents)>)> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let model = expenses::Entity::find_by_id(expense_id.to_string())
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
            let expense = Expense::try_from(model)?;

            let payer_rows = expense_payers::Entity::find()
                .filter(expense_payers::Column::ExpenseId.eq(expense_id.to_string()))
                .order_by_asc(expense_payers::Column::UserId)
                .all(&db_tx)
                .await?;
            let payers = payer_rows
                .into_iter()
                .map(|p| (p.user_id, MoneyCents::new(p.paid_cents)))
                .collect();

            let split_rows = expense_splits::Entity::find()
                .filter(expense_splits::Column::ExpenseId.eq(expense_id.to_string()))
                .order_by_asc(expense_splits::Column::UserId)
                .all(&db_tx)
                .await?;
            let splits = split_rows
                .into_iter()
                .map(|s| (s.user_id, MoneyCents::new(s.owed_cents)))
                .collect();

            Ok((expense, payers, splits))
        })
    }
}
