//! Settlement ledger and lifecycle operations.
//!
//! The ledger half (`apply_transfer`) folds matcher output into the running
//! pairwise debts: same-direction transfers accumulate, opposite-direction
//! transfers net against each other, and an exact cancellation deletes the
//! row. The lifecycle half moves a settlement through its confirmation state
//! machine. Both parties share the row; only the creditor (`paid_to`) may
//! finalize anything.
//!
//! Every status change is a guarded `UPDATE ... WHERE status = <observed>`:
//! zero affected rows means another request moved the row first and the
//! caller gets [`EngineError::StaleState`] to re-read and retry.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, MoneyCents, PendingNotification, ResultEngine, Settlement, SettlementStatus,
    Transfer, settlements,
};

use super::{Engine, with_tx};

const SETTLEMENTS_LINK: &str = "/settlements";

impl Engine {
    /// Finds the single active row for the ordered (debtor, creditor) pair.
    async fn find_active_settlement(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        paid_by: &str,
        paid_to: &str,
    ) -> ResultEngine<Option<settlements::Model>> {
        let statuses: Vec<&str> = SettlementStatus::ACTIVE
            .iter()
            .map(|s| s.as_str())
            .collect();
        settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .filter(settlements::Column::PaidBy.eq(paid_by.to_string()))
            .filter(settlements::Column::PaidTo.eq(paid_to.to_string()))
            .filter(settlements::Column::Status.is_in(statuses))
            .one(db_tx)
            .await
            .map_err(Into::into)
    }

    /// Merges one matched transfer into the ledger.
    ///
    /// Runs inside the expense-submission transaction. Rows created or
    /// touched here always stay in a status that still requires confirmation
    /// (`pending` for new rows) — a balance change never jumps straight to
    /// `paid`.
    pub(super) async fn apply_transfer(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        transfer: &Transfer,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        // Same direction: accumulate onto the existing debt.
        if let Some(forward) = self
            .find_active_settlement(db_tx, group_id, &transfer.debtor, &transfer.creditor)
            .await?
        {
            let new_amount = MoneyCents::new(forward.amount_cents) + transfer.amount;
            settlements::ActiveModel {
                id: ActiveValue::Set(forward.id),
                amount_cents: ActiveValue::Set(new_amount.cents()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .update(db_tx)
            .await?;
            return Ok(());
        }

        // Opposite direction: net against the reverse debt.
        if let Some(reverse) = self
            .find_active_settlement(db_tx, group_id, &transfer.creditor, &transfer.debtor)
            .await?
        {
            let reverse_amount = MoneyCents::new(reverse.amount_cents);

            if reverse_amount.approx_eq(transfer.amount) {
                // Fully netted; no debt remains in either direction.
                settlements::Entity::delete_by_id(reverse.id).exec(db_tx).await?;
            } else if reverse_amount > transfer.amount {
                let new_amount = reverse_amount - transfer.amount;
                settlements::ActiveModel {
                    id: ActiveValue::Set(reverse.id),
                    amount_cents: ActiveValue::Set(new_amount.cents()),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;
            } else {
                settlements::Entity::delete_by_id(reverse.id).exec(db_tx).await?;
                let settlement = Settlement::new(
                    group_id.to_string(),
                    transfer.debtor.clone(),
                    transfer.creditor.clone(),
                    transfer.amount - reverse_amount,
                    now,
                );
                settlements::ActiveModel::from(&settlement)
                    .insert(db_tx)
                    .await?;
            }
            return Ok(());
        }

        let settlement = Settlement::new(
            group_id.to_string(),
            transfer.debtor.clone(),
            transfer.creditor.clone(),
            transfer.amount,
            now,
        );
        settlements::ActiveModel::from(&settlement)
            .insert(db_tx)
            .await?;
        Ok(())
    }

    /// Guarded status update: the row must still be in the status the caller
    /// observed, otherwise a concurrent transition won and we bail with
    /// `StaleState`.
    async fn transition_settlement(
        &self,
        db_tx: &DatabaseTransaction,
        settlement_id: &str,
        observed: SettlementStatus,
        to: SettlementStatus,
        partial_paid: Option<MoneyCents>,
        settled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let mut update = settlements::Entity::update_many()
            .col_expr(settlements::Column::Status, Expr::value(to.as_str()))
            .col_expr(settlements::Column::UpdatedAt, Expr::value(now));
        if let Some(paid) = partial_paid {
            update = update.col_expr(
                settlements::Column::PartialPaidCents,
                Expr::value(paid.cents()),
            );
        }
        if let Some(at) = settled_at {
            update = update.col_expr(settlements::Column::SettledAt, Expr::value(at));
        }

        let result = update
            .filter(settlements::Column::Id.eq(settlement_id.to_string()))
            .filter(settlements::Column::Status.eq(observed.as_str()))
            .exec(db_tx)
            .await?;

        if result.rows_affected == 0 {
            return Err(EngineError::StaleState(
                "settlement was modified by another request".to_string(),
            ));
        }
        Ok(())
    }

    /// Records a (possibly partial) payment against a settlement.
    ///
    /// Either party may record; reaching the full amount moves the row to
    /// `awaiting_confirmation` with the paid amount clamped to exactly the
    /// total, so repeated cent-level residues cannot accumulate. Paying more
    /// than the remaining balance is rejected with both amounts attached.
    pub async fn record_payment(
        &self,
        settlement_id: &str,
        user_id: &str,
        amount: MoneyCents,
        now: DateTime<Utc>,
    ) -> ResultEngine<SettlementStatus> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }

        let (status, pending) = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if !settlement.status.accepts_payment() {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot record a payment while {}",
                    settlement.status.as_str()
                )));
            }

            let total = settlement.amount;
            let new_paid = settlement.partial_paid + amount;
            if new_paid > total + MoneyCents::TOLERANCE {
                return Err(EngineError::Overpayment {
                    remaining: settlement.remaining(),
                    attempted: amount,
                });
            }

            let (new_status, new_paid) = if new_paid.approx_eq(total) {
                (SettlementStatus::AwaitingConfirmation, total)
            } else {
                (SettlementStatus::Partial, new_paid)
            };

            self.transition_settlement(
                &db_tx,
                settlement_id,
                settlement.status,
                new_status,
                Some(new_paid),
                None,
                now,
            )
            .await?;

            let payer = &settlement.paid_by;
            let receiver = &settlement.paid_to;
            let pending = if new_status == SettlementStatus::AwaitingConfirmation {
                vec![
                    PendingNotification::new(
                        receiver,
                        format!("{payer} completed full payment of {total} - please confirm receipt"),
                        SETTLEMENTS_LINK,
                    ),
                    PendingNotification::new(
                        payer,
                        format!("You completed payment of {total} to {receiver}"),
                        SETTLEMENTS_LINK,
                    ),
                ]
            } else {
                let remaining = total - new_paid;
                vec![
                    PendingNotification::new(
                        receiver,
                        format!("{payer} paid {amount} ({remaining} remaining)"),
                        SETTLEMENTS_LINK,
                    ),
                    PendingNotification::new(
                        payer,
                        format!("You paid {amount} to {receiver} ({remaining} remaining)"),
                        SETTLEMENTS_LINK,
                    ),
                ]
            };

            Ok((new_status, pending))
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(status)
    }

    /// Marks the full amount as paid, requesting the counter-party's
    /// confirmation.
    ///
    /// Either party may initiate; the state always becomes
    /// `awaiting_confirmation` and only the creditor's `confirm` finalizes
    /// it. Confirmation is required from the counter-party no matter who
    /// starts the flow.
    pub async fn mark_paid(
        &self,
        settlement_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let pending = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if !settlement.status.accepts_payment() {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot mark as paid while {}",
                    settlement.status.as_str()
                )));
            }

            self.transition_settlement(
                &db_tx,
                settlement_id,
                settlement.status,
                SettlementStatus::AwaitingConfirmation,
                None,
                None,
                now,
            )
            .await?;

            let amount = settlement.amount;
            let payer = &settlement.paid_by;
            let receiver = &settlement.paid_to;
            let pending = if user_id == settlement.paid_by {
                vec![
                    PendingNotification::new(
                        receiver,
                        format!("{payer} marked {amount} as paid - please confirm receipt"),
                        SETTLEMENTS_LINK,
                    ),
                    PendingNotification::new(
                        payer,
                        format!("You marked {amount} as paid, waiting for {receiver} to confirm"),
                        SETTLEMENTS_LINK,
                    ),
                ]
            } else {
                vec![
                    PendingNotification::new(
                        payer,
                        format!("{receiver} marked {amount} as received - please verify the payment"),
                        SETTLEMENTS_LINK,
                    ),
                    PendingNotification::new(
                        receiver,
                        format!("You marked {amount} as received, waiting for {payer} to verify"),
                        SETTLEMENTS_LINK,
                    ),
                ]
            };

            Ok(pending)
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(())
    }

    /// Creditor confirms receipt; the settlement becomes terminal `paid`.
    pub async fn confirm(
        &self,
        settlement_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let pending = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if settlement.status != SettlementStatus::AwaitingConfirmation {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot confirm while {}",
                    settlement.status.as_str()
                )));
            }
            if user_id != settlement.paid_to {
                return Err(EngineError::Forbidden(
                    "only the payment receiver can confirm this settlement".to_string(),
                ));
            }

            self.transition_settlement(
                &db_tx,
                settlement_id,
                settlement.status,
                SettlementStatus::Paid,
                None,
                Some(now),
                now,
            )
            .await?;

            let amount = settlement.amount;
            let payer = &settlement.paid_by;
            let receiver = &settlement.paid_to;
            Ok(vec![
                PendingNotification::new(
                    payer,
                    format!("Settlement of {amount} with {receiver} confirmed and completed"),
                    SETTLEMENTS_LINK,
                ),
                PendingNotification::new(
                    receiver,
                    format!("You confirmed receiving {amount} from {payer}"),
                    SETTLEMENTS_LINK,
                ),
            ])
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(())
    }

    /// Either party asks to cancel an unpaid settlement.
    pub async fn request_cancel(
        &self,
        settlement_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let pending = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if !settlement.status.accepts_payment() {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot request cancellation while {}",
                    settlement.status.as_str()
                )));
            }

            self.transition_settlement(
                &db_tx,
                settlement_id,
                settlement.status,
                SettlementStatus::CancelRequest,
                None,
                None,
                now,
            )
            .await?;

            let amount = settlement.amount;
            let other = if user_id == settlement.paid_by {
                &settlement.paid_to
            } else {
                &settlement.paid_by
            };
            Ok(vec![
                PendingNotification::new(
                    other,
                    format!("{user_id} requested cancellation of the {amount} settlement"),
                    SETTLEMENTS_LINK,
                ),
                PendingNotification::new(
                    user_id,
                    format!("You requested cancellation of the {amount} settlement"),
                    SETTLEMENTS_LINK,
                ),
            ])
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(())
    }

    /// Creditor approves a cancellation request; the settlement becomes
    /// terminal `cancelled`.
    pub async fn approve_cancel(
        &self,
        settlement_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let pending = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if settlement.status != SettlementStatus::CancelRequest {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot approve cancellation while {}",
                    settlement.status.as_str()
                )));
            }
            if user_id != settlement.paid_to {
                return Err(EngineError::Forbidden(
                    "only the payment receiver can approve cancellation requests".to_string(),
                ));
            }

            self.transition_settlement(
                &db_tx,
                settlement_id,
                settlement.status,
                SettlementStatus::Cancelled,
                None,
                Some(now),
                now,
            )
            .await?;

            let amount = settlement.amount;
            let payer = &settlement.paid_by;
            let receiver = &settlement.paid_to;
            Ok(vec![
                PendingNotification::new(
                    payer,
                    format!("Settlement of {amount} with {receiver} has been cancelled"),
                    SETTLEMENTS_LINK,
                ),
                PendingNotification::new(
                    receiver,
                    format!("You cancelled the settlement of {amount} with {payer}"),
                    SETTLEMENTS_LINK,
                ),
            ])
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(())
    }

    /// Creditor rejects a cancellation request; the settlement reverts to
    /// `pending` with its amounts untouched.
    pub async fn reject_cancel(
        &self,
        settlement_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let pending = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if settlement.status != SettlementStatus::CancelRequest {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot reject cancellation while {}",
                    settlement.status.as_str()
                )));
            }
            if user_id != settlement.paid_to {
                return Err(EngineError::Forbidden(
                    "only the payment receiver can reject cancellation requests".to_string(),
                ));
            }

            self.transition_settlement(
                &db_tx,
                settlement_id,
                settlement.status,
                SettlementStatus::Pending,
                None,
                None,
                now,
            )
            .await?;

            let amount = settlement.amount;
            let payer = &settlement.paid_by;
            let receiver = &settlement.paid_to;
            Ok(vec![
                PendingNotification::new(
                    payer,
                    format!("Your cancellation request for {amount} was rejected by {receiver}"),
                    SETTLEMENTS_LINK,
                ),
                PendingNotification::new(
                    receiver,
                    format!("You rejected the cancellation request for {amount} from {payer}"),
                    SETTLEMENTS_LINK,
                ),
            ])
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(())
    }

    /// Creditor nudges the debtor about the outstanding balance. No state
    /// change.
    pub async fn send_reminder(
        &self,
        settlement_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let pending = with_tx!(self, |db_tx| {
            let model = self
                .require_settlement_party(&db_tx, settlement_id, user_id)
                .await?;
            let settlement = Settlement::try_from(model)?;

            if !settlement.status.accepts_payment() {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot send a reminder while {}",
                    settlement.status.as_str()
                )));
            }
            if user_id != settlement.paid_to {
                return Err(EngineError::Forbidden(
                    "only the payment receiver can send reminders".to_string(),
                ));
            }

            let remaining = settlement.remaining();
            let payer = &settlement.paid_by;
            let receiver = &settlement.paid_to;
            Ok(vec![
                PendingNotification::new(
                    payer,
                    format!("Reminder: you still owe {remaining} to {receiver}"),
                    SETTLEMENTS_LINK,
                ),
                PendingNotification::new(
                    receiver,
                    format!("You sent a reminder to {payer} for {remaining}"),
                    SETTLEMENTS_LINK,
                ),
            ])
        })?;

        self.deliver_notifications(pending, now).await;
        Ok(())
    }

    /// Lists the settlements the user is a party to, most recently updated
    /// first, optionally narrowed to one group.
    pub async fn settlements_for_user(
        &self,
        user_id: &str,
        group_id: Option<&str>,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            let mut query = settlements::Entity::find()
                .filter(
                    Condition::any()
                        .add(settlements::Column::PaidBy.eq(user_id.to_string()))
                        .add(settlements::Column::PaidTo.eq(user_id.to_string())),
                )
                .order_by_desc(settlements::Column::UpdatedAt);
            if let Some(group_id) = group_id {
                query = query.filter(settlements::Column::GroupId.eq(group_id.to_string()));
            }

            let rows = query.all(&db_tx).await?;
            rows.into_iter().map(Settlement::try_from).collect()
        })
    }

    /// Lists every settlement of a group, most recently updated first
    /// (members only).
    pub async fn group_settlements(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let rows = settlements::Entity::find()
                .filter(settlements::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(settlements::Column::UpdatedAt)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Settlement::try_from).collect()
        })
    }
}
