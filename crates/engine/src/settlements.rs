//! Settlement primitives.
//!
//! A `Settlement` is the running pairwise debt instrument between a debtor
//! (`paid_by`) and a creditor (`paid_to`) inside a group. While a settlement
//! is in an active status it is the *only* active row for its ordered pair —
//! the ledger merge keeps that invariant, not a database constraint. Terminal
//! rows (`paid`, `cancelled`) are immutable history.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Created by the ledger; nothing paid yet.
    Pending,
    /// Partially paid.
    Partial,
    /// Full amount recorded; waiting for the creditor to confirm receipt.
    AwaitingConfirmation,
    /// A party asked to cancel; waiting for the creditor to decide.
    CancelRequest,
    /// Confirmed by the creditor. Terminal.
    Paid,
    /// Cancellation approved by the creditor. Terminal.
    Cancelled,
}

impl SettlementStatus {
    /// Statuses that occupy the (group, debtor, creditor) slot.
    pub const ACTIVE: [SettlementStatus; 4] = [
        Self::Pending,
        Self::Partial,
        Self::AwaitingConfirmation,
        Self::CancelRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::CancelRequest => "cancel_request",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Statuses a payment may be recorded from.
    #[must_use]
    pub fn accepts_payment(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "awaiting_confirmation" => Ok(Self::AwaitingConfirmation),
            "cancel_request" => Ok(Self::CancelRequest),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidTransition(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: String,
    /// Debtor: the member who owes.
    pub paid_by: String,
    /// Creditor: the member owed to. Only this party may confirm receipt or
    /// decide a cancellation.
    pub paid_to: String,
    pub amount: MoneyCents,
    pub partial_paid: MoneyCents,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// A freshly matched settlement always starts `pending`: a balance change
    /// is never considered moved money until both parties have gone through
    /// the confirmation flow.
    pub fn new(
        group_id: String,
        paid_by: String,
        paid_to: String,
        amount: MoneyCents,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            paid_by,
            paid_to,
            amount,
            partial_paid: MoneyCents::ZERO,
            status: SettlementStatus::Pending,
            created_at: now,
            updated_at: now,
            settled_at: None,
        }
    }

    /// Amount still unpaid.
    #[must_use]
    pub fn remaining(&self) -> MoneyCents {
        self.amount - self.partial_paid
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub paid_by: String,
    pub paid_to: String,
    pub amount_cents: i64,
    pub partial_paid_cents: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub settled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            group_id: ActiveValue::Set(settlement.group_id.clone()),
            paid_by: ActiveValue::Set(settlement.paid_by.clone()),
            paid_to: ActiveValue::Set(settlement.paid_to.clone()),
            amount_cents: ActiveValue::Set(settlement.amount.cents()),
            partial_paid_cents: ActiveValue::Set(settlement.partial_paid.cents()),
            status: ActiveValue::Set(settlement.status.as_str().to_string()),
            created_at: ActiveValue::Set(settlement.created_at),
            updated_at: ActiveValue::Set(settlement.updated_at),
            settled_at: ActiveValue::Set(settlement.settled_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("settlement not exists".to_string()))?,
            group_id: model.group_id,
            paid_by: model.paid_by,
            paid_to: model.paid_to,
            amount: MoneyCents::new(model.amount_cents),
            partial_paid: MoneyCents::new(model.partial_paid_cents),
            status: SettlementStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
            settled_at: model.settled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_strings() {
        for status in [
            SettlementStatus::Pending,
            SettlementStatus::Partial,
            SettlementStatus::AwaitingConfirmation,
            SettlementStatus::CancelRequest,
            SettlementStatus::Paid,
            SettlementStatus::Cancelled,
        ] {
            assert_eq!(SettlementStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(SettlementStatus::try_from("settled").is_err());
    }

    #[test]
    fn terminal_statuses_are_not_active() {
        assert!(SettlementStatus::Pending.is_active());
        assert!(SettlementStatus::CancelRequest.is_active());
        assert!(!SettlementStatus::Paid.is_active());
        assert!(!SettlementStatus::Cancelled.is_active());
    }

    #[test]
    fn payments_only_from_pending_or_partial() {
        assert!(SettlementStatus::Pending.accepts_payment());
        assert!(SettlementStatus::Partial.accepts_payment());
        assert!(!SettlementStatus::AwaitingConfirmation.accepts_payment());
        assert!(!SettlementStatus::CancelRequest.accepts_payment());
        assert!(!SettlementStatus::Paid.accepts_payment());
    }

    #[test]
    fn remaining_subtracts_partial_payments() {
        let mut settlement = Settlement::new(
            "group".to_string(),
            "bob".to_string(),
            "alice".to_string(),
            MoneyCents::new(50_00),
            Utc::now(),
        );
        settlement.partial_paid = MoneyCents::new(20_00);
        assert_eq!(settlement.remaining(), MoneyCents::new(30_00));
    }
}
