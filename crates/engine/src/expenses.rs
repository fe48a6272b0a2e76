//! Expense primitives.
//!
//! An `Expense` is an immutable record of a shared cost. Who paid what lives
//! in `expense_payers`, who owes what in `expense_splits`; the expense row
//! itself is never mutated after insertion and disappears only when its group
//! is deleted (FK cascade).

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: MoneyCents,
    pub expense_date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        group_id: String,
        title: String,
        description: Option<String>,
        amount: MoneyCents,
        expense_date: NaiveDate,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            title,
            description,
            amount,
            expense_date,
            created_by,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub expense_date: Date,
    pub created_by: String,
    pub created_at: DateTimeUtc,
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
    #[sea_orm(has_many = "super::expense_payers::Entity")]
    ExpensePayers,
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    ExpenseSplits,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_payers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpensePayers.def()
    }
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            title: ActiveValue::Set(expense.title.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_cents: ActiveValue::Set(expense.amount.cents()),
            expense_date: ActiveValue::Set(expense.expense_date),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?,
            group_id: model.group_id,
            title: model.title,
            description: model.description,
            amount: MoneyCents::new(model.amount_cents),
            expense_date: model.expense_date,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
