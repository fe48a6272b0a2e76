//! Notification rows.
//!
//! Settlement transitions queue messages for both parties; the ops layer
//! inserts them only after the surrounding transaction commits, so a failed
//! delivery can never roll back a ledger change.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A message queued during an operation, delivered after commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingNotification {
    pub user_id: String,
    pub message: String,
    pub link: String,
}

impl PendingNotification {
    pub fn new(user_id: &str, message: String, link: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            message,
            link: link.to_string(),
        }
    }
}
