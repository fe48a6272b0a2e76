//! Notification delivery and feed.
//!
//! Delivery is fire-and-forget: it runs *after* the operation's transaction
//! has committed, and a failed insert is logged and swallowed — a broken
//! notification must never undo a settlement change.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{EngineError, PendingNotification, ResultEngine, notifications};

use super::Engine;

impl Engine {
    pub(super) async fn deliver_notifications(
        &self,
        pending: Vec<PendingNotification>,
        now: DateTime<Utc>,
    ) {
        for notification in pending {
            let active = notifications::ActiveModel {
                user_id: ActiveValue::Set(notification.user_id.clone()),
                message: ActiveValue::Set(notification.message.clone()),
                link: ActiveValue::Set(notification.link.clone()),
                is_read: ActiveValue::Set(false),
                created_at: ActiveValue::Set(now),
                ..Default::default()
            };
            if let Err(err) = active.insert(&self.database).await {
                tracing::warn!(
                    user_id = %notification.user_id,
                    "failed to deliver notification: {err}"
                );
            }
        }
    }

    /// The user's notification feed, newest first.
    pub async fn notifications_for_user(
        &self,
        user_id: &str,
    ) -> ResultEngine<Vec<notifications::Model>> {
        notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
            .all(&self.database)
            .await
            .map_err(Into::into)
    }

    /// Marks one of the user's notifications as read.
    pub async fn mark_notification_read(
        &self,
        notification_id: i32,
        user_id: &str,
    ) -> ResultEngine<()> {
        let result = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::Id.eq(notification_id))
            .filter(notifications::Column::UserId.eq(user_id.to_string()))
            .exec(&self.database)
            .await?;

        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(
                "notification not exists".to_string(),
            ));
        }
        Ok(())
    }
}
