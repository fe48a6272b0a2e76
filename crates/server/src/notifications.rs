//! Notifications API endpoints

use api_types::notification::{NotificationListResponse, NotificationView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState};
use engine::users;

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<NotificationListResponse>, ServerError> {
    let rows = state.engine.notifications_for_user(&user.username).await?;

    Ok(Json(NotificationListResponse {
        notifications: rows
            .into_iter()
            .map(|row| NotificationView {
                id: row.id,
                message: row.message,
                link: row.link,
                is_read: row.is_read,
                created_at: row.created_at,
            })
            .collect(),
    }))
}

pub async fn mark_read(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .mark_notification_read(id, &user.username)
        .await?;
    Ok(StatusCode::OK)
}
