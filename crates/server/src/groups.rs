//! Group and membership API endpoints

use api_types::{
    group::{GroupCreated, GroupNew, GroupView},
    member::{MemberAdd, MemberList},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState};
use engine::users;

pub async fn group_new(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let id = state
        .engine
        .new_group(&payload.name, &user.username, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(GroupCreated { id })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<GroupView>>, ServerError> {
    let groups = state.engine.groups_for_user(&user.username).await?;

    Ok(Json(
        groups
            .into_iter()
            .map(|group| GroupView {
                id: group.id,
                name: group.name,
                created_by: group.created_by,
                created_at: group.created_at,
            })
            .collect(),
    ))
}

pub async fn list_members(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<MemberList>, ServerError> {
    let members = state.engine.group_members(&group_id, &user.username).await?;
    Ok(Json(MemberList { members }))
}

pub async fn add_member(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<MemberAdd>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .add_group_member(&group_id, &payload.username, &user.username)
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_member(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((group_id, username)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_group_member(&group_id, &username, &user.username)
        .await?;
    Ok(StatusCode::OK)
}
