//! Settlements API endpoints
//!
//! All lifecycle routes act on a settlement the caller is a party to; the
//! engine answers non-parties with the same 404 as a missing id.

use api_types::settlement::{
    PaymentNew, PaymentRecorded, SettlementList, SettlementListResponse,
    SettlementStatus as ApiStatus, SettlementView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState};
use engine::{MoneyCents, Settlement, SettlementStatus, users};

fn map_status(status: SettlementStatus) -> ApiStatus {
    match status {
        SettlementStatus::Pending => ApiStatus::Pending,
        SettlementStatus::Partial => ApiStatus::Partial,
        SettlementStatus::AwaitingConfirmation => ApiStatus::AwaitingConfirmation,
        SettlementStatus::CancelRequest => ApiStatus::CancelRequest,
        SettlementStatus::Paid => ApiStatus::Paid,
        SettlementStatus::Cancelled => ApiStatus::Cancelled,
    }
}

fn map_settlement(settlement: Settlement) -> SettlementView {
    SettlementView {
        id: settlement.id,
        group_id: settlement.group_id,
        paid_by: settlement.paid_by,
        paid_to: settlement.paid_to,
        amount_cents: settlement.amount.cents(),
        partial_paid_cents: settlement.partial_paid.cents(),
        status: map_status(settlement.status),
        created_at: settlement.created_at,
        updated_at: settlement.updated_at,
        settled_at: settlement.settled_at,
    }
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<SettlementList>,
) -> Result<Json<SettlementListResponse>, ServerError> {
    let settlements = state
        .engine
        .settlements_for_user(&user.username, payload.group_id.as_deref())
        .await?;

    Ok(Json(SettlementListResponse {
        settlements: settlements.into_iter().map(map_settlement).collect(),
    }))
}

pub async fn record_payment(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<PaymentNew>,
) -> Result<Json<PaymentRecorded>, ServerError> {
    let status = state
        .engine
        .record_payment(
            &id,
            &user.username,
            MoneyCents::new(payload.amount_cents),
            Utc::now(),
        )
        .await?;

    Ok(Json(PaymentRecorded {
        status: map_status(status),
    }))
}

pub async fn mark_paid(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.mark_paid(&id, &user.username, Utc::now()).await?;
    Ok(StatusCode::OK)
}

pub async fn confirm(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.confirm(&id, &user.username, Utc::now()).await?;
    Ok(StatusCode::OK)
}

pub async fn request_cancel(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .request_cancel(&id, &user.username, Utc::now())
        .await?;
    Ok(StatusCode::OK)
}

pub async fn approve_cancel(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .approve_cancel(&id, &user.username, Utc::now())
        .await?;
    Ok(StatusCode::OK)
}

pub async fn reject_cancel(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .reject_cancel(&id, &user.username, Utc::now())
        .await?;
    Ok(StatusCode::OK)
}

pub async fn remind(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .send_reminder(&id, &user.username, Utc::now())
        .await?;
    Ok(StatusCode::OK)
}
