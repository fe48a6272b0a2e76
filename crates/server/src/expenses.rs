//! Expenses API endpoints

use std::collections::BTreeMap;

use api_types::expense::{
    ExpenseCreated, ExpenseDetailResponse, ExpenseGet, ExpenseList, ExpenseListResponse,
    ExpenseNew, ExpenseShareView, ExpenseView, SplitType,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState};
use engine::{ExpenseCmd, MoneyCents, SplitSpec, users};

fn map_expense(expense: engine::Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        title: expense.title,
        description: expense.description,
        amount_cents: expense.amount.cents(),
        expense_date: expense.expense_date,
        created_by: expense.created_by,
        created_at: expense.created_at,
    }
}

fn map_shares(shares: Vec<(String, MoneyCents)>) -> Vec<ExpenseShareView> {
    shares
        .into_iter()
        .map(|(user_id, amount)| ExpenseShareView {
            user_id,
            amount_cents: amount.cents(),
        })
        .collect()
}

pub async fn expense_new(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    let split = match payload.split_type {
        SplitType::Equal => SplitSpec::Equal,
        SplitType::Custom => {
            let shares: BTreeMap<String, MoneyCents> = payload
                .custom_shares
                .ok_or_else(|| {
                    ServerError::Generic("custom split requires custom_shares".to_string())
                })?
                .into_iter()
                .map(|(user_id, cents)| (user_id, MoneyCents::new(cents)))
                .collect();
            SplitSpec::Custom(shares)
        }
    };

    let mut cmd = ExpenseCmd::new(
        payload.group_id,
        user.username.clone(),
        payload.title,
        MoneyCents::new(payload.amount_cents),
        payload.expense_date,
        Utc::now(),
    )
    .split(split);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    for (payer, cents) in payload.payers {
        cmd = cmd.payer(payer, MoneyCents::new(cents));
    }

    let id = state.engine.add_expense(cmd).await?;

    Ok((StatusCode::CREATED, Json(ExpenseCreated { id })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<ExpenseList>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let expenses = state
        .engine
        .list_expenses(&payload.group_id, &user.username)
        .await?;

    Ok(Json(ExpenseListResponse {
        expenses: expenses.into_iter().map(map_expense).collect(),
    }))
}

pub async fn get_detail(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseGet>,
) -> Result<Json<ExpenseDetailResponse>, ServerError> {
    let (expense, payers, splits) = state
        .engine
        .expense_detail(&payload.group_id, payload.id, &user.username)
        .await?;

    Ok(Json(ExpenseDetailResponse {
        expense: map_expense(expense),
        payers: map_shares(payers),
        splits: map_shares(splits),
    }))
}
