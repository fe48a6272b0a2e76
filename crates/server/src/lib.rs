use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod expenses;
mod groups;
mod notifications;
mod server;
mod settlements;

pub mod types {
    pub mod group {
        pub use api_types::group::{GroupCreated, GroupNew, GroupView};
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseCreated, ExpenseDetailResponse, ExpenseListResponse, ExpenseNew, ExpenseView,
            SplitType,
        };
    }

    pub mod settlement {
        pub use api_types::settlement::{
            PaymentNew, PaymentRecorded, SettlementListResponse, SettlementStatus, SettlementView,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        // Both mean "the row is not what you thought": retry after re-reading.
        EngineError::ExistingKey(_) | EngineError::StaleState(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidSplit(_)
        | EngineError::SplitMismatch { .. }
        | EngineError::Overpayment { .. }
        | EngineError::InvalidTransition(_)
        | EngineError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::MoneyCents;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res =
            ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_stale_state_maps_to_409() {
        let res = ServerError::from(EngineError::StaleState("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_overpayment_maps_to_422() {
        let res = ServerError::from(EngineError::Overpayment {
            remaining: MoneyCents::new(20_00),
            attempted: MoneyCents::new(25_00),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_split_mismatch_maps_to_422() {
        let res = ServerError::from(EngineError::SplitMismatch {
            expected: MoneyCents::new(100_00),
            provided: MoneyCents::new(80_00),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
