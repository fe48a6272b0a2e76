//! The module contains the errors the engine can return.
//!
//! Validation errors that reject user input carry both the expected and the
//! provided amount so callers can render an actionable message:
//!
//! - [`SplitMismatch`] when shares or payer totals don't sum to the expense
//!   total.
//! - [`Overpayment`] when a recorded payment exceeds the remaining balance.
//!
//! [`StaleState`] is the only error callers are expected to retry: it means a
//! settlement row changed under a concurrent transition and the operation
//! should be re-read and re-attempted.
//!
//! [`SplitMismatch`]: EngineError::SplitMismatch
//! [`Overpayment`]: EngineError::Overpayment
//! [`StaleState`]: EngineError::StaleState
use sea_orm::DbErr;
use thiserror::Error;

use crate::MoneyCents;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Shares sum to {provided} but the expense total is {expected}")]
    SplitMismatch {
        expected: MoneyCents,
        provided: MoneyCents,
    },
    #[error("Payment of {attempted} exceeds remaining balance of {remaining}")]
    Overpayment {
        remaining: MoneyCents,
        attempted: MoneyCents,
    },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Stale settlement state: {0}")]
    StaleState(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (
                Self::SplitMismatch {
                    expected: ae,
                    provided: ap,
                },
                Self::SplitMismatch {
                    expected: be,
                    provided: bp,
                },
            ) => ae == be && ap == bp,
            (
                Self::Overpayment {
                    remaining: ar,
                    attempted: aa,
                },
                Self::Overpayment {
                    remaining: br,
                    attempted: ba,
                },
            ) => ar == br && aa == ba,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::StaleState(a), Self::StaleState(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
