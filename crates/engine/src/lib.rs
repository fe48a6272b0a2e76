//! Expense-split and settlement-netting engine.
//!
//! Members of a group record shared expenses; the engine computes each
//! member's owed share, folds the result into the group's pairwise net debts
//! and keeps one active settlement per debtor/creditor pair, which the two
//! parties then drive through a confirmation lifecycle.
//!
//! The pure pieces — [`compute_splits`], [`net_positions`] and
//! [`match_transfers`] — are plain functions over [`MoneyCents`] maps. The
//! [`Engine`] wires them to the database: expense submission runs the whole
//! pipeline inside a single transaction, settlement transitions use
//! optimistic status re-checks, and notifications go out only after commit.

pub use commands::{ExpenseCmd, SplitSpec};
pub use error::EngineError;
pub use expenses::Expense;
pub use groups::Group;
pub use matcher::{Transfer, match_transfers};
pub use money::MoneyCents;
pub use notifications::PendingNotification;
pub use ops::{Engine, EngineBuilder};
pub use positions::net_positions;
pub use settlements::{Settlement, SettlementStatus};
pub use split::{SplitMode, compute_splits};

mod commands;
mod error;
pub mod expense_payers;
pub mod expense_splits;
pub mod expenses;
pub mod group_members;
pub mod groups;
mod matcher;
mod money;
pub mod notifications;
mod ops;
mod positions;
pub mod settlements;
mod split;
pub mod users;

pub(crate) type ResultEngine<T> = Result<T, EngineError>;
