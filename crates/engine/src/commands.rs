//! Command structs for engine operations.
//!
//! These types group parameters for expense submission, keeping call sites
//! readable and avoiding long argument lists.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{MoneyCents, SplitMode};

/// How to divide an expense: the mode plus custom shares when applicable.
#[derive(Clone, Debug)]
pub enum SplitSpec {
    Equal,
    Custom(BTreeMap<String, MoneyCents>),
}

impl SplitSpec {
    #[must_use]
    pub fn mode(&self) -> SplitMode {
        match self {
            Self::Equal => SplitMode::Equal,
            Self::Custom(_) => SplitMode::Custom,
        }
    }

    #[must_use]
    pub fn custom_shares(&self) -> Option<&BTreeMap<String, MoneyCents>> {
        match self {
            Self::Equal => None,
            Self::Custom(shares) => Some(shares),
        }
    }
}

/// Submit a shared expense.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: MoneyCents,
    pub expense_date: NaiveDate,
    /// Who put money down, and how much each. Entries with a non-positive
    /// amount are dropped; the rest must sum to `amount` within tolerance.
    pub payers: BTreeMap<String, MoneyCents>,
    pub split: SplitSpec,
    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        amount: MoneyCents,
        expense_date: NaiveDate,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            title: title.into(),
            description: None,
            amount,
            expense_date,
            payers: BTreeMap::new(),
            split: SplitSpec::Equal,
            user_id: user_id.into(),
            submitted_at,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn payer(mut self, user_id: impl Into<String>, paid: MoneyCents) -> Self {
        self.payers.insert(user_id.into(), paid);
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitSpec) -> Self {
        self.split = split;
        self
    }
}
