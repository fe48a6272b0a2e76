//! Expense share computation.
//!
//! Turns an expense total plus a split mode into the amount each group member
//! owes. This is pure: persistence and membership checks live in the ops
//! layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

/// How an expense total is divided among the group members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Every member owes the same rounded share.
    Equal,
    /// The caller supplies a share per member.
    Custom,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for SplitMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidSplit(format!(
                "invalid split mode: {other}"
            ))),
        }
    }
}

/// Computes the owed amount per member for an expense.
///
/// `members` is the caller-supplied stable ordering (ascending username, as
/// produced by the membership query). For equal splits the rounding remainder
/// — positive or negative — is added entirely to the *first* member of that
/// ordering so the shares sum to `total` exactly. Pinning the remainder to one
/// designated member is arbitrary but reproducible: the same expense always
/// yields the same shares.
///
/// For custom splits, entries with a share ≤ 0 are dropped, every remaining
/// share must belong to a listed member, and the share sum must match `total`
/// within [`MoneyCents::TOLERANCE`].
pub fn compute_splits(
    total: MoneyCents,
    mode: SplitMode,
    members: &[String],
    custom_shares: Option<&BTreeMap<String, MoneyCents>>,
) -> ResultEngine<BTreeMap<String, MoneyCents>> {
    if members.is_empty() {
        return Err(EngineError::InvalidSplit(
            "group has no members to split between".to_string(),
        ));
    }

    match mode {
        SplitMode::Equal => {
            let n = members.len() as i64;
            // Round half up on the cent, matching how shares are presented to
            // users ("33.33" of 100.00 across three).
            let share = MoneyCents::new((total.cents() * 2 + n) / (2 * n));
            let remainder = total - MoneyCents::new(share.cents() * n);

            let mut splits: BTreeMap<String, MoneyCents> = BTreeMap::new();
            for (index, user_id) in members.iter().enumerate() {
                let mut owed = share;
                if index == 0 {
                    owed += remainder;
                }
                splits.insert(user_id.clone(), owed);
            }
            Ok(splits)
        }
        SplitMode::Custom => {
            let shares = custom_shares.ok_or_else(|| {
                EngineError::InvalidSplit("custom split requires shares".to_string())
            })?;

            let mut splits: BTreeMap<String, MoneyCents> = BTreeMap::new();
            let mut provided = MoneyCents::ZERO;
            for (user_id, share) in shares {
                if !share.is_positive() {
                    continue;
                }
                if !members.iter().any(|m| m == user_id) {
                    return Err(EngineError::InvalidSplit(format!(
                        "share for {user_id}, who is not a group member"
                    )));
                }
                provided += *share;
                splits.insert(user_id.clone(), *share);
            }

            if splits.is_empty() {
                return Err(EngineError::InvalidSplit(
                    "custom split requires at least one positive share".to_string(),
                ));
            }
            if !provided.approx_eq(total) {
                return Err(EngineError::SplitMismatch {
                    expected: total,
                    provided,
                });
            }
            Ok(splits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn equal_split_is_cent_exact() {
        let splits = compute_splits(
            MoneyCents::new(100_00),
            SplitMode::Equal,
            &members(&["alice", "bob", "carol"]),
            None,
        )
        .unwrap();

        assert_eq!(splits["alice"], MoneyCents::new(33_34));
        assert_eq!(splits["bob"], MoneyCents::new(33_33));
        assert_eq!(splits["carol"], MoneyCents::new(33_33));

        let sum: i64 = splits.values().map(|v| v.cents()).sum();
        assert_eq!(sum, 100_00);
    }

    #[test]
    fn equal_split_negative_remainder_lands_on_first_member() {
        // 1.00 over 3 members: share rounds to 0.33, remainder +0.01.
        // 2.00 over 3 members: share rounds to 0.67, remainder -0.01.
        let splits = compute_splits(
            MoneyCents::new(2_00),
            SplitMode::Equal,
            &members(&["alice", "bob", "carol"]),
            None,
        )
        .unwrap();

        assert_eq!(splits["alice"], MoneyCents::new(66));
        assert_eq!(splits["bob"], MoneyCents::new(67));
        assert_eq!(splits["carol"], MoneyCents::new(67));

        let sum: i64 = splits.values().map(|v| v.cents()).sum();
        assert_eq!(sum, 2_00);
    }

    #[test]
    fn equal_split_same_ordering_same_shares() {
        let a = compute_splits(
            MoneyCents::new(99_99),
            SplitMode::Equal,
            &members(&["alice", "bob", "carol", "dave"]),
            None,
        )
        .unwrap();
        let b = compute_splits(
            MoneyCents::new(99_99),
            SplitMode::Equal,
            &members(&["alice", "bob", "carol", "dave"]),
            None,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_split_accepts_matching_shares() {
        let mut shares = BTreeMap::new();
        shares.insert("alice".to_string(), MoneyCents::new(70_00));
        shares.insert("bob".to_string(), MoneyCents::new(30_00));

        let splits = compute_splits(
            MoneyCents::new(100_00),
            SplitMode::Custom,
            &members(&["alice", "bob", "carol"]),
            Some(&shares),
        )
        .unwrap();

        assert_eq!(splits.len(), 2);
        assert_eq!(splits["alice"], MoneyCents::new(70_00));
        assert!(!splits.contains_key("carol"));
    }

    #[test]
    fn custom_split_drops_non_positive_shares() {
        let mut shares = BTreeMap::new();
        shares.insert("alice".to_string(), MoneyCents::new(100_00));
        shares.insert("bob".to_string(), MoneyCents::ZERO);
        shares.insert("carol".to_string(), MoneyCents::new(-5_00));

        let splits = compute_splits(
            MoneyCents::new(100_00),
            SplitMode::Custom,
            &members(&["alice", "bob", "carol"]),
            Some(&shares),
        )
        .unwrap();

        assert_eq!(splits.len(), 1);
        assert_eq!(splits["alice"], MoneyCents::new(100_00));
    }

    #[test]
    fn custom_split_mismatch_reports_both_totals() {
        let mut shares = BTreeMap::new();
        shares.insert("alice".to_string(), MoneyCents::new(40_00));
        shares.insert("bob".to_string(), MoneyCents::new(40_00));

        let err = compute_splits(
            MoneyCents::new(100_00),
            SplitMode::Custom,
            &members(&["alice", "bob"]),
            Some(&shares),
        )
        .unwrap_err();

        assert_eq!(
            err,
            EngineError::SplitMismatch {
                expected: MoneyCents::new(100_00),
                provided: MoneyCents::new(80_00),
            }
        );
    }

    #[test]
    fn custom_split_within_tolerance_is_accepted() {
        let mut shares = BTreeMap::new();
        shares.insert("alice".to_string(), MoneyCents::new(50_00));
        shares.insert("bob".to_string(), MoneyCents::new(49_99));

        let splits = compute_splits(
            MoneyCents::new(100_00),
            SplitMode::Custom,
            &members(&["alice", "bob"]),
            Some(&shares),
        )
        .unwrap();
        assert_eq!(splits.len(), 2);
    }

    #[test]
    fn custom_split_rejects_unknown_member() {
        let mut shares = BTreeMap::new();
        shares.insert("mallory".to_string(), MoneyCents::new(100_00));

        let err = compute_splits(
            MoneyCents::new(100_00),
            SplitMode::Custom,
            &members(&["alice", "bob"]),
            Some(&shares),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn empty_member_list_is_rejected() {
        let err = compute_splits(MoneyCents::new(10_00), SplitMode::Equal, &[], None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit(_)));
    }

    #[test]
    fn split_mode_round_trips_strings() {
        assert_eq!(SplitMode::try_from("equal").unwrap(), SplitMode::Equal);
        assert_eq!(SplitMode::try_from("custom").unwrap(), SplitMode::Custom);
        assert!(SplitMode::try_from("thirds").is_err());
    }
}
