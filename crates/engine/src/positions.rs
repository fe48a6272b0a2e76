//! Net position aggregation.
//!
//! A member's net position for a single expense is `paid − owed`: positive
//! means the group owes them, negative means they owe the group. The sum over
//! all members is zero whenever the payer total matches the split total,
//! since every cent paid is owed by someone.

use std::collections::BTreeMap;

use crate::MoneyCents;

/// Folds payer and split maps into a signed net position per member.
///
/// Every split participant starts at `−owed`; each payer's contribution is
/// then added on top. A payer without a split row (which the expense pipeline
/// does not normally produce) gets an entry created at zero rather than being
/// dropped.
///
/// No rounding happens here; cents in, cents out. The `BTreeMap` keys keep
/// members in ascending username order, which downstream matching relies on.
pub fn net_positions(
    payers: &BTreeMap<String, MoneyCents>,
    splits: &BTreeMap<String, MoneyCents>,
) -> BTreeMap<String, MoneyCents> {
    let mut net: BTreeMap<String, MoneyCents> = BTreeMap::new();

    for (user_id, owed) in splits {
        net.insert(user_id.clone(), -*owed);
    }

    for (user_id, paid) in payers {
        let entry = net.entry(user_id.clone()).or_insert(MoneyCents::ZERO);
        *entry += *paid;
    }

    net
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, i64)]) -> BTreeMap<String, MoneyCents> {
        entries
            .iter()
            .map(|(user, cents)| (user.to_string(), MoneyCents::new(*cents)))
            .collect()
    }

    #[test]
    fn single_payer_equal_split() {
        let payers = map(&[("alice", 90_00)]);
        let splits = map(&[("alice", 30_00), ("bob", 30_00), ("carol", 30_00)]);

        let net = net_positions(&payers, &splits);

        assert_eq!(net["alice"], MoneyCents::new(60_00));
        assert_eq!(net["bob"], MoneyCents::new(-30_00));
        assert_eq!(net["carol"], MoneyCents::new(-30_00));
    }

    #[test]
    fn net_positions_conserve_to_zero() {
        let payers = map(&[("alice", 40_00), ("bob", 60_00)]);
        let splits = map(&[("alice", 25_00), ("bob", 25_00), ("carol", 50_00)]);

        let net = net_positions(&payers, &splits);
        let sum: i64 = net.values().map(|v| v.cents()).sum();
        assert_eq!(sum, 0);
    }

    #[test]
    fn payer_without_split_does_not_panic() {
        let payers = map(&[("dave", 30_00)]);
        let splits = map(&[("alice", 15_00), ("bob", 15_00)]);

        let net = net_positions(&payers, &splits);

        assert_eq!(net["dave"], MoneyCents::new(30_00));
        assert_eq!(net["alice"], MoneyCents::new(-15_00));
    }

    #[test]
    fn iteration_order_is_ascending_username() {
        let payers = map(&[("zed", 10_00)]);
        let splits = map(&[("mia", 5_00), ("abe", 5_00)]);

        let net = net_positions(&payers, &splits);
        let order: Vec<&str> = net.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["abe", "mia", "zed"]);
    }
}
