//! Settlement matching.
//!
//! Reduces a net-position map to the minimal list of pairwise transfers that
//! settles it, using greedy creditor/debtor matching. The output is a pure
//! function of the input map: members are processed in ascending username
//! order, so the same economic scenario always produces the same settlement
//! graph. That determinism is what makes re-running an expense submission
//! idempotent at the ledger layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// A single matched transfer: `debtor` pays `creditor` `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub debtor: String,
    pub creditor: String,
    pub amount: MoneyCents,
}

struct Party {
    user_id: String,
    remaining: MoneyCents,
}

/// Matches creditors against debtors with a deterministic two-pointer greedy
/// pass.
///
/// 1. Positions under [`MoneyCents::TOLERANCE`] are already settled and are
///    skipped.
/// 2. Creditors (`net > 0`) and debtors (`net < 0`, kept as positive owed
///    magnitudes) are collected in ascending username order — the `BTreeMap`
///    key order. The ordering is load-bearing: it is the tie-break that keeps
///    repeated runs reproducible.
/// 3. Each step settles `min(creditor.remaining, debtor.remaining)`, emits a
///    transfer when that amount is at least one cent, and advances whichever
///    side dropped below the tolerance (possibly both).
///
/// The result holds at most `creditors + debtors − 1` transfers, and the
/// transfers into each creditor sum exactly to that creditor's surplus.
pub fn match_transfers(net: &BTreeMap<String, MoneyCents>) -> Vec<Transfer> {
    let mut creditors: Vec<Party> = Vec::new();
    let mut debtors: Vec<Party> = Vec::new();

    for (user_id, amount) in net {
        if amount.is_negligible() {
            continue;
        }
        if amount.is_positive() {
            creditors.push(Party {
                user_id: user_id.clone(),
                remaining: *amount,
            });
        } else {
            debtors.push(Party {
                user_id: user_id.clone(),
                remaining: amount.abs(),
            });
        }
    }

    let mut transfers = Vec::new();
    let mut creditor_index = 0;
    let mut debtor_index = 0;

    while creditor_index < creditors.len() && debtor_index < debtors.len() {
        let settled = creditors[creditor_index]
            .remaining
            .min(debtors[debtor_index].remaining);

        if settled >= MoneyCents::TOLERANCE {
            transfers.push(Transfer {
                debtor: debtors[debtor_index].user_id.clone(),
                creditor: creditors[creditor_index].user_id.clone(),
                amount: settled,
            });
        }

        creditors[creditor_index].remaining -= settled;
        debtors[debtor_index].remaining -= settled;

        if creditors[creditor_index].remaining.is_negligible() {
            creditor_index += 1;
        }
        if debtors[debtor_index].remaining.is_negligible() {
            debtor_index += 1;
        }
    }

    transfers
}
