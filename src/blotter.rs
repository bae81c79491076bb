//! Blotter rendering
//!
//! Table output for the two lists, signed quantity formatting, and the
//! latest-version-per-trade marker. The marker trusts a service-supplied
//! flag first and only falls back to comparing versions within the loaded
//! list, so it can be wrong when history is partially loaded; it gates
//! editing, nothing else.

use crate::equities::{Position, Transaction};

/// Shown when an entry other than the newest trade version is edited
pub const EDIT_LATEST_ONLY: &str =
    "Only the latest transaction version for each trade can be edited.";

/// Whether a transaction is the newest version of its trade
///
/// A service-supplied flag wins outright. Otherwise the transaction must
/// carry a strictly higher version than every other same-trade entry in the
/// loaded list; a shared maximum marks nobody, and a transaction whose trade
/// does not appear in the list at all is not considered latest.
pub fn is_latest_version(transaction: &Transaction, transactions: &[Transaction]) -> bool {
    if let Some(flag) = transaction.is_latest_version {
        return flag;
    }

    let mut seen_trade = false;
    for other in transactions.iter().filter(|t| t.trade_id == transaction.trade_id) {
        seen_trade = true;
        if is_same_record(transaction, other) {
            continue;
        }
        if other.version >= transaction.version {
            return false;
        }
    }
    seen_trade
}

fn is_same_record(a: &Transaction, b: &Transaction) -> bool {
    match (a.transaction_id, b.transaction_id) {
        (Some(a_id), Some(b_id)) => a_id == b_id,
        _ => a == b,
    }
}

/// Net quantity with an explicit sign on gains: `+60`, `-40`, `0`
pub fn format_quantity(quantity: i64) -> String {
    if quantity > 0 {
        format!("+{}", quantity)
    } else {
        quantity.to_string()
    }
}

/// Positions list as a fixed-width table
pub fn positions_table(positions: &[Position]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<14} {:>12}\n", "Security", "Net Position"));
    out.push_str(&format!("{:<14} {:>12}\n", "--------", "------------"));

    if positions.is_empty() {
        out.push_str("(no positions)\n");
        return out;
    }

    for position in positions {
        out.push_str(&format!(
            "{:<14} {:>12}\n",
            position.security_code,
            format_quantity(position.quantity)
        ));
    }
    out
}

/// Transaction history as a fixed-width table, newest trade versions marked
pub fn transactions_table(transactions: &[Transaction]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>6} {:>6} {:>4} {:<10} {:>8} {:<7} {:<5} {}\n",
        "Txn", "Trade", "Ver", "Security", "Qty", "Action", "Side", "Latest"
    ));

    if transactions.is_empty() {
        out.push_str("(no transactions)\n");
        return out;
    }

    for transaction in transactions {
        let id = transaction
            .transaction_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let marker = if is_latest_version(transaction, transactions) {
            "*"
        } else {
            ""
        };
        out.push_str(&format!(
            "{:>6} {:>6} {:>4} {:<10} {:>8} {:<7} {:<5} {}\n",
            id,
            transaction.trade_id,
            transaction.version,
            transaction.security_code,
            transaction.quantity,
            transaction.action.to_string(),
            transaction.side.to_string(),
            marker
        ));
    }
    out
}
