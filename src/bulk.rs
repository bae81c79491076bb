//! Bulk entry parsing
//!
//! Turns a pasted text block into transaction records. One transaction per
//! line, 7 comma-separated fields:
//!
//! `transactionId, tradeId, version, securityCode, quantity, action, side`
//!
//! An empty first field means the service has not assigned a transaction id
//! yet. Lines that do not parse are dropped silently; the caller decides
//! what an empty result means.

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::entry::{validate, EntryMode};
use crate::equities::Transaction;

/// Parse a bulk text block, keeping only well-formed, valid records
pub fn parse_bulk(text: &str) -> Vec<Transaction> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.trim().as_bytes());

    let mut transactions = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping unreadable bulk line {}: {}", line + 1, e);
                continue;
            }
        };

        match parse_record(&record) {
            Some(transaction) => transactions.push(transaction),
            None => debug!("Skipping malformed bulk line {}", line + 1),
        }
    }

    transactions
}

fn parse_record(record: &StringRecord) -> Option<Transaction> {
    if record.len() < 7 {
        return None;
    }

    let id_field = record.get(0)?;
    let transaction_id = if id_field.is_empty() {
        None
    } else {
        Some(id_field.parse().ok()?)
    };

    let transaction = Transaction {
        transaction_id,
        trade_id: record.get(1)?.parse().ok()?,
        version: record.get(2)?.parse().ok()?,
        security_code: record.get(3)?.to_string(),
        quantity: record.get(4)?.parse().ok()?,
        action: record.get(5)?.parse().ok()?,
        side: record.get(6)?.parse().ok()?,
        is_latest_version: None,
    };

    validate(&transaction, EntryMode::New).ok()?;
    Some(transaction)
}
