//! Equity Positions Service Data Models
//!
//! Wire types exchanged with the equity positions REST service.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Transactions
// ============================================================================

/// What a transaction does to its trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Insert,
    Update,
    Cancel,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Cancel => write!(f, "CANCEL"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "CANCEL" => Ok(Self::Cancel),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// Which way the trade goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

/// A single trade event (insert/update/cancel) affecting a position
///
/// `transaction_id` stays empty until the service assigns one, and is left
/// out of the payload so the service treats the record as new.
/// `is_latest_version` is only ever populated by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    pub trade_id: i64,
    pub version: i32,
    pub security_code: String,
    pub quantity: i32,
    pub action: Action,
    pub side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_latest_version: Option<bool>,
}

/// A trade id together with its transactions
///
/// Conceptual grouping exposed by the service; nothing client-side computes
/// over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub trade_id: i64,
    pub transactions: Vec<Transaction>,
}

// ============================================================================
// Positions
// ============================================================================

/// Net quantity held per security, computed entirely service-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub security_code: String,
    pub quantity: i64,
}

// ============================================================================
// Processing state
// ============================================================================

/// Incremental calculation watermark reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingState {
    pub state_key: String,
    #[serde(default)]
    pub last_processed_transaction_id: Option<i64>,
    #[serde(default)]
    pub last_processed_timestamp: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&Action::Insert).unwrap();
        assert_eq!(json, "\"INSERT\"");

        let json = serde_json::to_string(&Action::Cancel).unwrap();
        assert_eq!(json, "\"CANCEL\"");

        let side: Side = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, Side::Sell);
    }

    #[test]
    fn test_action_side_parsing() {
        assert_eq!("insert".parse::<Action>().unwrap(), Action::Insert);
        assert_eq!(" BUY ".parse::<Side>().unwrap(), Side::Buy);
        assert!("HOLD".parse::<Side>().is_err());
        assert!("DELETE".parse::<Action>().is_err());
    }

    #[test]
    fn test_transaction_wire_format() {
        let tx = Transaction {
            transaction_id: None,
            trade_id: 1,
            version: 1,
            security_code: "REL".to_string(),
            quantity: 50,
            action: Action::Insert,
            side: Side::Buy,
            is_latest_version: None,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tradeId": 1,
                "version": 1,
                "securityCode": "REL",
                "quantity": 50,
                "action": "INSERT",
                "side": "BUY"
            })
        );
    }

    #[test]
    fn test_transaction_deserializes_service_flag() {
        let json = r#"{
            "transactionId": 7,
            "tradeId": 2,
            "version": 3,
            "securityCode": "ITC",
            "quantity": 30,
            "action": "CANCEL",
            "side": "SELL",
            "isLatestVersion": true
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_id, Some(7));
        assert_eq!(tx.action, Action::Cancel);
        assert_eq!(tx.is_latest_version, Some(true));
    }

    #[test]
    fn test_processing_state_timestamp() {
        let json = r#"{
            "stateKey": "POSITION_CALCULATION",
            "lastProcessedTransactionId": 12,
            "lastProcessedTimestamp": "2026-01-05T10:30:00"
        }"#;

        let state: ProcessingState = serde_json::from_str(json).unwrap();
        assert_eq!(state.state_key, "POSITION_CALCULATION");
        assert_eq!(state.last_processed_transaction_id, Some(12));
        assert!(state.last_processed_timestamp.is_some());
    }
}
