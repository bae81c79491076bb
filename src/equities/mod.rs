//! Equity positions service integration
//!
//! Wire models and HTTP client for the equity positions REST service.

pub mod client;
pub mod models;

pub use client::EquitiesClient;
pub use models::*;
