//! Equity Positions Service Client
//!
//! HTTP client for the equity positions REST service. The service owns all
//! position netting and version ordering; this client only moves records
//! back and forth.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::models::*;

/// Default base URL for a locally running positions service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Equity positions REST client
pub struct EquitiesClient {
    client: Client,
    base_url: String,
}

impl EquitiesClient {
    /// Create a new client from environment variables
    ///
    /// Expects:
    /// - `EQUITIES_BASE_URL` (optional) - service base URL, defaults to the
    ///   local development service
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("EQUITIES_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url))
    }

    /// Create a new client with an explicit base URL
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new client with an explicit request timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request and parse the JSON response
    async fn get<R: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<R> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Request to {} failed ({}): {}", endpoint, status, body));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", endpoint))
    }

    /// Make a POST request with a JSON body and parse the JSON response
    async fn post<T: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<R> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Request to {} failed ({}): {}", endpoint, status, body));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", endpoint))
    }

    // ========================================================================
    // Query Methods
    // ========================================================================

    /// Get all net positions
    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        debug!("Fetching positions...");
        let positions: Vec<Position> = self.get("/api").await?;
        debug!("Fetched {} positions", positions.len());
        Ok(positions)
    }

    /// Get the full transaction history
    pub async fn get_transactions(&self) -> Result<Vec<Transaction>> {
        debug!("Fetching transactions...");
        let transactions: Vec<Transaction> = self.get("/api/transactions").await?;
        debug!("Fetched {} transactions", transactions.len());
        Ok(transactions)
    }

    /// Get the incremental calculation watermark
    pub async fn processing_state(&self) -> Result<ProcessingState> {
        debug!("Fetching processing state...");
        self.get("/api/processing-state").await
    }

    /// Health probe, consumed as raw bytes
    pub async fn check_health(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .context("Failed to send request to /api/health")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Health check failed ({})", status));
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read health response body")?;
        Ok(body.to_vec())
    }

    // ========================================================================
    // Mutation Methods
    // ========================================================================

    /// Submit a single transaction, returning the recalculated positions
    pub async fn process_transaction(&self, transaction: &Transaction) -> Result<Vec<Position>> {
        debug!(
            "Submitting transaction: trade {} v{} {} {} {} x{}",
            transaction.trade_id,
            transaction.version,
            transaction.action,
            transaction.side,
            transaction.security_code,
            transaction.quantity
        );
        self.post("/api/transaction", transaction).await
    }

    /// Submit a batch of transactions, returning the recalculated positions
    pub async fn process_bulk(&self, transactions: &[Transaction]) -> Result<Vec<Position>> {
        info!("Submitting {} transactions in bulk", transactions.len());
        self.post("/api/transactions/bulk", &transactions).await
    }

    /// Submit a batch through the service's async processing path
    pub async fn process_bulk_async(&self, transactions: &[Transaction]) -> Result<Vec<Position>> {
        info!(
            "Submitting {} transactions in bulk (async path)",
            transactions.len()
        );
        self.post("/api/transactions/bulk-async", &transactions).await
    }

    /// Delete every transaction and position held by the service
    pub async fn clear_all(&self) -> Result<()> {
        info!("Clearing all service data");

        let response = self
            .client
            .delete(format!("{}/api/clear", self.base_url))
            .send()
            .await
            .context("Failed to send request to /api/clear")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Request to /api/clear failed ({}): {}", status, body));
        }

        Ok(())
    }

    /// Ask the service to seed its sample transaction set
    pub async fn load_sample_data(&self) -> Result<Vec<Position>> {
        info!("Loading sample data");
        self.post("/api/load-sample-data", &serde_json::json!({})).await
    }

    /// Ask the service to rebuild positions from scratch
    pub async fn force_recalculation(&self) -> Result<Vec<Position>> {
        info!("Forcing full position recalculation");
        self.post("/api/force-recalculation", &serde_json::json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_get_positions() {
        let app = Router::new().route(
            "/api",
            get(|| async {
                Json(vec![Position {
                    security_code: "REL".to_string(),
                    quantity: 60,
                }])
            }),
        );
        let base = serve(app).await;

        let client = EquitiesClient::new(base);
        let positions = client.get_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].security_code, "REL");
        assert_eq!(positions[0].quantity, 60);
    }

    #[tokio::test]
    async fn test_process_transaction_round_trip() {
        let app = Router::new().route(
            "/api/transaction",
            post(|Json(tx): Json<Transaction>| async move {
                Json(vec![Position {
                    security_code: tx.security_code,
                    quantity: tx.quantity as i64,
                }])
            }),
        );
        let base = serve(app).await;

        let client = EquitiesClient::new(base);
        let tx = Transaction {
            transaction_id: None,
            trade_id: 1,
            version: 1,
            security_code: "INF".to_string(),
            quantity: 70,
            action: Action::Insert,
            side: Side::Buy,
            is_latest_version: None,
        };
        let positions = client.process_transaction(&tx).await.unwrap();
        assert_eq!(positions[0].security_code, "INF");
        assert_eq!(positions[0].quantity, 70);
    }

    #[tokio::test]
    async fn test_clear_all_and_health() {
        let app = Router::new()
            .route("/api/clear", delete(|| async { StatusCode::OK }))
            .route("/api/health", get(|| async { "OK" }));
        let base = serve(app).await;

        let client = EquitiesClient::new(base);
        client.clear_all().await.unwrap();
        let body = client.check_health().await.unwrap();
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let app = Router::new().route(
            "/api/transactions",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "calculation failed") }),
        );
        let base = serve(app).await;

        let client = EquitiesClient::new(base);
        let err = client.get_transactions().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/api/transactions"), "unexpected error: {}", msg);
        assert!(msg.contains("500"), "unexpected error: {}", msg);
    }
}
