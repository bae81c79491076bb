//! Observable position and transaction state
//!
//! Wraps the REST client and holds the last server-returned positions and
//! transaction history in watch channels. Every mutation replaces local
//! state wholesale with whatever the service returns; nothing is merged
//! client-side.

use anyhow::Result;
use tokio::sync::watch;
use tracing::debug;

use crate::equities::{EquitiesClient, Position, ProcessingState, Transaction};

/// Client-side cache of the two service lists
///
/// Subscribers observe the latest snapshot; a mutation pushes the positions
/// returned by the service and then refreshes the transaction history, in
/// that order.
pub struct PositionService {
    client: EquitiesClient,
    positions: watch::Sender<Vec<Position>>,
    transactions: watch::Sender<Vec<Transaction>>,
}

impl PositionService {
    /// Create a service around a client, with empty caches
    pub fn new(client: EquitiesClient) -> Self {
        let (positions, _) = watch::channel(Vec::new());
        let (transactions, _) = watch::channel(Vec::new());
        Self {
            client,
            positions,
            transactions,
        }
    }

    /// The underlying REST client
    pub fn client(&self) -> &EquitiesClient {
        &self.client
    }

    // ========================================================================
    // Cache access
    // ========================================================================

    /// Snapshot of the cached positions
    pub fn positions(&self) -> Vec<Position> {
        self.positions.borrow().clone()
    }

    /// Snapshot of the cached transaction history
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.borrow().clone()
    }

    /// Receiver that observes every positions update
    pub fn subscribe_positions(&self) -> watch::Receiver<Vec<Position>> {
        self.positions.subscribe()
    }

    /// Receiver that observes every transaction history update
    pub fn subscribe_transactions(&self) -> watch::Receiver<Vec<Transaction>> {
        self.transactions.subscribe()
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Fetch positions and publish them
    pub async fn refresh_positions(&self) -> Result<Vec<Position>> {
        let positions = self.client.get_positions().await?;
        self.positions.send_replace(positions.clone());
        Ok(positions)
    }

    /// Fetch the transaction history and publish it
    pub async fn refresh_transactions(&self) -> Result<Vec<Transaction>> {
        let transactions = self.client.get_transactions().await?;
        self.transactions.send_replace(transactions.clone());
        Ok(transactions)
    }

    /// Fetch both lists concurrently
    pub async fn refresh_all(&self) -> Result<()> {
        futures::try_join!(self.refresh_positions(), self.refresh_transactions())?;
        Ok(())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Publish positions returned by a mutation, then refresh the history
    async fn publish(&self, positions: Vec<Position>) -> Result<Vec<Position>> {
        self.positions.send_replace(positions.clone());
        self.refresh_transactions().await?;
        Ok(positions)
    }

    /// Submit a single transaction
    pub async fn process_transaction(&self, transaction: &Transaction) -> Result<Vec<Position>> {
        let positions = self.client.process_transaction(transaction).await?;
        self.publish(positions).await
    }

    /// Submit a batch of transactions
    pub async fn process_bulk(&self, transactions: &[Transaction]) -> Result<Vec<Position>> {
        let positions = self.client.process_bulk(transactions).await?;
        self.publish(positions).await
    }

    /// Submit a batch through the service's async processing path
    pub async fn process_bulk_async(&self, transactions: &[Transaction]) -> Result<Vec<Position>> {
        let positions = self.client.process_bulk_async(transactions).await?;
        self.publish(positions).await
    }

    /// Seed the service's sample transaction set
    pub async fn load_sample_data(&self) -> Result<Vec<Position>> {
        let positions = self.client.load_sample_data().await?;
        self.publish(positions).await
    }

    /// Rebuild positions from scratch on the service
    pub async fn force_recalculation(&self) -> Result<Vec<Position>> {
        let positions = self.client.force_recalculation().await?;
        self.publish(positions).await
    }

    /// Delete all service data and empty both caches
    pub async fn clear_all(&self) -> Result<()> {
        self.client.clear_all().await?;
        debug!("Cleared cached positions and transactions");
        self.positions.send_replace(Vec::new());
        self.transactions.send_replace(Vec::new());
        Ok(())
    }

    // ========================================================================
    // Passthroughs
    // ========================================================================

    /// Health probe, raw bytes
    pub async fn check_health(&self) -> Result<Vec<u8>> {
        self.client.check_health().await
    }

    /// Incremental calculation watermark
    pub async fn processing_state(&self) -> Result<ProcessingState> {
        self.client.processing_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equities::{Action, Side};
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};

    fn sample_tx() -> Transaction {
        Transaction {
            transaction_id: Some(1),
            trade_id: 1,
            version: 1,
            security_code: "REL".to_string(),
            quantity: 50,
            action: Action::Insert,
            side: Side::Buy,
            is_latest_version: Some(true),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn service_app() -> Router {
        Router::new()
            .route(
                "/api",
                get(|| async {
                    Json(vec![Position {
                        security_code: "REL".to_string(),
                        quantity: 50,
                    }])
                }),
            )
            .route("/api/transactions", get(|| async { Json(vec![sample_tx()]) }))
            .route(
                "/api/transaction",
                post(|Json(_): Json<Transaction>| async {
                    Json(vec![Position {
                        security_code: "REL".to_string(),
                        quantity: 110,
                    }])
                }),
            )
            .route("/api/clear", delete(|| async { StatusCode::OK }))
    }

    #[tokio::test]
    async fn test_refresh_all_populates_both_caches() {
        let base = serve(service_app()).await;
        let service = PositionService::new(EquitiesClient::new(base));

        assert!(service.positions().is_empty());
        assert!(service.transactions().is_empty());

        service.refresh_all().await.unwrap();

        assert_eq!(service.positions()[0].quantity, 50);
        assert_eq!(service.transactions()[0].security_code, "REL");
    }

    #[tokio::test]
    async fn test_mutation_publishes_then_refreshes_history() {
        let base = serve(service_app()).await;
        let service = PositionService::new(EquitiesClient::new(base));

        let mut positions_rx = service.subscribe_positions();

        let returned = service.process_transaction(&sample_tx()).await.unwrap();
        assert_eq!(returned[0].quantity, 110);

        // Positions cache now holds the mutation response, and the history
        // was refetched as a side effect.
        assert_eq!(service.positions()[0].quantity, 110);
        assert_eq!(service.transactions().len(), 1);

        positions_rx.changed().await.unwrap();
        assert_eq!(positions_rx.borrow()[0].quantity, 110);
    }

    #[tokio::test]
    async fn test_clear_all_empties_both_caches() {
        let base = serve(service_app()).await;
        let service = PositionService::new(EquitiesClient::new(base));

        service.refresh_all().await.unwrap();
        assert!(!service.positions().is_empty());

        service.clear_all().await.unwrap();
        assert!(service.positions().is_empty());
        assert!(service.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_caches_untouched() {
        // No routes at all: every request 404s.
        let base = serve(Router::new()).await;
        let service = PositionService::new(EquitiesClient::new(base));

        assert!(service.refresh_positions().await.is_err());
        assert!(service.positions().is_empty());
    }
}
