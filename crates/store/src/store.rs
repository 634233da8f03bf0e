use async_trait::async_trait;

use crate::error::StoreError;
use crate::transaction::Transaction;

/// Persistence boundary for the catalog.
///
/// A transaction either commits every staged mutation or none of them.
/// Commits replay the transaction's writes onto the latest catalog, so two
/// transactions touching the same record resolve last-writer-wins, except
/// that a recorded `published_at` is never moved.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Open a transaction over a consistent snapshot.
    async fn begin(&self) -> Result<Transaction, StoreError>;

    /// Make every staged mutation durable and visible, or none of them.
    async fn commit(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Discard a transaction. Nothing it staged becomes visible.
    async fn rollback(&self, tx: Transaction) {
        tracing::debug!(tx_id = %tx.id(), staged = tx.len(), "transaction rolled back");
    }
}
