pub mod keyring;
pub mod memory;
pub mod rest;

use serde_json::Value;

use crate::core::record::{Order, RecordId, Row, Table};

/// Failures surfaced by a record store backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The request never completed (connection, TLS, timeout).
    #[error("request failed: {0}")]
    Request(String),
    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not decode into rows.
    #[error("malformed response: {0}")]
    Decode(String),
    /// No row matched the id/owner filter.
    #[error("record not found")]
    NotFound,
}

/// Per-owner CRUD over JSON-valued rows.
///
/// Every operation is scoped to the owning user: a row is only reachable
/// through a filter carrying its owner id. `insert` returns the created row
/// so callers can pick up the store-assigned id and timestamps; `update`
/// replaces the info blob wholesale and refreshes `updated_at`.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn select(&self, table: Table, owner: &str, order: Order) -> Result<Vec<Row>, StoreError>;

    async fn insert(&self, table: Table, owner: &str, info: Value) -> Result<Row, StoreError>;

    async fn update(
        &self,
        table: Table,
        id: RecordId,
        owner: &str,
        info: Value,
    ) -> Result<(), StoreError>;

    async fn delete(&self, table: Table, id: RecordId, owner: &str) -> Result<(), StoreError>;
}
