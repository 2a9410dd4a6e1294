use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;

use super::{RecordStore, StoreError};
use crate::core::record::{Order, RecordId, Row, Table};

/// In-memory record store, used for offline sessions and by tests.
///
/// Clones share the same rows, so a test can hold a handle alongside the
/// board under test. `set_fail_writes` makes every subsequent write fail the
/// way a dropped connection would, which is how the failure-path scenarios
/// drive cache/store divergence.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
    update_calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// How many `update` attempts reached the store (including failed ones).
    pub fn update_calls(&self) -> u64 {
        self.inner.update_calls.load(Ordering::Relaxed)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Request("store offline".to_string()));
        }
        Ok(())
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, HashMap<Table, Vec<Row>>> {
        match self.inner.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RecordStore for MemoryStore {
    async fn select(&self, table: Table, owner: &str, order: Order) -> Result<Vec<Row>, StoreError> {
        let tables = self.lock_tables();
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.user_id == owner)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Tie-break equal timestamps by id so ordering stays deterministic.
        match order {
            Order::CreatedAsc => rows.sort_by_key(|r| (r.created_at, r.id)),
            Order::CreatedDesc => {
                rows.sort_by_key(|r| (r.created_at, r.id));
                rows.reverse();
            }
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, owner: &str, info: Value) -> Result<Row, StoreError> {
        self.check_writable()?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let row = Row {
            id: RecordId(id),
            user_id: owner.to_string(),
            info,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.lock_tables()
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: Table,
        id: RecordId,
        owner: &str,
        info: Value,
    ) -> Result<(), StoreError> {
        self.inner.update_calls.fetch_add(1, Ordering::Relaxed);
        self.check_writable()?;
        let mut tables = self.lock_tables();
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id && r.user_id == owner))
            .ok_or(StoreError::NotFound)?;
        row.info = info;
        row.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, table: Table, id: RecordId, owner: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        if let Some(rows) = self.lock_tables().get_mut(&table) {
            rows.retain(|r| !(r.id == id && r.user_id == owner));
        }
        Ok(())
    }
}
