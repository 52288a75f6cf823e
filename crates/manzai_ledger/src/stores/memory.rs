//! In-memory row store.
//!
//! Rows live in a `HashMap` behind an `RwLock` and disappear with the
//! process. Used for local runs and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use manzai_core::UsageRecord;
use manzai_error::StorageError;
use manzai_interface::UsageStore;
use tokio::sync::RwLock;

/// HashMap-backed [`UsageStore`].
///
/// # Example
/// ```
/// use manzai_core::UsageRecord;
/// use manzai_interface::UsageStore;
/// use manzai_ledger::InMemoryUsageStore;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = InMemoryUsageStore::new();
/// store.upsert(&UsageRecord::empty("u1")).await.unwrap();
/// assert!(store.get("u1").await.unwrap().is_some());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsageStore {
    rows: Arc<RwLock<HashMap<String, UsageRecord>>>,
}

impl InMemoryUsageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = UsageRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| (record.user_id.clone(), record))
            .collect();
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StorageError> {
        Ok(self.rows.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, record: &UsageRecord) -> Result<(), StorageError> {
        self.rows
            .write()
            .await
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
