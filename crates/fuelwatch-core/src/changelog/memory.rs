// # Memory Change Log
//
// In-memory implementation of ChangeLog.
//
// ## Purpose
//
// Keeps the change stream in a Vec. Nothing survives a restart, so every run
// starts from an empty state and treats every station as new.
//
// ## When to Use
//
// - Testing environments
// - One-off runs where the change history does not matter

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::change_log::{ChangeLog, ChangeRecord};

/// In-memory change log
///
/// Clones share the same underlying rows, so a test can keep one handle and
/// give another to the engine.
///
/// # Example
///
/// ```rust,no_run
/// use fuelwatch_core::changelog::MemoryChangeLog;
/// use fuelwatch_core::traits::{ChangeLog, ChangeRecord};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let log = MemoryChangeLog::new();
///
///     let now = chrono::Local::now().naive_local();
///     log.append(&ChangeRecord::new(now, "12 Rue de la Paix", true)).await?;
///
///     assert_eq!(log.len().await, 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryChangeLog {
    inner: Arc<RwLock<Vec<ChangeRecord>>>,
}

impl MemoryChangeLog {
    /// Create a new empty change log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a change log pre-populated with `records`
    pub fn with_records(records: Vec<ChangeRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(records)),
        }
    }

    /// Snapshot of every row, in append order
    pub async fn records(&self) -> Vec<ChangeRecord> {
        self.inner.read().await.clone()
    }

    /// Number of rows
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether no row has been appended
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ChangeLog for MemoryChangeLog {
    async fn replay(&self) -> Result<Vec<ChangeRecord>, Error> {
        Ok(self.records().await)
    }

    async fn append(&self, record: &ChangeRecord) -> Result<(), Error> {
        self.inner.write().await.push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing to flush for memory store
        Ok(())
    }
}
