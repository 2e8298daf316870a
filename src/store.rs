use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;

use crate::convert::unix_millis;
use crate::domain::PartitionedMetrics;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("partition key must not be empty")]
    EmptyPartitionKey,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write contract shared by the authoritative stores and the decorators wrapping them.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn read_metrics(
        &self,
        min_timestamp_ms: i64,
    ) -> Result<Vec<Arc<PartitionedMetrics>>, StoreError>;

    async fn write_metrics(&self, batch: Arc<PartitionedMetrics>) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: MetricStore + ?Sized> MetricStore for Arc<T> {
    async fn read_metrics(
        &self,
        min_timestamp_ms: i64,
    ) -> Result<Vec<Arc<PartitionedMetrics>>, StoreError> {
        (**self).read_metrics(min_timestamp_ms).await
    }

    async fn write_metrics(&self, batch: Arc<PartitionedMetrics>) -> Result<(), StoreError> {
        (**self).write_metrics(batch).await
    }
}

struct Entry {
    batch: Arc<PartitionedMetrics>,
    stored_at_ms: i64,
}

/// Keeps the latest batch per partition key until it is older than the TTL.
pub struct MemStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every batch stored before `now - ttl`. Returns how many were removed.
    pub fn cleanup(&self, now: OffsetDateTime) -> usize {
        let cutoff = unix_millis(now) - self.ttl.as_millis() as i64;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.stored_at_ms >= cutoff);
        before - entries.len()
    }

    fn store_at(&self, batch: Arc<PartitionedMetrics>, now: OffsetDateTime) -> Result<(), StoreError> {
        if batch.partition_key.is_empty() {
            return Err(StoreError::EmptyPartitionKey);
        }
        self.entries.write().insert(
            batch.partition_key.clone(),
            Entry {
                batch,
                stored_at_ms: unix_millis(now),
            },
        );
        Ok(())
    }
}

/// Periodically evicts expired batches until the runtime shuts down.
pub fn start_cleanup(store: Arc<MemStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = store.cleanup(OffsetDateTime::now_utc());
            if removed > 0 {
                tracing::debug!(removed, "expired partitions removed from memstore");
            }
        }
    });
}

#[async_trait]
impl MetricStore for MemStore {
    async fn read_metrics(
        &self,
        min_timestamp_ms: i64,
    ) -> Result<Vec<Arc<PartitionedMetrics>>, StoreError> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|e| e.stored_at_ms >= min_timestamp_ms)
            .map(|e| e.batch.clone())
            .collect())
    }

    async fn write_metrics(&self, batch: Arc<PartitionedMetrics>) -> Result<(), StoreError> {
        self.store_at(batch, OffsetDateTime::now_utc())
    }
}
