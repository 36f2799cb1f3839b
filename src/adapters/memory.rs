//! In-process adapters for tests and dry runs.

use crate::domain::jobs::{ErrorRecord, JobId};
use crate::error::{LedgerError, QueueError};
use crate::ports::ledger::LedgerStore;
use crate::ports::queue::{Delivery, DeliverySource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct LedgerTables {
    processed: Vec<JobId>,
    errors: Vec<ErrorRecord>,
}

/// Ledger store held in memory. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    tables: Arc<Mutex<LedgerTables>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_succeeded(&self, job_id: JobId) {
        self.tables.lock().processed.push(job_id);
    }

    /// Number of success rows for `job_id`.
    pub fn success_count(&self, job_id: JobId) -> usize {
        self.tables
            .lock()
            .processed
            .iter()
            .filter(|id| **id == job_id)
            .count()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.tables.lock().errors.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn has_success(&self, job_id: JobId) -> Result<bool, LedgerError> {
        Ok(self.success_count(job_id) > 0)
    }

    async fn insert_success(&self, job_id: JobId) -> Result<(), LedgerError> {
        let mut tables = self.tables.lock();
        if !tables.processed.contains(&job_id) {
            tables.processed.push(job_id);
        }
        Ok(())
    }

    async fn insert_error(&self, record: &ErrorRecord) -> Result<(), LedgerError> {
        self.tables.lock().errors.push(record.clone());
        Ok(())
    }
}

/// Delivery source fed through a channel. Acknowledged payloads are kept for inspection.
#[derive(Debug, Clone)]
pub struct ChannelSource {
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>>,
    acked: Arc<Mutex<Vec<Delivery>>>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<Delivery>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let source = Self {
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            acked: Arc::new(Mutex::new(Vec::new())),
        };
        (sender, source)
    }

    pub fn acked(&self) -> Vec<Delivery> {
        self.acked.lock().clone()
    }
}

#[async_trait]
impl DeliverySource for ChannelSource {
    async fn next_delivery(&self, timeout_secs: f64) -> Result<Option<Delivery>, QueueError> {
        let mut receiver = self.receiver.lock().await;
        let wait = Duration::from_secs_f64(timeout_secs.max(0.0));
        match tokio::time::timeout(wait, receiver.recv()).await {
            Ok(Some(delivery)) => Ok(Some(delivery)),
            Ok(None) => Err(QueueError::Closed),
            Err(_) => Ok(None),
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.acked.lock().push(delivery.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_success_converges_to_one_row() {
        let store = MemoryLedgerStore::new();
        store.insert_success(1).await.unwrap();
        store.insert_success(1).await.unwrap();
        assert_eq!(store.success_count(1), 1);
        assert!(store.has_success(1).await.unwrap());
        assert!(!store.has_success(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_channel_source_times_out_then_closes() {
        let (sender, source) = ChannelSource::new();
        assert_eq!(source.next_delivery(0.01).await.unwrap(), None);

        sender.send(Delivery::new(&b"{}"[..])).unwrap();
        let delivery = source.next_delivery(0.01).await.unwrap().unwrap();
        source.ack(&delivery).await.unwrap();
        assert_eq!(source.acked(), vec![delivery]);

        drop(sender);
        assert!(matches!(
            source.next_delivery(0.01).await,
            Err(QueueError::Closed)
        ));
    }
}
