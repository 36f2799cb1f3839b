use crate::error::QueueError;
use async_trait::async_trait;
use bytes::Bytes;

/// One message pulled from the queue, still awaiting acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub payload: Bytes,
}

impl Delivery {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Wait up to `timeout_secs` for the next delivery.
    /// `Ok(None)` means the wait elapsed; `Err(QueueError::Closed)` means no more will come.
    async fn next_delivery(&self, timeout_secs: f64) -> Result<Option<Delivery>, QueueError>;

    /// Mark a delivery as handled so it is not redelivered
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;
}
