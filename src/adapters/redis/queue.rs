//! Redis DeliverySource implementation.

use super::pool::RedisPool;
use super::processing_key;
use crate::error::QueueError;
use crate::ports::queue::{Delivery, DeliverySource};
use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::redis::{AsyncCommands, Direction};

/// Reliable queue over a pair of Redis lists.
#[derive(Clone)]
pub struct RedisQueue {
    pool: RedisPool,
    queue_key: String,
    processing_key: String,
}

impl RedisQueue {
    /// `consumer` must be stable across restarts of the same worker and
    /// distinct between workers sharing `queue_key`.
    pub fn new(pool: RedisPool, queue_key: impl Into<String>, consumer: &str) -> Self {
        let queue_key = queue_key.into();
        let processing_key = processing_key(&queue_key, consumer);
        Self {
            pool,
            queue_key,
            processing_key,
        }
    }

    /// Move deliveries this consumer left over in a previous run back onto the queue.
    pub async fn requeue_stale(&self) -> Result<usize, QueueError> {
        let mut conn = self.pool.pool.get().await?;
        let mut moved = 0;
        loop {
            let item: Option<Vec<u8>> = conn
                .lmove(
                    &self.processing_key,
                    &self.queue_key,
                    Direction::Left,
                    Direction::Right,
                )
                .await?;
            match item {
                Some(_) => moved += 1,
                None => return Ok(moved),
            }
        }
    }
}

#[async_trait]
impl DeliverySource for RedisQueue {
    async fn next_delivery(&self, timeout_secs: f64) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.pool.pool.get().await?;

        // Oldest message first (producers LPUSH), parked at the head of the processing list.
        let payload: Option<Vec<u8>> = conn
            .blmove(
                &self.queue_key,
                &self.processing_key,
                Direction::Right,
                Direction::Left,
                timeout_secs,
            )
            .await?;

        Ok(payload.map(|bytes| Delivery::new(Bytes::from(bytes))))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.pool.pool.get().await?;
        conn.lrem::<_, _, ()>(&self.processing_key, 1, delivery.payload.as_ref())
            .await?;
        Ok(())
    }
}
