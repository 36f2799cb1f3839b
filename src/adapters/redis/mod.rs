//! Redis adapter: the job queue.
//!
//! Producers `LPUSH` JSON job messages onto the queue list. The worker moves
//! each message atomically onto its own processing list (`BLMOVE`) and removes
//! it from there once handled, so a crash mid-job leaves the message
//! recoverable by the same consumer on restart.

mod pool;
mod queue;

pub use pool::RedisPool;
pub use queue::RedisQueue;

/// List holding the deliveries `consumer` has in flight.
///
/// Each worker parks messages on its own list, so recovering one worker's
/// leftovers at startup never steals jobs another live worker is handling.
fn processing_key(queue_key: &str, consumer: &str) -> String {
    format!("{}:processing:{}", queue_key, consumer)
}
