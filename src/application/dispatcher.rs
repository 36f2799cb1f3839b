//! Queue consumption loop: one handling task per delivery, drained on shutdown.

use crate::application::handler::JobHandler;
use crate::error::QueueError;
use crate::ports::ledger::LedgerStore;
use crate::ports::queue::{Delivery, DeliverySource};
use crate::ports::transcoder::TranscodeExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

/// Pause after a failed receive before asking the source again.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct Dispatcher<Q, S, E> {
    source: Arc<Q>,
    handler: Arc<JobHandler<S, E>>,
    tracker: TaskTracker,
    limit: Option<Arc<Semaphore>>,
    receive_timeout_secs: f64,
}

impl<Q, S, E> Dispatcher<Q, S, E>
where
    Q: DeliverySource + 'static,
    S: LedgerStore + 'static,
    E: TranscodeExecutor + 'static,
{
    pub fn new(source: Q, handler: JobHandler<S, E>) -> Self {
        Self {
            source: Arc::new(source),
            handler: Arc::new(handler),
            tracker: TaskTracker::new(),
            limit: None,
            receive_timeout_secs: 1.0,
        }
    }

    /// Cap simultaneous jobs. While saturated no delivery is pulled, leaving
    /// backpressure to the queue. `None` keeps fan-out unbounded.
    pub fn with_max_in_flight(mut self, max: Option<usize>) -> Self {
        self.limit = max.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    pub fn with_receive_timeout(mut self, secs: f64) -> Self {
        self.receive_timeout_secs = secs;
        self
    }

    /// Jobs currently being handled.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Consume until `shutdown` fires or the source closes, then wait for every
    /// in-flight job. Returns how many deliveries were dispatched.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        let mut dispatched = 0;

        loop {
            let permit = match self.acquire_slot(&shutdown).await {
                Some(permit) => permit,
                None => break,
            };

            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.source.next_delivery(self.receive_timeout_secs) => received,
            };

            match received {
                Ok(Some(delivery)) => {
                    dispatched += 1;
                    self.spawn(delivery, permit);
                }
                Ok(None) => continue,
                Err(QueueError::Closed) => {
                    info!("delivery source closed");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to receive delivery");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                    }
                }
            }
        }

        self.tracker.close();
        info!(in_flight = self.tracker.len(), "finalizing in-flight jobs");
        self.tracker.wait().await;
        info!(dispatched, "processing completed");
        dispatched
    }

    /// `Some(None)` when unbounded, `Some(Some(permit))` when a slot is free,
    /// `None` when shutdown fired while waiting.
    async fn acquire_slot(
        &self,
        shutdown: &CancellationToken,
    ) -> Option<Option<OwnedSemaphorePermit>> {
        let Some(limit) = &self.limit else {
            return Some(None);
        };
        tokio::select! {
            _ = shutdown.cancelled() => None,
            permit = limit.clone().acquire_owned() => permit.ok().map(Some),
        }
    }

    fn spawn(&self, delivery: Delivery, permit: Option<OwnedSemaphorePermit>) {
        let source = self.source.clone();
        let handler = self.handler.clone();

        self.tracker.spawn(async move {
            let outcome = handler.handle(&delivery.payload).await;
            debug!(?outcome, "delivery handled");

            if let Err(e) = source.ack(&delivery).await {
                error!(error = %e, "failed to acknowledge delivery");
            }
            drop(permit);
        });
    }
}
