//! Idempotency ledger: exactly-once bookkeeping on top of a `LedgerStore`.

use crate::domain::jobs::{ErrorRecord, JobId};
use crate::error::LedgerError;
use crate::ports::ledger::LedgerStore;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct IdempotencyLedger<S> {
    store: S,
}

impl<S: LedgerStore> IdempotencyLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// True only when a success outcome is on record.
    ///
    /// A failed read counts as "not processed": reprocessing is preferred over
    /// skipping a job forever.
    pub async fn has_succeeded(&self, job_id: JobId) -> bool {
        match self.store.has_success(job_id).await {
            Ok(done) => done,
            Err(e) => {
                error!(video_id = job_id, error = %e, "error checking if video is processed");
                false
            }
        }
    }

    /// On error the job really did succeed but stays unmarked.
    pub async fn record_success(&self, job_id: JobId) -> Result<(), LedgerError> {
        self.store.insert_success(job_id).await.inspect_err(|e| {
            error!(video_id = job_id, error = %e, "error marking video as processed");
        })
    }

    /// Persist a diagnostic entry. Never fails; store errors are only logged.
    pub async fn record_error(&self, job_id: JobId, reason: &str, detail: &str) {
        let record = ErrorRecord::new(job_id, reason, detail);
        match serde_json::to_string(&record) {
            Ok(json) => error!(error_details = %json, "processing error"),
            Err(e) => error!(video_id = job_id, reason, detail, error = %e, "processing error"),
        }

        match self.store.insert_error(&record).await {
            Ok(()) => info!(video_id = job_id, reason, "error log stored"),
            Err(e) => error!(video_id = job_id, error = %e, "error storing error log in database"),
        }
    }
}
