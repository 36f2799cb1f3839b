//! Per-message orchestration: decode, dedupe, assemble, transcode, record.

use crate::application::ledger::IdempotencyLedger;
use crate::domain::dash::transcode;
use crate::domain::fragments::assemble;
use crate::domain::jobs::{Job, FRAGMENT_EXTENSION};
use crate::error::ProcessError;
use crate::ports::ledger::LedgerStore;
use crate::ports::transcoder::TranscodeExecutor;
use std::time::Duration;
use tracing::{info, warn};

pub const REASON_DECODE: &str = "deserialization failed";
pub const REASON_PROCESS: &str = "processing failed";
pub const REASON_PERSIST: &str = "failed to persist success";

/// What happened to one message. Only informational; callers need not act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Rejected,
    Skipped,
    Failed,
    Converted,
    /// Converted, but the success marker could not be written
    Unrecorded,
}

pub struct JobHandler<S, E> {
    ledger: IdempotencyLedger<S>,
    executor: E,
    timeout: Option<Duration>,
}

impl<S, E> JobHandler<S, E>
where
    S: LedgerStore,
    E: TranscodeExecutor,
{
    pub fn new(ledger: IdempotencyLedger<S>, executor: E) -> Self {
        Self {
            ledger,
            executor,
            timeout: None,
        }
    }

    /// Bound every transcoder run by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handle one raw payload. Every failure is recorded here; nothing escapes.
    pub async fn handle(&self, payload: &[u8]) -> HandleOutcome {
        let job = match Job::from_slice(payload) {
            Ok(job) => job,
            Err(e) => {
                self.ledger.record_error(0, REASON_DECODE, &e.to_string()).await;
                return HandleOutcome::Rejected;
            }
        };

        if self.ledger.has_succeeded(job.id).await {
            warn!(video_id = job.id, "video already processed");
            return HandleOutcome::Skipped;
        }

        if let Err(e) = self.process(&job).await {
            self.ledger
                .record_error(job.id, REASON_PROCESS, &e.to_string())
                .await;
            return HandleOutcome::Failed;
        }
        info!(video_id = job.id, "video conversion processed");

        if let Err(e) = self.ledger.record_success(job.id).await {
            self.ledger
                .record_error(job.id, REASON_PERSIST, &e.to_string())
                .await;
            return HandleOutcome::Unrecorded;
        }
        info!(video_id = job.id, "video marked as processed");

        HandleOutcome::Converted
    }

    async fn process(&self, job: &Job) -> Result<(), ProcessError> {
        let layout = job.layout();

        info!(video_id = job.id, path = %layout.source_dir.display(), "merging chunks");
        assemble(&layout.source_dir, &layout.merged_file, FRAGMENT_EXTENSION).await?;

        transcode(&layout, &self.executor, self.timeout).await?;
        Ok(())
    }
}
