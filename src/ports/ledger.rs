use crate::domain::jobs::{ErrorRecord, JobId};
use crate::error::LedgerError;
use async_trait::async_trait;

/// Durable store behind the idempotency ledger.
///
/// Implementations report every failure; the retry and swallow policy lives
/// in `application::ledger`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Whether a `success` outcome exists for `job_id`
    async fn has_success(&self, job_id: JobId) -> Result<bool, LedgerError>;

    /// Insert the success outcome for `job_id`
    async fn insert_success(&self, job_id: JobId) -> Result<(), LedgerError>;

    /// Append one diagnostic entry
    async fn insert_error(&self, record: &ErrorRecord) -> Result<(), LedgerError>;
}
