//! Retention sweeper: removes printed jobs older than the retention
//! period, bytes and record both.
//!
//! Only `Printed` jobs age out; pending and processing jobs are kept
//! indefinitely no matter how old. The sweep is idempotent and tolerant
//! of concurrent deletion — a job that vanishes between selection and
//! removal is simply skipped.

use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::store::JobStore;

/// What one sweep pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Jobs fully removed (record and bytes).
    pub removed: usize,
    /// Jobs that could not be removed this pass; retried next sweep.
    pub failed: usize,
}

/// Periodic cleanup of expired printed jobs.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: JobStore,
    retention: Duration,
}

impl RetentionSweeper {
    /// Creates a sweeper that removes printed jobs completed more than
    /// `retention_days` days ago.
    pub fn new(store: JobStore, retention_days: u32) -> Self {
        Self {
            store,
            retention: Duration::days(i64::from(retention_days)),
        }
    }

    /// Runs one sweep pass against the wall clock.
    pub fn run(&self) -> Result<SweepOutcome, StoreError> {
        self.sweep(Utc::now())
    }

    /// Runs one sweep pass at an explicit instant. A failure to remove
    /// one job never aborts the pass; the job is counted and left for
    /// the next sweep.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepOutcome, StoreError> {
        let cutoff = now - self.retention;
        let _span = tracing::info_span!("sweeper.sweep", %cutoff).entered();

        let expired = self.store.select_expired(cutoff)?;
        if expired.is_empty() {
            log::debug!("Retention sweep found nothing to remove");
            return Ok(SweepOutcome::default());
        }

        let mut outcome = SweepOutcome::default();
        for job in &expired {
            match self.store.delete(&job.job_id) {
                Ok(()) => outcome.removed += 1,
                // Already gone: another sweep or a client delete won the
                // race. Nothing left to do.
                Err(StoreError::NotFound(_)) => {}
                Err(e) => {
                    log::error!("Failed to remove expired job {}: {}", job.job_id, e);
                    outcome.failed += 1;
                }
            }
        }

        log::info!(
            "Retention sweep removed {} of {} expired jobs ({} failed)",
            outcome.removed,
            expired.len(),
            outcome.failed
        );

        Ok(outcome)
    }
}
