//! Lifecycle updater: forward-only status transitions for existing jobs.
//!
//! Only two edges exist: `Pending → Processing` (stamping `processed_at`)
//! and `Processing → Printed` (stamping `completed_at`). Concurrency is
//! handled by the store's compare-and-set — at most one of several
//! concurrent advances for the same source state wins; the rest observe
//! a conflict and must re-read before deciding to retry or abandon.

use chrono::Utc;

use crate::db::job_repo::StampColumn;
use crate::error::{AdvanceError, StoreError};
use crate::job::{JobStatus, PrintJob};
use crate::store::JobStore;

/// Applies state transitions and error annotations to stored jobs.
#[derive(Clone)]
pub struct LifecycleUpdater {
    store: JobStore,
}

impl LifecycleUpdater {
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// Advances a job to `target`, stamping the transition timestamp.
    ///
    /// Returns the job as stored after the transition. A `target` that
    /// is not a legal next state for the job's current status is
    /// [`AdvanceError::InvalidTransition`]; losing the compare-and-set
    /// race to another updater is [`AdvanceError::Conflict`].
    pub fn advance(&self, job_id: &str, target: JobStatus) -> Result<PrintJob, AdvanceError> {
        let job = self
            .store
            .get(job_id)?
            .ok_or_else(|| AdvanceError::NotFound(job_id.to_string()))?;

        let expected = target
            .predecessor()
            .ok_or_else(|| AdvanceError::InvalidTransition {
                job_id: job_id.to_string(),
                current: job.status,
                requested: target,
            })?;
        let stamp = match target {
            JobStatus::Printed => StampColumn::CompletedAt,
            _ => StampColumn::ProcessedAt,
        };

        if job.status != expected {
            return Err(AdvanceError::InvalidTransition {
                job_id: job_id.to_string(),
                current: job.status,
                requested: target,
            });
        }

        match self
            .store
            .update_status(job_id, expected, target, stamp, Utc::now())
        {
            Ok(()) => {}
            Err(StoreError::Conflict { job_id, expected }) => {
                return Err(AdvanceError::Conflict { job_id, expected });
            }
            Err(StoreError::NotFound(id)) => return Err(AdvanceError::NotFound(id)),
            Err(e) => return Err(e.into()),
        }

        log::info!("Job {} advanced to {}", job_id, target);

        self.store
            .get(job_id)?
            .ok_or_else(|| AdvanceError::NotFound(job_id.to_string()))
    }

    /// Records a non-fatal error on a job without altering its status.
    /// The job stays visible in its current state for retry or manual
    /// intervention; there is no terminal failed state.
    pub fn record_error(&self, job_id: &str, message: &str) -> Result<(), AdvanceError> {
        match self.store.record_error(job_id, message) {
            Ok(()) => {
                log::warn!("Job {} reported error: {}", job_id, message);
                Ok(())
            }
            Err(StoreError::NotFound(id)) => Err(AdvanceError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Transport-facing entry point mirroring the update endpoint:
    /// exactly one of `target` or `error_message` must be supplied.
    pub fn apply(
        &self,
        job_id: &str,
        target: Option<JobStatus>,
        error_message: Option<&str>,
    ) -> Result<PrintJob, AdvanceError> {
        match (target, error_message) {
            (Some(target), None) => self.advance(job_id, target),
            (None, Some(message)) => {
                self.record_error(job_id, message)?;
                self.store
                    .get(job_id)?
                    .ok_or_else(|| AdvanceError::NotFound(job_id.to_string()))
            }
            (None, None) => Err(AdvanceError::InvalidRequest(
                "update requires a target status or an error message".to_string(),
            )),
            (Some(_), Some(_)) => Err(AdvanceError::InvalidRequest(
                "target status and error message are separate updates".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::job::PrintOptions;
    use crate::storage::DocumentStorage;
    use tempfile::TempDir;

    fn setup() -> (LifecycleUpdater, JobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::new(db, DocumentStorage::new(dir.path()));
        (LifecycleUpdater::new(store.clone()), store, dir)
    }

    fn pending_job(store: &JobStore) -> PrintJob {
        let path = store.storage().store(b"%PDF-1.4", "doc.pdf").unwrap();
        let job = PrintJob::new(
            "doc.pdf".to_string(),
            8,
            path.to_string_lossy().into_owned(),
            PrintOptions::default(),
            Utc::now(),
        );
        store.create(&job).unwrap();
        job
    }

    #[test]
    fn test_advance_pending_to_processing() {
        let (updater, store, _dir) = setup();
        let job = pending_job(&store);

        let advanced = updater.advance(&job.job_id, JobStatus::Processing).unwrap();
        assert_eq!(advanced.status, JobStatus::Processing);
        assert!(advanced.processed_at.is_some());
        assert!(advanced.completed_at.is_none());
    }

    #[test]
    fn test_advance_processing_to_printed() {
        let (updater, store, _dir) = setup();
        let job = pending_job(&store);

        updater.advance(&job.job_id, JobStatus::Processing).unwrap();
        let printed = updater.advance(&job.job_id, JobStatus::Printed).unwrap();

        assert_eq!(printed.status, JobStatus::Printed);
        assert!(printed.processed_at.is_some());
        assert!(printed.completed_at.is_some());
    }

    #[test]
    fn test_advance_never_skips() {
        let (updater, store, _dir) = setup();
        let job = pending_job(&store);

        // Pending → Printed skips a state.
        let result = updater.advance(&job.job_id, JobStatus::Printed);
        assert!(matches!(
            result,
            Err(AdvanceError::InvalidTransition {
                current: JobStatus::Pending,
                requested: JobStatus::Printed,
                ..
            })
        ));

        // Untouched.
        let stored = store.get(&job.job_id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert!(stored.completed_at.is_none());
    }

    #[test]
    fn test_advance_never_regresses() {
        let (updater, store, _dir) = setup();
        let job = pending_job(&store);
        updater.advance(&job.job_id, JobStatus::Processing).unwrap();

        let result = updater.advance(&job.job_id, JobStatus::Pending);
        assert!(matches!(result, Err(AdvanceError::InvalidTransition { .. })));

        // Re-requesting the current state is also not a legal edge.
        let result = updater.advance(&job.job_id, JobStatus::Processing);
        assert!(matches!(result, Err(AdvanceError::InvalidTransition { .. })));
    }

    #[test]
    fn test_advance_unknown_job() {
        let (updater, _store, _dir) = setup();
        assert!(matches!(
            updater.advance("ghost", JobStatus::Processing),
            Err(AdvanceError::NotFound(_))
        ));
    }

    #[test]
    fn test_record_error_keeps_status_and_allows_retry() {
        let (updater, store, _dir) = setup();
        let job = pending_job(&store);

        updater.record_error(&job.job_id, "paper jam").unwrap();

        let stored = store.get(&job.job_id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.error_message.as_deref(), Some("paper jam"));

        // The job can still be advanced afterwards.
        let advanced = updater.advance(&job.job_id, JobStatus::Processing).unwrap();
        assert_eq!(advanced.status, JobStatus::Processing);
        assert_eq!(advanced.error_message.as_deref(), Some("paper jam"));
    }

    #[test]
    fn test_apply_dispatches() {
        let (updater, store, _dir) = setup();
        let job = pending_job(&store);

        let advanced = updater
            .apply(&job.job_id, Some(JobStatus::Processing), None)
            .unwrap();
        assert_eq!(advanced.status, JobStatus::Processing);

        let annotated = updater.apply(&job.job_id, None, Some("low toner")).unwrap();
        assert_eq!(annotated.status, JobStatus::Processing);
        assert_eq!(annotated.error_message.as_deref(), Some("low toner"));

        assert!(matches!(
            updater.apply(&job.job_id, None, None),
            Err(AdvanceError::InvalidRequest(_))
        ));
        assert!(matches!(
            updater.apply(&job.job_id, Some(JobStatus::Printed), Some("x")),
            Err(AdvanceError::InvalidRequest(_))
        ));
    }
}
