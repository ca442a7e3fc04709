//! Persistent print-job store backed by rusqlite, plus the read-only
//! status and history projections.
//!
//! All record mutation goes through the compare-and-set primitive; no
//! caller is permitted to write a job row outside this contract. The
//! store owns the pairing between a record and its document bytes: a
//! delete removes the bytes first and only then the row, so a live
//! record never points at nothing.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::job_repo::{self, JobFilter, JobRow, StampColumn};
use crate::db::{Database, DatabaseError};
use crate::error::StoreError;
use crate::job::{ColorMode, JobStatus, PrintJob, PrintOptions};
use crate::storage::DocumentStorage;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn parse_status(s: &str, job_id: &str) -> JobStatus {
    JobStatus::parse(s).unwrap_or_else(|| {
        log::warn!(
            "Unknown job status '{}' for job {}, defaulting to pending",
            s,
            job_id
        );
        JobStatus::Pending
    })
}

fn parse_color_mode(s: &str, job_id: &str) -> ColorMode {
    ColorMode::parse(s).unwrap_or_else(|| {
        log::warn!(
            "Unknown color mode '{}' for job {}, defaulting to grayscale",
            s,
            job_id
        );
        ColorMode::Grayscale
    })
}

fn job_from_row(row: &JobRow) -> PrintJob {
    PrintJob {
        job_id: row.job_id.clone(),
        filename: row.filename.clone(),
        file_size: row.file_size.max(0) as u64,
        storage_ref: row.storage_ref.clone(),
        options: PrintOptions {
            paper_size: row.paper_size.clone(),
            color_mode: parse_color_mode(&row.color_mode, &row.job_id),
            page_range: row.page_range.clone(),
            copies: row.copies.clamp(1, i64::from(u32::MAX)) as u32,
            printer_name: row.printer_name.clone(),
        },
        status: parse_status(&row.status, &row.job_id),
        error_message: row.error_message.clone(),
        uploaded_at: parse_timestamp(&row.uploaded_at),
        processed_at: row.processed_at.as_deref().map(parse_timestamp),
        completed_at: row.completed_at.as_deref().map(parse_timestamp),
    }
}

fn row_from_job(job: &PrintJob) -> JobRow {
    JobRow {
        job_id: job.job_id.clone(),
        filename: job.filename.clone(),
        storage_ref: job.storage_ref.clone(),
        file_size: job.file_size as i64,
        paper_size: job.options.paper_size.clone(),
        color_mode: job.options.color_mode.as_str().to_string(),
        page_range: job.options.page_range.clone(),
        copies: i64::from(job.options.copies),
        printer_name: job.options.printer_name.clone(),
        status: job.status.as_str().to_string(),
        error_message: job.error_message.clone(),
        uploaded_at: format_timestamp(job.uploaded_at),
        processed_at: job.processed_at.map(format_timestamp),
        completed_at: job.completed_at.map(format_timestamp),
    }
}

// ─── View types ─────────────────────────────────────────────────────────────

/// Status projection for a single job. Status is rendered as a human
/// label at this boundary only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub job_id: String,
    pub status: &'static str,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One entry in the history listing, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub filename: String,
    pub file_size: u64,
    pub printer_name: String,
    pub status: &'static str,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&PrintJob> for StatusView {
    fn from(job: &PrintJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.status.label(),
            uploaded_at: job.uploaded_at,
            processed_at: job.processed_at,
            completed_at: job.completed_at,
            error_message: job.error_message.clone(),
        }
    }
}

impl From<&PrintJob> for JobSummary {
    fn from(job: &PrintJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            filename: job.filename.clone(),
            file_size: job.file_size,
            printer_name: job.options.printer_name.clone(),
            status: job.status.label(),
            uploaded_at: job.uploaded_at,
            completed_at: job.completed_at,
        }
    }
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Durable record store for print jobs.
///
/// Cloning is cheap; clones share the same database connection and
/// storage root.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
    storage: DocumentStorage,
}

impl JobStore {
    pub fn new(db: Database, storage: DocumentStorage) -> Self {
        Self { db, storage }
    }

    /// The document byte store paired with this record store.
    pub fn storage(&self) -> &DocumentStorage {
        &self.storage
    }

    /// Inserts a new job record. An identifier collision is
    /// [`StoreError::DuplicateId`] — callers generate ids with enough
    /// entropy that hitting this is exceptional, not routine.
    pub fn create(&self, job: &PrintJob) -> Result<(), StoreError> {
        match job_repo::insert(&self.db, &row_from_job(job)) {
            Ok(()) => Ok(()),
            Err(DatabaseError::Duplicate { job_id }) => Err(StoreError::DuplicateId(job_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, job_id: &str) -> Result<Option<PrintJob>, StoreError> {
        Ok(job_repo::find_by_id(&self.db, job_id)?
            .as_ref()
            .map(job_from_row))
    }

    /// Lists jobs newest first, optionally filtered by status, with a
    /// result-count bound. Returns the matching jobs and the total count
    /// before the bound was applied.
    pub fn list(
        &self,
        status: Option<JobStatus>,
        limit: Option<u64>,
    ) -> Result<(Vec<PrintJob>, u64), StoreError> {
        let filter = JobFilter {
            status: status.map(|s| s.as_str().to_string()),
            limit,
            offset: None,
        };
        let (rows, total) = job_repo::query(&self.db, &filter)?;
        Ok((rows.iter().map(job_from_row).collect(), total))
    }

    /// The agent-facing work list: pending jobs, newest first.
    pub fn list_pending(&self, limit: Option<u64>) -> Result<Vec<PrintJob>, StoreError> {
        Ok(self.list(Some(JobStatus::Pending), limit)?.0)
    }

    /// Compare-and-set status update. Applies `new_status` and stamps
    /// `stamp` with `now` only if the stored status still equals
    /// `expected`. A lost race is [`StoreError::Conflict`]; a missing
    /// row is [`StoreError::NotFound`]. Nothing is mutated in either
    /// failure case.
    pub fn update_status(
        &self,
        job_id: &str,
        expected: JobStatus,
        new_status: JobStatus,
        stamp: StampColumn,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let changed = job_repo::update_status_cas(
            &self.db,
            job_id,
            expected.as_str(),
            new_status.as_str(),
            stamp,
            &format_timestamp(now),
        )?;
        if changed == 1 {
            return Ok(());
        }
        if job_repo::exists(&self.db, job_id)? {
            Err(StoreError::Conflict {
                job_id: job_id.to_string(),
                expected,
            })
        } else {
            Err(StoreError::NotFound(job_id.to_string()))
        }
    }

    /// Records an error message on a job without altering its status.
    pub fn record_error(&self, job_id: &str, message: &str) -> Result<(), StoreError> {
        let changed = job_repo::set_error(&self.db, job_id, message)?;
        if changed == 0 {
            return Err(StoreError::NotFound(job_id.to_string()));
        }
        Ok(())
    }

    /// Removes a job record and its backing bytes.
    ///
    /// Bytes go first: if byte deletion fails the record is left intact
    /// and the error surfaced. Bytes that are already gone are fine —
    /// a previous partial delete may have removed them.
    pub fn delete(&self, job_id: &str) -> Result<(), StoreError> {
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;

        let removed = self.storage.delete(Path::new(&row.storage_ref))?;
        if !removed {
            log::debug!(
                "Bytes for job {} already gone ({}), removing record",
                job_id,
                row.storage_ref
            );
        }

        let changed = job_repo::delete(&self.db, job_id)?;
        if changed == 0 {
            // Another deleter got the row between our read and the delete.
            return Err(StoreError::NotFound(job_id.to_string()));
        }

        log::info!("Deleted job {} and its document", job_id);
        Ok(())
    }

    /// Status projection for a single job (§ read path).
    pub fn status_of(&self, job_id: &str) -> Result<Option<StatusView>, StoreError> {
        Ok(self.get(job_id)?.as_ref().map(StatusView::from))
    }

    /// The most recent `limit` job summaries, newest first.
    pub fn history(&self, limit: Option<u64>) -> Result<Vec<JobSummary>, StoreError> {
        let (jobs, _) = self.list(None, limit)?;
        Ok(jobs.iter().map(JobSummary::from).collect())
    }

    /// Printed jobs completed strictly before `cutoff` — the sweeper's
    /// selection. Pending and processing jobs are never returned.
    pub fn select_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<PrintJob>, StoreError> {
        let rows = job_repo::select_expired(&self.db, &format_timestamp(cutoff))?;
        Ok(rows.iter().map(job_from_row).collect())
    }
}
