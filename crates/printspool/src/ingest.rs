//! Ingest gateway: validates a document submission, persists its bytes,
//! and creates the job record.
//!
//! Validation happens strictly before any side effect, and a submission
//! that fails after its bytes were written cleans those bytes up again —
//! a failed `submit` leaves no orphan record and no orphan bytes.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::error::SubmitError;
use crate::job::{ColorMode, PrintJob, PrintOptions};
use crate::store::JobStore;

/// PDF magic bytes; the only accepted document format.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Highest page number accepted in a page-range expression.
const PAGE_MAX: u32 = 9999;

/// Raw, possibly absent print options as they arrive from a client.
/// Unset fields take the documented defaults during normalization.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OptionsInput {
    pub paper_size: Option<String>,
    pub color_mode: Option<String>,
    pub page_range: Option<String>,
    pub copies: Option<u32>,
    pub printer_name: Option<String>,
}

/// What a successful submission returns to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub job_id: String,
    pub filename: String,
    pub tracking_token: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Accepts validated document submissions into the job store.
#[derive(Clone)]
pub struct IngestGateway {
    store: JobStore,
    max_upload_bytes: u64,
    copies_max: u32,
    base_url: String,
}

impl IngestGateway {
    pub fn new(store: JobStore, config: &ServiceConfig) -> Self {
        Self {
            store,
            max_upload_bytes: config.max_upload_bytes,
            copies_max: config.copies_max,
            base_url: config.public_base_url.clone(),
        }
    }

    /// Validates and accepts a document submission.
    ///
    /// On success the job exists in the store with status `Pending` and
    /// its bytes are durably written. On any failure neither exists.
    pub fn submit(
        &self,
        content: &[u8],
        filename: &str,
        options: &OptionsInput,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let _span = tracing::info_span!("ingest.submit", filename).entered();

        validate_document(content, filename, self.max_upload_bytes)?;
        let normalized = normalize_options(options, self.copies_max)?;

        // Persist bytes before the record: a record must never point at
        // bytes that were not written.
        let storage_ref = self.store.storage().store(content, filename)?;

        let mut job = PrintJob::new(
            filename.to_string(),
            content.len() as u64,
            storage_ref.to_string_lossy().into_owned(),
            normalized,
            Utc::now(),
        );

        if let Err(e) = self.create_with_retry(&mut job) {
            // Creation failed for good: reclaim the bytes so nothing
            // orphaned survives the failed submission.
            if let Err(cleanup) = self.store.storage().delete(&storage_ref) {
                log::error!(
                    "Failed to clean up bytes for rejected submission '{}': {}",
                    storage_ref.display(),
                    cleanup
                );
            }
            return Err(e.into());
        }

        log::info!("Accepted print job {} ({} bytes)", job.job_id, job.file_size);

        Ok(SubmissionReceipt {
            tracking_token: job.tracking_token(&self.base_url),
            job_id: job.job_id,
            filename: job.filename,
            uploaded_at: job.uploaded_at,
        })
    }

    /// Creates the record, regenerating the identifier and retrying once
    /// on the astronomically unlikely duplicate-id collision.
    fn create_with_retry(&self, job: &mut PrintJob) -> Result<(), crate::error::StoreError> {
        match self.store.create(job) {
            Err(crate::error::StoreError::DuplicateId(id)) => {
                log::warn!("Duplicate job id {} on create, regenerating", id);
                job.regenerate_id();
                self.store.create(job)
            }
            other => other,
        }
    }
}

/// Rejects payloads that are not an acceptable PDF document.
fn validate_document(content: &[u8], filename: &str, limit: u64) -> Result<(), SubmitError> {
    if !content.starts_with(PDF_MAGIC) {
        return Err(SubmitError::UnsupportedFormat(
            "payload is not a PDF document".to_string(),
        ));
    }

    // If the filename carries an extension, it must not contradict the
    // sniffed content.
    if Path::new(filename).extension().is_some() {
        if let Some(guessed) = mime_guess::from_path(filename).first() {
            if guessed != mime_guess::mime::APPLICATION_PDF {
                return Err(SubmitError::UnsupportedFormat(format!(
                    "filename suggests '{}', expected application/pdf",
                    guessed
                )));
            }
        }
    }

    let size = content.len() as u64;
    if size > limit {
        return Err(SubmitError::TooLarge { size, limit });
    }

    Ok(())
}

/// Applies defaults to unset options and rejects malformed values.
fn normalize_options(input: &OptionsInput, copies_max: u32) -> Result<PrintOptions, SubmitError> {
    let color_mode = match input.color_mode.as_deref() {
        None | Some("") => ColorMode::Grayscale,
        Some(s) => ColorMode::parse(s).ok_or_else(|| SubmitError::InvalidColorMode(s.to_string()))?,
    };

    let copies = input.copies.unwrap_or(1);
    if copies < 1 || copies > copies_max {
        return Err(SubmitError::InvalidCopies {
            got: copies,
            max: copies_max,
        });
    }

    let page_range = match input.page_range.as_deref() {
        None | Some("") => "all".to_string(),
        Some(s) => {
            if !is_valid_page_range(s) {
                return Err(SubmitError::InvalidPageRange(s.to_string()));
            }
            s.to_string()
        }
    };

    let paper_size = match input.paper_size.as_deref() {
        None | Some("") => "A4".to_string(),
        Some(s) => s.trim().to_string(),
    };

    let printer_name = match input.printer_name.as_deref() {
        None | Some("") => "default".to_string(),
        Some(s) => s.trim().to_string(),
    };

    Ok(PrintOptions {
        paper_size,
        color_mode,
        page_range,
        copies,
        printer_name,
    })
}

/// Accepted page-range grammar: `all`, a single page, `start-end`, or a
/// comma-separated page list. Pages are 1-based and capped at
/// [`PAGE_MAX`]; a span must not be reversed.
fn is_valid_page_range(s: &str) -> bool {
    let s = s.trim();
    if s == "all" {
        return true;
    }

    let parse_page = |p: &str| -> Option<u32> {
        let n: u32 = p.trim().parse().ok()?;
        (1..=PAGE_MAX).contains(&n).then_some(n)
    };

    if let Some((start, end)) = s.split_once('-') {
        return match (parse_page(start), parse_page(end)) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        };
    }

    if s.contains(',') {
        return s.split(',').all(|p| parse_page(p).is_some());
    }

    parse_page(s).is_some()
}
