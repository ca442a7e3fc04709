//! Print job domain model.
//!
//! A `PrintJob` is the sole entity the service tracks: one submitted
//! document plus its print options and lifecycle timestamps. The status
//! enum has exactly three variants and only advances forward
//! (`Pending → Processing → Printed`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a print job.
///
/// The stored representation is the lowercase string returned by
/// [`JobStatus::as_str`]; the capitalized form from [`JobStatus::label`]
/// is used only at the read boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Printed,
}

impl JobStatus {
    /// Canonical stored form.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Printed => "printed",
        }
    }

    /// Human-readable label for status projections.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Processing => "Processing",
            JobStatus::Printed => "Printed",
        }
    }

    /// Parses the stored form. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "printed" => Some(JobStatus::Printed),
            _ => None,
        }
    }

    /// The only status a job may hold immediately before advancing to
    /// `self`. `Pending` has no predecessor — it is never a transition
    /// target.
    pub fn predecessor(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Pending => None,
            JobStatus::Processing => Some(JobStatus::Pending),
            JobStatus::Printed => Some(JobStatus::Processing),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color rendering mode for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Color,
    #[default]
    Grayscale,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Color => "color",
            ColorMode::Grayscale => "grayscale",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "color" => Some(ColorMode::Color),
            "grayscale" => Some(ColorMode::Grayscale),
            _ => None,
        }
    }
}

/// Print options, immutable once a job is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOptions {
    /// Paper size label (e.g. "A4", "Letter").
    pub paper_size: String,
    pub color_mode: ColorMode,
    /// Page selection: "all", a single page, "start-end", or a
    /// comma-separated page list.
    pub page_range: String,
    pub copies: u32,
    /// Target printer label, or "default".
    pub printer_name: String,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            paper_size: "A4".to_string(),
            color_mode: ColorMode::Grayscale,
            page_range: "all".to_string(),
            copies: 1,
            printer_name: "default".to_string(),
        }
    }
}

/// One tracked print submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    /// Opaque URL-safe identifier, assigned at creation, never reused.
    pub job_id: String,
    /// Original filename of the submitted document.
    pub filename: String,
    /// Size of the submitted document in bytes.
    pub file_size: u64,
    /// Pointer to where the document bytes live. Owned by the job store;
    /// deleted together with the record.
    pub storage_ref: String,
    pub options: PrintOptions,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    /// Stamped exactly once, on `Pending → Processing`.
    pub processed_at: Option<DateTime<Utc>>,
    /// Stamped exactly once, on `Processing → Printed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PrintJob {
    /// Creates a fresh `Pending` job with a newly generated identifier.
    pub fn new(
        filename: String,
        file_size: u64,
        storage_ref: String,
        options: PrintOptions,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: generate_job_id(),
            filename,
            file_size,
            storage_ref,
            options,
            status: JobStatus::Pending,
            error_message: None,
            uploaded_at,
            processed_at: None,
            completed_at: None,
        }
    }

    /// Replaces the identifier with a fresh one. Used when creation lost
    /// the (astronomically unlikely) duplicate-id lottery.
    pub fn regenerate_id(&mut self) {
        self.job_id = generate_job_id();
    }

    /// The scannable tracking token for this job (see [`tracking_token`]).
    pub fn tracking_token(&self, base_url: &str) -> String {
        tracking_token(base_url, &self.job_id)
    }
}

/// Generates a fresh job identifier (UUID v4, hyphenated string form).
pub fn generate_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derives the tracking token for a job: the URL-safe base64 encoding of
/// the job's status-check URL. Purely derived from `job_id` and the
/// configured base URL — never stored as independent state.
pub fn tracking_token(base_url: &str, job_id: &str) -> String {
    let url = format!("{}/print/status/{}", base_url.trim_end_matches('/'), job_id);
    URL_SAFE_NO_PAD.encode(url.as_bytes())
}
