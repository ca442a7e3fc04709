use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum PrintspoolError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Lifecycle error: {0}")]
    Advance(#[from] AdvanceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors from the document byte store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid filename: '{0}'")]
    InvalidFilename(String),

    #[error("No available name for '{0}' after 1000 attempts")]
    NoAvailableName(PathBuf),
}

/// Errors from the job store contract.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Status conflict for job {job_id}: no longer '{expected}'")]
    Conflict { job_id: String, expected: JobStatus },

    #[error("Duplicate job id: {0}")]
    DuplicateId(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from document submission. The first four are the client's
/// fault and are never retried automatically.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Document too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Invalid color mode: '{0}'")]
    InvalidColorMode(String),

    #[error("Copies must be between 1 and {max}, got {got}")]
    InvalidCopies { got: u32, max: u32 },

    #[error("Invalid page range: '{0}'")]
    InvalidPageRange(String),

    #[error("Failed to store document: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to create job record: {0}")]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// Whether this error is a validation rejection (the client's fault)
    /// as opposed to a storage or database failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmitError::UnsupportedFormat(_)
                | SubmitError::TooLarge { .. }
                | SubmitError::InvalidColorMode(_)
                | SubmitError::InvalidCopies { .. }
                | SubmitError::InvalidPageRange(_)
        )
    }
}

/// Errors from lifecycle transitions.
#[derive(Error, Debug)]
pub enum AdvanceError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for job {job_id}: {current} -> {requested}")]
    InvalidTransition {
        job_id: String,
        current: JobStatus,
        requested: JobStatus,
    },

    #[error("Lost transition race for job {job_id}: status is no longer '{expected}'")]
    Conflict { job_id: String, expected: JobStatus },

    #[error("Invalid update request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PrintspoolError>;
