pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod job;
pub mod lifecycle;
pub mod limiter;
pub mod storage;
pub mod store;
pub mod sweeper;
pub mod telemetry;

pub use config::{load_config, RateLimitConfig, ServiceConfig};
pub use error::{
    AdvanceError, ConfigError, PrintspoolError, Result, StorageError, StoreError, SubmitError,
};
pub use ingest::{IngestGateway, OptionsInput, SubmissionReceipt};
pub use job::{ColorMode, JobStatus, PrintJob, PrintOptions};
pub use lifecycle::LifecycleUpdater;
pub use limiter::{Decision, RateLimiter};
pub use storage::DocumentStorage;
pub use store::{JobStore, JobSummary, StatusView};
pub use sweeper::{RetentionSweeper, SweepOutcome};
pub use telemetry::init_logging;
