//! Shared test utilities for printspool integration tests.
//!
//! `TestHarness` wires an in-memory database, a temp-dir document store,
//! and the ingest/lifecycle components together the way a host
//! application would.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use printspool::db::Database;
use printspool::{
    DocumentStorage, IngestGateway, JobStore, LifecycleUpdater, RetentionSweeper, ServiceConfig,
};

/// Isolated environment for exercising the full submission lifecycle.
pub struct TestHarness {
    temp_dir: TempDir,
    pub config: ServiceConfig,
    pub store: JobStore,
    pub gateway: IngestGateway,
    pub updater: LifecycleUpdater,
}

impl TestHarness {
    /// Harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// Harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let storage = DocumentStorage::new(temp_dir.path().join("documents"));
        let store = JobStore::new(db, storage);
        let gateway = IngestGateway::new(store.clone(), &config);
        let updater = LifecycleUpdater::new(store.clone());

        Self {
            temp_dir,
            config,
            store,
            gateway,
            updater,
        }
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.temp_dir.path().join("documents")
    }

    /// Sweeper bound to this harness's store and configured retention.
    pub fn sweeper(&self) -> RetentionSweeper {
        RetentionSweeper::new(self.store.clone(), self.config.retention_days)
    }

    /// Files currently under the document root.
    pub fn stored_file_count(&self) -> usize {
        match std::fs::read_dir(self.documents_dir()) {
            Ok(entries) => entries.filter_map(|e| e.ok()).count(),
            Err(_) => 0,
        }
    }
}

/// A syntactically plausible PDF payload padded to `total` bytes.
pub fn pdf_bytes(total: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    while bytes.len() < total {
        bytes.push(b'0');
    }
    bytes
}
