//! # Sync Module
//!
//! Keeps a local directory in step with a list of Feishu documents.
//!
//! ## Overview
//!
//! This module manages:
//! - Turning configured documents into typed sync targets
//! - Per-directory sync metadata (`.feishu2md/<name>.meta`)
//! - Incremental planning by revision id or content hash
//! - Downloading documents, folders and wiki spaces to Markdown
//! - Running a sync with a bounded worker pool and reporting failures
//!
//! ## Components
//!
//! - **Targets** (`target`): kind detection and per-document overrides
//! - **Metadata** (`metadata`): `Key=Value` records of the last sync
//! - **Remote** (`remote`): remote revision and content lookups
//! - **Planner** (`planner`): fetch or skip decisions
//! - **Download** (`download`): Markdown and image output
//! - **Orchestrator** (`orchestrator`): one complete sync run

pub mod download;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod planner;
pub mod remote;
pub mod target;

#[cfg(test)]
mod testing;

pub use download::{
    DocumentDownloader, DocumentRequest, DownloadOutcome, DownloadSettings, CONTAINER_CONCURRENCY,
};
pub use error::{Result, SyncError};
pub use metadata::{Fingerprint, SyncMetadataStore, SyncRecord, METADATA_DIR};
pub use orchestrator::{clean_output_dir, SyncFailure, SyncOrchestrator, SyncReport};
pub use planner::{FetchReason, IncrementalPlanner, PlannerSettings, SkipReason, SyncDecision};
pub use remote::{fingerprint_content, ProviderDocuments, RemoteContent, RemoteDocuments};
pub use target::{DocumentTarget, TargetKind};
