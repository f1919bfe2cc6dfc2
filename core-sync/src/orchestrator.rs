//! Sync orchestrator
//!
//! Runs one `sync run`: optionally clears the output directory, asks the
//! planner which targets need work, then dispatches them to a bounded pool
//! of workers and collects a report.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use bridge_traits::time::{Clock, SystemClock};
use core_bitable::{ExportFormat, ExportRequest, TableExporter};
use core_runtime::config::{SyncMode, SyncSettings};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::download::{DocumentDownloader, DocumentRequest};
use crate::error::{Result, SyncError};
use crate::metadata::{Fingerprint, SyncMetadataStore, SyncRecord};
use crate::planner::{IncrementalPlanner, PlannerSettings};
use crate::remote::RemoteDocuments;
use crate::target::{DocumentTarget, TargetKind};

/// Remove everything inside `dir`, keeping the directory itself
///
/// Empty, `/` and `.` paths are refused. A missing directory is not an error.
pub fn clean_output_dir(dir: &Path) -> Result<()> {
    let raw = dir.to_string_lossy();
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "/" || trimmed == "." || trimmed == "./" {
        return Err(SyncError::UnsafeOutputDir(raw.into_owned()));
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    info!(dir = %dir.display(), "Cleaned output directory");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub name: String,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total: usize,
    pub planned: usize,
    pub succeeded: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn skipped(&self) -> usize {
        self.total - self.planned
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct SyncOrchestrator {
    downloader: DocumentDownloader,
    exporter: Arc<TableExporter>,
    planner: Arc<IncrementalPlanner>,
    settings: SyncSettings,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    pub fn new(
        downloader: DocumentDownloader,
        exporter: TableExporter,
        remote: Arc<dyn RemoteDocuments>,
        settings: SyncSettings,
    ) -> Self {
        let planner = IncrementalPlanner::new(
            remote,
            PlannerSettings {
                use_original_title: settings.use_original_title,
            },
        );

        Self {
            downloader,
            exporter: Arc::new(exporter),
            planner: Arc::new(planner),
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sync `targets`; `force` behaves like `clean_all` for this run
    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    pub async fn run(&self, targets: &[DocumentTarget], force: bool) -> SyncReport {
        let mode = if force {
            SyncMode::CleanAll
        } else {
            self.settings.sync_mode
        };
        info!(mode = %mode, concurrency = self.settings.concurrency(), "Starting sync");

        if mode == SyncMode::CleanAll {
            if let Err(e) = clean_output_dir(Path::new(&self.settings.output_dir)) {
                warn!(error = %e, "Failed to clean output directory");
            }
        }

        let planned = self.planner.plan(targets, mode).await;
        let mut report = SyncReport {
            total: targets.len(),
            planned: planned.len(),
            ..Default::default()
        };
        if planned.is_empty() {
            info!("All documents are up to date");
            return report;
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency()));
        let mut tasks = JoinSet::new();
        // Lets a panicked worker still be reported under its document
        let mut in_flight: HashMap<task::Id, (String, String)> = HashMap::new();
        for target in planned {
            let worker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let label = (target.name.clone(), target.url.clone());
            let handle = tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => worker.sync_target(&target).await,
                    Err(e) => Err(SyncError::Task(e.to_string())),
                };
                (target, result)
            });
            in_flight.insert(handle.id(), label);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, (target, Ok(())))) => {
                    in_flight.remove(&id);
                    info!(name = %target.name, kind = %target.kind, "Synced");
                    report.succeeded += 1;
                }
                Ok((id, (target, Err(e)))) => {
                    in_flight.remove(&id);
                    error!(name = %target.name, url = %target.url, error = %e, "Sync failed");
                    report.failures.push(SyncFailure {
                        name: target.name,
                        url: target.url,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    let (name, url) = in_flight.remove(&e.id()).unwrap_or_default();
                    error!(name = %name, url = %url, error = %e, "Sync worker aborted");
                    report.failures.push(SyncFailure {
                        name,
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failures.len(),
            skipped = report.skipped(),
            "Sync finished"
        );
        report
    }

    async fn sync_target(&self, target: &DocumentTarget) -> Result<()> {
        debug!(name = %target.name, kind = %target.kind, "Syncing target");
        let use_original_title = self.settings.use_original_title;

        match target.kind {
            TargetKind::Docx | TargetKind::WikiPage => {
                let request = DocumentRequest {
                    output_dir: target.output_dir.clone(),
                    name: (!use_original_title).then(|| target.name.clone()),
                    use_original_title,
                    skip_images: target.skip_images,
                };
                let outcome = self.downloader.download_document(&target.url, &request).await?;
                self.remember(target, outcome.file_name, outcome.fingerprint);
            }
            TargetKind::WikiSpace => {
                let downloaded = self
                    .downloader
                    .download_wiki_space(&target.url, &target.output_dir, target.skip_images)
                    .await?;
                debug!(name = %target.name, downloaded, "Wiki space downloaded");
            }
            TargetKind::Folder => {
                let downloaded = self
                    .downloader
                    .download_folder(&target.url, &target.output_dir, target.skip_images)
                    .await?;
                debug!(name = %target.name, downloaded, "Folder downloaded");
            }
            TargetKind::Csv | TargetKind::Xlsx => {
                let format = if target.kind == TargetKind::Xlsx {
                    ExportFormat::Xlsx
                } else {
                    ExportFormat::Csv
                };
                let mut request =
                    ExportRequest::new(target.url.clone(), format, target.output_dir.clone());
                request.base_name = (!use_original_title).then(|| target.name.clone());
                request.view_scoped = target.view_fields_only;
                request.filter_images = target.skip_images;

                let outcome = self.exporter.export(&request).await?;
                self.remember(target, outcome.file_name, Fingerprint::None);
            }
        }

        Ok(())
    }

    fn remember(&self, target: &DocumentTarget, output_file_name: String, fingerprint: Fingerprint) {
        SyncMetadataStore::for_output_dir(&target.output_dir).write(&SyncRecord {
            url: target.url.clone(),
            name: target.name.clone(),
            output_file_name,
            fingerprint,
            synced_at: Some(self.clock.now()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_refuses_unsafe_paths() {
        for path in ["", "/", ".", "  "] {
            assert!(matches!(
                clean_output_dir(Path::new(path)),
                Err(SyncError::UnsafeOutputDir(_))
            ));
        }
    }

    #[test]
    fn test_clean_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(clean_output_dir(&dir.path().join("absent")).is_ok());
    }

    #[test]
    fn test_clean_removes_entries_but_keeps_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("group/.feishu2md")).unwrap();
        fs::write(dir.path().join("group/Doc.md"), "x").unwrap();
        fs::write(dir.path().join("top.md"), "x").unwrap();

        clean_output_dir(dir.path()).unwrap();

        assert!(dir.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_report_counts() {
        let report = SyncReport {
            total: 5,
            planned: 3,
            succeeded: 2,
            failures: vec![SyncFailure {
                name: "Doc".to_string(),
                url: "u".to_string(),
                error: "boom".to_string(),
            }],
        };
        assert_eq!(report.skipped(), 2);
        assert!(!report.is_success());
    }
}
