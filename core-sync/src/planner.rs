//! Incremental planner
//!
//! Decides which targets need a fetch by comparing the metadata left by the
//! previous run with the current remote state. The planner only reads
//! metadata; the orchestrator writes it after a successful fetch.

use std::fmt;
use std::sync::Arc;

use core_bitable::sanitize_file_name_or;
use core_runtime::config::SyncMode;
use tracing::{debug, info, instrument};

use crate::metadata::{Fingerprint, SyncMetadataStore};
use crate::remote::{link_token, RemoteDocuments};
use crate::target::DocumentTarget;

/// Why a target has to be downloaded again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReason {
    /// Full re-sync requested
    CleanAll,
    /// Folder or wiki space; its children are planned when expanded
    Container,
    /// No `.meta` record for this URL
    NoMetadata,
    /// Record exists but the output file is gone
    OutputMissing,
    /// Stored revision is missing or differs from the remote one
    RevisionChanged { stored: Option<i64>, current: i64 },
    /// Stored content hash differs from the freshly rendered one
    ContentChanged,
    /// Remote state could not be read
    RemoteLookupFailed(String),
}

/// Why a target is left alone this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Bitable export already on disk
    TableUpToDate,
    RevisionUnchanged(i64),
    ContentUnchanged,
}

/// Planner outcome for one target.
///
/// `Display` renders the short form used in the sync log, e.g.
/// `fetch (revision 3 -> 4)` or `skip (content unchanged)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    Fetch(FetchReason),
    Skip(SkipReason),
}

impl SyncDecision {
    /// True for every `Fetch` variant
    pub fn should_fetch(&self) -> bool {
        matches!(self, SyncDecision::Fetch(_))
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDecision::Fetch(FetchReason::CleanAll) => write!(f, "fetch (clean all)"),
            SyncDecision::Fetch(FetchReason::Container) => write!(f, "fetch (container)"),
            SyncDecision::Fetch(FetchReason::NoMetadata) => write!(f, "fetch (no metadata)"),
            SyncDecision::Fetch(FetchReason::OutputMissing) => write!(f, "fetch (output missing)"),
            SyncDecision::Fetch(FetchReason::RevisionChanged { stored, current }) => match stored {
                Some(stored) => write!(f, "fetch (revision {} -> {})", stored, current),
                None => write!(f, "fetch (revision {} not recorded)", current),
            },
            SyncDecision::Fetch(FetchReason::ContentChanged) => write!(f, "fetch (content changed)"),
            SyncDecision::Fetch(FetchReason::RemoteLookupFailed(e)) => {
                write!(f, "fetch (remote lookup failed: {})", e)
            }
            SyncDecision::Skip(SkipReason::TableUpToDate) => write!(f, "skip (table present)"),
            SyncDecision::Skip(SkipReason::RevisionUnchanged(revision)) => {
                write!(f, "skip (revision {})", revision)
            }
            SyncDecision::Skip(SkipReason::ContentUnchanged) => write!(f, "skip (content unchanged)"),
        }
    }
}

/// Naming flags the downloader uses, so predicted names match real ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerSettings {
    /// Name outputs after the remote title instead of the configured name
    pub use_original_title: bool,
}

/// Compares `.meta` records against the remote state.
///
/// Read-only over the metadata store; remote lookups go through
/// [`RemoteDocuments`] so tests can swap in a mock.
pub struct IncrementalPlanner {
    remote: Arc<dyn RemoteDocuments>,
    settings: PlannerSettings,
}

impl IncrementalPlanner {
    pub fn new(remote: Arc<dyn RemoteDocuments>, settings: PlannerSettings) -> Self {
        Self { remote, settings }
    }

    /// Targets that need work under `mode`, in input order
    #[instrument(skip(self, targets), fields(targets = targets.len(), mode = %mode))]
    pub async fn plan(&self, targets: &[DocumentTarget], mode: SyncMode) -> Vec<DocumentTarget> {
        if mode == SyncMode::CleanAll {
            return targets.to_vec();
        }

        let mut selected = Vec::new();
        for target in targets {
            let decision = self.evaluate(target).await;
            debug!(name = %target.name, decision = %decision, "Planned target");
            if decision.should_fetch() {
                selected.push(target.clone());
            } else {
                info!(name = %target.name, decision = %decision, "Skipping up-to-date document");
            }
        }
        selected
    }

    /// Incremental decision for one target
    pub async fn evaluate(&self, target: &DocumentTarget) -> SyncDecision {
        let store = SyncMetadataStore::for_output_dir(&target.output_dir);

        if target.kind.is_table() {
            return match store.lookup_by_url(&target.url) {
                None => SyncDecision::Fetch(FetchReason::NoMetadata),
                Some(record)
                    if record.output_file_name.is_empty()
                        || !target.output_dir.join(&record.output_file_name).exists() =>
                {
                    SyncDecision::Fetch(FetchReason::OutputMissing)
                }
                Some(_) => SyncDecision::Skip(SkipReason::TableUpToDate),
            };
        }

        if target.kind.is_container() {
            return SyncDecision::Fetch(FetchReason::Container);
        }

        let fallback = link_token(&target.url);
        let stem = if self.settings.use_original_title {
            match self.remote.document_title(&target.url).await {
                Ok(title) => sanitize_file_name_or(&title, &fallback),
                Err(e) => return SyncDecision::Fetch(FetchReason::RemoteLookupFailed(e.to_string())),
            }
        } else {
            sanitize_file_name_or(&target.name, &fallback)
        };
        let expected = target.output_dir.join(format!("{}.md", stem));
        if !expected.exists() {
            return SyncDecision::Fetch(FetchReason::OutputMissing);
        }

        let Some(record) = store.lookup_by_url(&target.url) else {
            return SyncDecision::Fetch(FetchReason::NoMetadata);
        };

        match self.remote.document_revision(&target.url).await {
            Ok(Some(current)) => {
                return match record.fingerprint {
                    Fingerprint::Revision(stored) if stored == current => {
                        SyncDecision::Skip(SkipReason::RevisionUnchanged(current))
                    }
                    Fingerprint::Revision(stored) => {
                        SyncDecision::Fetch(FetchReason::RevisionChanged {
                            stored: Some(stored),
                            current,
                        })
                    }
                    _ => SyncDecision::Fetch(FetchReason::RevisionChanged {
                        stored: None,
                        current,
                    }),
                };
            }
            Ok(None) => {}
            Err(e) => return SyncDecision::Fetch(FetchReason::RemoteLookupFailed(e.to_string())),
        }

        let current = match self.remote.document_content(&target.url).await {
            Ok(content) => content.content_hash(),
            Err(e) => return SyncDecision::Fetch(FetchReason::RemoteLookupFailed(e.to_string())),
        };
        match record.fingerprint {
            Fingerprint::ContentHash(stored) if stored == current => {
                SyncDecision::Skip(SkipReason::ContentUnchanged)
            }
            _ => SyncDecision::Fetch(FetchReason::ContentChanged),
        }
    }
}
