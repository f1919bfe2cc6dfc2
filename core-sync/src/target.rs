//! Sync targets
//!
//! A configured document plus everything resolved from the global settings:
//! its kind, effective flags and the directory its output lands in.

use std::fmt;
use std::path::PathBuf;

use core_runtime::config::{DocConfig, SyncSettings};
use tracing::warn;

/// What a configured URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Docx,
    WikiPage,
    WikiSpace,
    Folder,
    Csv,
    Xlsx,
}

impl TargetKind {
    /// Detect the kind from the URL shape
    pub fn detect(url: &str) -> Self {
        if url.contains("/wiki/settings/") {
            TargetKind::WikiSpace
        } else if url.contains("/wiki/") {
            TargetKind::WikiPage
        } else if url.contains("/folder/") {
            TargetKind::Folder
        } else if url.contains("/base/") {
            TargetKind::Csv
        } else {
            TargetKind::Docx
        }
    }

    /// Parse a configured `type` value
    pub fn from_config(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" => Some(TargetKind::Docx),
            "wiki" | "wiki_page" => Some(TargetKind::WikiPage),
            "wiki_space" => Some(TargetKind::WikiSpace),
            "folder" => Some(TargetKind::Folder),
            "csv" => Some(TargetKind::Csv),
            "xlsx" => Some(TargetKind::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Docx => "docx",
            TargetKind::WikiPage => "wiki_page",
            TargetKind::WikiSpace => "wiki_space",
            TargetKind::Folder => "folder",
            TargetKind::Csv => "csv",
            TargetKind::Xlsx => "xlsx",
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, TargetKind::Csv | TargetKind::Xlsx)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, TargetKind::WikiSpace | TargetKind::Folder)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document to sync, with overrides applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTarget {
    pub name: String,
    pub url: String,
    pub group: String,
    pub kind: TargetKind,
    pub skip_images: bool,
    pub view_fields_only: bool,
    /// Base dir, or `<base>/<group>` when organizing by group
    pub output_dir: PathBuf,
}

impl DocumentTarget {
    pub fn from_config(doc: &DocConfig, settings: &SyncSettings) -> Self {
        let kind = match doc.kind.as_deref().filter(|kind| !kind.trim().is_empty()) {
            Some(value) => TargetKind::from_config(value).unwrap_or_else(|| {
                warn!(name = %doc.name, kind = value, "Unknown document type; detecting from URL");
                TargetKind::detect(&doc.url)
            }),
            None => TargetKind::detect(&doc.url),
        };

        Self {
            name: doc.name.clone(),
            url: doc.url.clone(),
            group: doc.group.clone(),
            kind,
            skip_images: doc.skip_images.unwrap_or(settings.skip_images),
            view_fields_only: doc
                .bitable_view_fields_only
                .unwrap_or(settings.bitable_view_fields_only),
            output_dir: settings.group_dir(&doc.group),
        }
    }
}
