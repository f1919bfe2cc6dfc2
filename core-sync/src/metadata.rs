//! Sync metadata store
//!
//! One `<name>.meta` file per synced document under `<output>/.feishu2md`,
//! holding UTF-8 `Key=Value` lines. Key order is not significant and
//! unknown keys are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use core_bitable::sanitize_file_name_or;
use tracing::{debug, warn};

/// Hidden directory under each output dir
pub const METADATA_DIR: &str = ".feishu2md";
pub const METADATA_EXTENSION: &str = "meta";

const KEY_URL: &str = "URL";
const KEY_NAME: &str = "Name";
const KEY_ACTUAL_FILE_NAME: &str = "ActualFileName";
const KEY_LEGACY_DOCUMENT_NAME: &str = "DocumentName";
const KEY_REVISION_ID: &str = "RevisionID";
const KEY_CONTENT_HASH: &str = "ContentHash";
const KEY_SYNC_TIME: &str = "SyncTime";

/// Change-detection value of the last successful sync
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fingerprint {
    /// Linear revision counter of a docx document
    Revision(i64),
    /// Hex SHA-256 over title and rendered Markdown
    ContentHash(String),
    #[default]
    None,
}

/// Contents of one `.meta` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    /// Source link; the key used by [`SyncMetadataStore::lookup_by_url`]
    pub url: String,
    /// Configured or derived document name, also the `.meta` file stem
    pub name: String,
    /// File name relative to the document's output dir
    pub output_file_name: String,
    pub fingerprint: Fingerprint,
    /// Absent in records written by older versions
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncRecord {
    /// Serialize as `Key=Value` lines, one trailing newline
    pub fn to_meta_string(&self) -> String {
        let mut lines = vec![
            format!("{}={}", KEY_URL, self.url),
            format!("{}={}", KEY_NAME, self.name),
            format!("{}={}", KEY_ACTUAL_FILE_NAME, self.output_file_name),
        ];
        match &self.fingerprint {
            Fingerprint::Revision(revision) => {
                lines.push(format!("{}={}", KEY_REVISION_ID, revision))
            }
            Fingerprint::ContentHash(hash) => lines.push(format!("{}={}", KEY_CONTENT_HASH, hash)),
            Fingerprint::None => {}
        }
        if let Some(synced_at) = self.synced_at {
            lines.push(format!(
                "{}={}",
                KEY_SYNC_TIME,
                synced_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }

        let mut content = lines.join("\n");
        content.push('\n');
        content
    }

    /// Parse a `.meta` file; records without a URL are corrupt
    pub fn parse(content: &str) -> Option<Self> {
        let mut url = None;
        let mut name = String::new();
        let mut actual_file_name = None;
        let mut legacy_document_name = None;
        let mut revision = None;
        let mut content_hash = None;
        let mut synced_at = None;

        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim_end_matches('\r');
            match key.trim() {
                KEY_URL => url = Some(value.to_string()),
                KEY_NAME => name = value.to_string(),
                KEY_ACTUAL_FILE_NAME if !value.is_empty() => {
                    actual_file_name = Some(value.to_string())
                }
                KEY_LEGACY_DOCUMENT_NAME if !value.is_empty() => {
                    legacy_document_name = Some(value.to_string())
                }
                KEY_REVISION_ID => revision = value.trim().parse::<i64>().ok(),
                KEY_CONTENT_HASH if !value.is_empty() => content_hash = Some(value.to_string()),
                KEY_SYNC_TIME => {
                    synced_at = DateTime::parse_from_rfc3339(value.trim())
                        .ok()
                        .map(|time| time.with_timezone(&Utc))
                }
                _ => {}
            }
        }

        let url = url.filter(|url| !url.is_empty())?;
        let output_file_name = actual_file_name
            .or_else(|| legacy_document_name.map(|name| format!("{}.md", name)))
            .unwrap_or_default();
        let fingerprint = match (revision, content_hash) {
            (Some(revision), _) => Fingerprint::Revision(revision),
            (None, Some(hash)) => Fingerprint::ContentHash(hash),
            (None, None) => Fingerprint::None,
        };

        Some(Self {
            url,
            name,
            output_file_name,
            fingerprint,
            synced_at,
        })
    }
}

/// Metadata directory of one output dir
#[derive(Debug, Clone)]
pub struct SyncMetadataStore {
    dir: PathBuf,
}

impl SyncMetadataStore {
    /// Store rooted at `<output_dir>/.feishu2md`; nothing is created until the first write
    pub fn for_output_dir(output_dir: &Path) -> Self {
        Self {
            dir: output_dir.join(METADATA_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_file_name_or(name, "untitled"), METADATA_EXTENSION))
    }

    /// Persist a record, last write wins; I/O failures are logged and swallowed
    pub fn write(&self, record: &SyncRecord) {
        let path = self.path_for(&record.name);
        let result = fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, record.to_meta_string()));

        match result {
            Ok(()) => debug!(path = %path.display(), "Saved sync metadata"),
            Err(e) => warn!(
                name = %record.name,
                path = %path.display(),
                error = %e,
                "Failed to save sync metadata"
            ),
        }
    }

    /// Read the record stored under a document name
    pub fn read(&self, name: &str) -> Option<SyncRecord> {
        let content = fs::read_to_string(self.path_for(name)).ok()?;
        SyncRecord::parse(&content)
    }

    /// Find the record whose URL matches, scanning every `.meta` file
    pub fn lookup_by_url(&self, url: &str) -> Option<SyncRecord> {
        let entries = fs::read_dir(&self.dir).ok()?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(METADATA_EXTENSION) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                debug!(path = %path.display(), "Skipping unreadable metadata file");
                continue;
            };
            match SyncRecord::parse(&content) {
                Some(record) if record.url == url => return Some(record),
                Some(_) => {}
                None => debug!(path = %path.display(), "Skipping corrupt metadata file"),
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(name: &str, url: &str, fingerprint: Fingerprint) -> SyncRecord {
        SyncRecord {
            url: url.to_string(),
            name: name.to_string(),
            output_file_name: format!("{}.md", name),
            fingerprint,
            synced_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
        }
    }

    #[test]
    fn test_meta_format() {
        let content = record("Guide", "https://x/docx/a", Fingerprint::Revision(42)).to_meta_string();
        assert_eq!(
            content,
            "URL=https://x/docx/a\nName=Guide\nActualFileName=Guide.md\nRevisionID=42\nSyncTime=2024-05-01T08:30:00Z\n"
        );
    }

    #[test]
    fn test_parse_ignores_order_and_unknown_keys() {
        let content = "SyncTime=2024-05-01T16:30:00+08:00\nExtra=1\nContentHash=abc\nURL=https://x/wiki/w\nName=Page\r\n";
        let parsed = SyncRecord::parse(content).unwrap();

        assert_eq!(parsed.url, "https://x/wiki/w");
        assert_eq!(parsed.name, "Page");
        assert_eq!(parsed.fingerprint, Fingerprint::ContentHash("abc".to_string()));
        assert_eq!(
            parsed.synced_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_legacy_document_name() {
        let parsed = SyncRecord::parse("URL=u\nDocumentName=Old\n").unwrap();
        assert_eq!(parsed.output_file_name, "Old.md");
        assert_eq!(parsed.fingerprint, Fingerprint::None);
    }

    #[test]
    fn test_parse_without_url_is_corrupt() {
        assert!(SyncRecord::parse("Name=x\nRevisionID=1\n").is_none());
        assert!(SyncRecord::parse("URL=\n").is_none());
    }

    #[test]
    fn test_write_then_lookup() {
        let dir = TempDir::new().unwrap();
        let store = SyncMetadataStore::for_output_dir(dir.path());

        let first = record("Guide", "https://x/docx/a", Fingerprint::Revision(7));
        let second = record("Notes: v2", "https://x/wiki/b", Fingerprint::ContentHash("ff".into()));
        store.write(&first);
        store.write(&second);

        assert!(dir.path().join(".feishu2md/Notes_ v2.meta").exists());
        assert_eq!(store.lookup_by_url("https://x/wiki/b"), Some(second.clone()));
        assert_eq!(store.lookup_by_url("https://x/docx/a"), Some(first));
        assert_eq!(store.read("Notes: v2"), Some(second));
        assert_eq!(store.lookup_by_url("https://x/other"), None);
    }

    #[test]
    fn test_write_is_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = SyncMetadataStore::for_output_dir(dir.path());

        store.write(&record("Guide", "https://x/docx/a", Fingerprint::Revision(1)));
        store.write(&record("Guide", "https://x/docx/a", Fingerprint::Revision(2)));

        assert_eq!(
            store.read("Guide").unwrap().fingerprint,
            Fingerprint::Revision(2)
        );
    }

    #[test]
    fn test_lookup_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = SyncMetadataStore::for_output_dir(dir.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("broken.meta"), "no url here\n").unwrap();
        fs::write(store.dir().join("ignored.txt"), "URL=https://x/docx/a\n").unwrap();

        assert_eq!(store.lookup_by_url("https://x/docx/a"), None);

        store.write(&record("Guide", "https://x/docx/a", Fingerprint::None));
        assert!(store.lookup_by_url("https://x/docx/a").is_some());
    }

    #[test]
    fn test_lookup_without_directory() {
        let dir = TempDir::new().unwrap();
        let store = SyncMetadataStore::for_output_dir(&dir.path().join("missing"));
        assert_eq!(store.lookup_by_url("https://x/docx/a"), None);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let store = SyncMetadataStore::for_output_dir(&blocker);
        store.write(&record("Guide", "https://x/docx/a", Fingerprint::None));

        assert_eq!(store.read("Guide"), None);
    }
}
