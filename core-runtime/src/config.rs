//! # Configuration
//!
//! Two configuration documents drive the tool:
//!
//! - [`AppConfig`]: application credentials and Markdown output options,
//!   stored as JSON at `<user config dir>/feishu2md/config.json`.
//!   `FEISHU_APP_ID` / `FEISHU_APP_SECRET` override the stored credentials.
//! - [`SyncConfig`]: the document list plus sync and merge settings, stored
//!   as YAML (or JSON, chosen by file extension).
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{AppConfig, SyncConfig};
//!
//! let app = AppConfig::load_default()?.with_env_overrides(|key| std::env::var(key).ok());
//! app.validate()?;
//!
//! let (sync, path) = SyncConfig::load(None)?;
//! for doc in sync.documents(Some("team")) {
//!     println!("{} -> {}", doc.name, doc.url);
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the user config dir
pub const APP_DIR_NAME: &str = "feishu2md";

/// Environment variable opting system fields into Bitable exports
pub const INCLUDE_SYSTEM_FIELDS_ENV: &str = "FEISHU2MD_INCLUDE_SYSTEM_FIELDS";

pub const APP_ID_ENV: &str = "FEISHU_APP_ID";
pub const APP_SECRET_ENV: &str = "FEISHU_APP_SECRET";

const DEFAULT_OUTPUT_DIR: &str = "./feishu_docs";
const DEFAULT_CONCURRENCY: i32 = 3;

/// Local file names tried, in order, when no sync config path is given
const LOCAL_SYNC_CONFIG_NAMES: &[&str] = &[
    "config.yml",
    "config.yaml",
    "sync_config.yaml",
    "sync_config.yml",
];

/// File names tried, in order, inside the user config directory
const USER_SYNC_CONFIG_NAMES: &[&str] = &["config.yaml", "config.yml", "config.json"];

fn user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(Error::NoConfigDir)
}

/// Interpret a boolean-ish flag value (`1`, `true`, `yes`)
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Read the system-field opt-in from the environment.
///
/// Call once at startup and pass the result down.
pub fn include_system_fields_from_env() -> bool {
    std::env::var(INCLUDE_SYSTEM_FIELDS_ENV)
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

// ============================================================================
// AppConfig
// ============================================================================

/// Tenant app credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeishuCredentials {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
}

impl std::fmt::Debug for FeishuCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuCredentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

/// Markdown output options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory (relative to the document output dir) receiving images
    pub image_dir: String,
    /// Name downloaded files after the remote title
    pub title_as_filename: bool,
    /// Render underline/strikethrough with HTML tags
    pub use_html_tags: bool,
    /// Keep remote image tokens instead of downloading images
    pub skip_img_download: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image_dir: "static".to_string(),
            title_as_filename: false,
            use_html_tags: false,
            skip_img_download: false,
        }
    }
}

/// Application configuration (credentials + output options)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feishu: FeishuCredentials,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Default location: `<user config dir>/feishu2md/config.json`
    pub fn default_path() -> Result<PathBuf> {
        Ok(user_config_dir()?.join("config.json"))
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "App config not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }

    /// Save as pretty JSON, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialize {
                what: "app config",
                message: e.to_string(),
            })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Apply credential overrides from a variable lookup (usually the process env)
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(app_id) = lookup(APP_ID_ENV).filter(|v| !v.is_empty()) {
            self.feishu.app_id = app_id;
        }
        if let Some(app_secret) = lookup(APP_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.feishu.app_secret = app_secret;
        }
        self
    }

    /// Fail fast when credentials are missing
    pub fn validate(&self) -> Result<()> {
        if self.feishu.app_id.is_empty() || self.feishu.app_secret.is_empty() {
            return Err(Error::MissingCredentials(format!(
                "app id and secret are required. Run `feishu2md config --app-id <id> \
                 --app-secret <secret>` or set {} / {}",
                APP_ID_ENV, APP_SECRET_ENV
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SyncConfig
// ============================================================================

/// How `sync run` treats existing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Clear the output directory and fetch everything
    #[default]
    CleanAll,
    /// Only fetch documents whose remote state changed
    Incremental,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::CleanAll => write!(f, "clean_all"),
            SyncMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// Global sync settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub output_dir: String,
    pub sync_mode: SyncMode,
    pub concurrent_downloads: i32,
    /// Store documents under `<output_dir>/<group>`
    pub organize_by_group: bool,
    pub skip_images: bool,
    /// Name files after the remote title instead of the configured name
    pub use_original_title: bool,
    /// Export only the fields visible in the Bitable view
    pub bitable_view_fields_only: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            sync_mode: SyncMode::CleanAll,
            concurrent_downloads: DEFAULT_CONCURRENCY,
            organize_by_group: true,
            skip_images: false,
            use_original_title: false,
            bitable_view_fields_only: false,
        }
    }
}

impl SyncSettings {
    /// Worker pool size, at least 1
    pub fn concurrency(&self) -> usize {
        self.concurrent_downloads.max(1) as usize
    }

    /// Output directory for a document group
    pub fn group_dir(&self, group: &str) -> PathBuf {
        let base = PathBuf::from(&self.output_dir);
        if self.organize_by_group && !group.is_empty() {
            base.join(group)
        } else {
            base
        }
    }
}

/// Settings of the `merge` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    pub input_dir: String,
    pub output_dir: String,
    pub filename: String,
    pub include_timestamp: bool,
    pub sort_files: bool,
    pub header_title: String,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            input_dir: DEFAULT_OUTPUT_DIR.to_string(),
            output_dir: "./".to_string(),
            filename: "merged_docs.md".to_string(),
            include_timestamp: true,
            sort_files: true,
            header_title: "合并的文档集".to_string(),
        }
    }
}

/// One configured document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Per-document override of `sync.skip_images`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_images: Option<bool>,
    /// Kind override: `docx`, `wiki`, `wiki_page`, `wiki_space`, `folder`, `csv`, `xlsx`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Per-document override of `sync.bitable_view_fields_only`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitable_view_fields_only: Option<bool>,
}

/// Sync configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub version: String,
    pub sync: SyncSettings,
    pub merge: MergeSettings,
    pub documents: Vec<DocConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            sync: SyncSettings::default(),
            merge: MergeSettings::default(),
            documents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> Option<ConfigFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Some(ConfigFormat::Yaml),
        Some("json") => Some(ConfigFormat::Json),
        _ => None,
    }
}

fn with_extension_suffix(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

impl SyncConfig {
    /// Resolve the config file path.
    ///
    /// Without an explicit path: local candidates in `search_dir`, then the
    /// user config dir, defaulting to `<user dir>/config.yaml`. Extension-less
    /// paths try `.yaml`, `.yml`, `.json` and default to `.yaml`.
    pub fn locate(
        explicit: Option<&Path>,
        search_dir: &Path,
        user_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let local = LOCAL_SYNC_CONFIG_NAMES
                    .iter()
                    .map(|name| search_dir.join(name))
                    .find(|candidate| candidate.is_file());
                match local {
                    Some(found) => found,
                    None => {
                        let user_dir = user_dir.ok_or(Error::NoConfigDir)?;
                        USER_SYNC_CONFIG_NAMES
                            .iter()
                            .map(|name| user_dir.join(name))
                            .find(|candidate| candidate.is_file())
                            .unwrap_or_else(|| user_dir.join("config.yaml"))
                    }
                }
            }
        };

        if format_of(&path).is_some() {
            return Ok(path);
        }

        Ok(["yaml", "yml", "json"]
            .iter()
            .map(|ext| with_extension_suffix(&path, ext))
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| with_extension_suffix(&path, "yaml")))
    }

    /// Resolve against the current directory and the user config dir
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        let user_dir = user_config_dir().ok();
        Self::locate(explicit, &cwd, user_dir.as_deref())
    }

    /// Load the sync configuration, returning it with the resolved path.
    ///
    /// A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = Self::resolve_path(explicit)?;
        let config = Self::load_from(&path)?;
        Ok((config, path))
    }

    /// Load from a concrete path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Sync config not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let parse_error = |message: String| Error::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut config: SyncConfig = match format_of(path) {
            Some(ConfigFormat::Json) => {
                serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            Some(ConfigFormat::Yaml) => {
                serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            None => match serde_yaml::from_str(&content) {
                Ok(config) => config,
                Err(_) => serde_json::from_str(&content).map_err(|_| {
                    parse_error("unable to parse config file as YAML or JSON".to_string())
                })?,
            },
        };

        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        if self.sync.concurrent_downloads <= 0 {
            self.sync.concurrent_downloads = DEFAULT_CONCURRENCY;
        }
        if self.sync.output_dir.trim().is_empty() {
            self.sync.output_dir = DEFAULT_OUTPUT_DIR.to_string();
        }
    }

    /// Save to `path` (YAML unless the extension says JSON), creating the parent dir
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        let path = if format_of(path).is_some() {
            path.to_path_buf()
        } else {
            with_extension_suffix(path, "yaml")
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = match format_of(&path) {
            Some(ConfigFormat::Json) => serde_json::to_string_pretty(self)
                .map_err(|e| Error::Serialize {
                    what: "sync config",
                    message: e.to_string(),
                })?,
            _ => serde_yaml::to_string(self)
                .map_err(|e| Error::Serialize {
                    what: "sync config",
                    message: e.to_string(),
                })?,
        };

        fs::write(&path, content)?;
        Ok(path)
    }

    /// Append a document; URL and name must both be unique
    pub fn add_document(&mut self, name: &str, url: &str, group: &str) -> Result<()> {
        for doc in &self.documents {
            if doc.url == url {
                return Err(Error::Config(format!(
                    "document with URL {} already exists",
                    url
                )));
            }
            if doc.name == name {
                return Err(Error::Config(format!(
                    "document with name {} already exists",
                    name
                )));
            }
        }

        self.documents.push(DocConfig {
            name: name.to_string(),
            url: url.to_string(),
            group: group.to_string(),
            ..DocConfig::default()
        });
        Ok(())
    }

    /// Remove a document by index (when the argument parses as one) or by name
    pub fn remove_document(&mut self, name_or_index: &str) -> Result<DocConfig> {
        if let Ok(index) = name_or_index.trim().parse::<i64>() {
            if index >= 0 && (index as usize) < self.documents.len() {
                return Ok(self.documents.remove(index as usize));
            }
            return Err(Error::Config(format!("index {} out of range", index)));
        }

        match self.documents.iter().position(|doc| doc.name == name_or_index) {
            Some(position) => Ok(self.documents.remove(position)),
            None => Err(Error::Config(format!(
                "document {} not found",
                name_or_index
            ))),
        }
    }

    /// Documents, optionally filtered by group
    pub fn documents(&self, group: Option<&str>) -> Vec<&DocConfig> {
        self.documents
            .iter()
            .filter(|doc| match group {
                Some(group) if !group.is_empty() => doc.group == group,
                _ => true,
            })
            .collect()
    }
}
