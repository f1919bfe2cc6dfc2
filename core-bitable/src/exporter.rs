//! Table exporter
//!
//! Resolves the table behind a link, pages through its records, normalizes
//! every cell and writes one CSV or XLSX file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::document::{BitableProvider, DocumentProvider};
use provider_feishu::url::parse_bitable_params;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{lookup_value, CatalogPolicy, FieldCatalog};
use crate::error::{BitableError, Result};
use crate::normalizer::{normalize, ExportFormat, NormalizeOptions, TimeZoneSetting};
use crate::resolver::resolve_app_token;
use crate::writer::{write_csv, write_xlsx, ColumnDropdown, TableData};

pub const RECORD_PAGE_SIZE: u32 = 500;

const DEFAULT_APP_NAME: &str = "bitable";

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub url: String,
    pub format: ExportFormat,
    pub output_dir: PathBuf,
    /// Explicit file stem; `App_Table[_View]` when absent
    pub base_name: Option<String>,
    /// Export only the columns the view actually shows
    pub view_scoped: bool,
    pub filter_images: bool,
}

impl ExportRequest {
    pub fn new(url: impl Into<String>, format: ExportFormat, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            format,
            output_dir: output_dir.into(),
            base_name: None,
            view_scoped: false,
            filter_images: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// File name including extension
    pub file_name: String,
    pub path: PathBuf,
    pub rows: usize,
}

fn replace_invalid(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Replace characters that are invalid in file names and trim
///
/// An empty result falls back to `export_<unix seconds>`. Only suitable for
/// one-shot exports; names that must be predicted later want
/// [`sanitize_file_name_or`].
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = replace_invalid(name);
    if cleaned.is_empty() {
        format!("export_{}", chrono::Utc::now().timestamp())
    } else {
        cleaned
    }
}

/// Like [`sanitize_file_name`], but an empty result becomes the sanitized
/// `fallback` so the same input always yields the same name
pub fn sanitize_file_name_or(name: &str, fallback: &str) -> String {
    let cleaned = replace_invalid(name);
    if !cleaned.is_empty() {
        return cleaned;
    }
    let fallback = replace_invalid(fallback);
    if fallback.is_empty() {
        "untitled".to_string()
    } else {
        fallback
    }
}

pub struct TableExporter {
    documents: Arc<dyn DocumentProvider>,
    bitables: Arc<dyn BitableProvider>,
    policy: CatalogPolicy,
    time_zone: TimeZoneSetting,
}

impl TableExporter {
    pub fn new(documents: Arc<dyn DocumentProvider>, bitables: Arc<dyn BitableProvider>) -> Self {
        Self {
            documents,
            bitables,
            policy: CatalogPolicy::default(),
            time_zone: TimeZoneSetting::default(),
        }
    }

    pub fn with_policy(mut self, policy: CatalogPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_time_zone(mut self, time_zone: TimeZoneSetting) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Export one table (or view) to a file under `request.output_dir`
    #[instrument(skip(self, request), fields(url = %request.url, format = %request.format))]
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportOutcome> {
        let params = parse_bitable_params(&request.url)?;
        let table_id = params.table_id.as_str();
        let view_id = params.view_id.clone();

        let app_token = resolve_app_token(
            self.documents.as_ref(),
            self.bitables.as_ref(),
            &request.url,
            table_id,
        )
        .await?;

        let stem = match request
            .base_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            Some(name) => sanitize_file_name(name),
            None => self
                .default_stem(&app_token, table_id, view_id.as_deref())
                .await,
        };

        let remote_fields = self
            .bitables
            .list_fields(&app_token, table_id, view_id.clone())
            .await
            .map_err(|source| BitableError::Remote {
                what: "fields",
                source,
            })?;
        if remote_fields.is_empty() {
            return Err(BitableError::NoFields {
                table_id: table_id.to_string(),
            });
        }

        let mut catalog = FieldCatalog::build(&remote_fields, self.policy);
        let restrict = request.view_scoped && view_id.is_some();
        let options = NormalizeOptions {
            format: request.format,
            filter_images: request.filter_images,
            time_zone: self.time_zone,
        };

        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut first_page = true;

        loop {
            let page = self
                .bitables
                .list_records(
                    &app_token,
                    table_id,
                    view_id.clone(),
                    page_token.clone(),
                    RECORD_PAGE_SIZE,
                )
                .await
                .map_err(|source| BitableError::Remote {
                    what: "records",
                    source,
                })?;

            if first_page {
                first_page = false;
                if restrict {
                    catalog.restrict_to_observed(&page.items);
                }
            }

            for record in &page.items {
                let row = catalog
                    .fields()
                    .iter()
                    .map(|field| normalize(field, lookup_value(record, field), &options))
                    .collect::<Vec<_>>();
                rows.push(row);
            }
            debug!(page_rows = page.items.len(), total = rows.len(), "Fetched record page");

            match page.next_token() {
                Some(token) if seen_tokens.insert(token.to_string()) => {
                    page_token = Some(token.to_string());
                }
                Some(token) => {
                    warn!(page_token = token, "Repeated page token; stopping");
                    break;
                }
                None => break,
            }
        }

        let mut table = TableData::new(catalog.headers());
        table.rows = rows;
        if request.format == ExportFormat::Xlsx {
            table.dropdowns = catalog
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, field)| field.kind.is_select())
                .map(|(column, field)| ColumnDropdown {
                    column: column as u16,
                    options: field.option_names(),
                })
                .filter(|dropdown| !dropdown.options.is_empty())
                .collect();
        }

        std::fs::create_dir_all(&request.output_dir)?;
        let file_name = format!("{}.{}", stem, request.format.extension());
        let path = request.output_dir.join(&file_name);

        match request.format {
            ExportFormat::Csv => write_csv(&path, &table)?,
            ExportFormat::Xlsx => write_xlsx(&path, &table)?,
        }

        info!(
            file = %file_name,
            rows = table.rows.len(),
            columns = table.headers.len(),
            "Exported table"
        );

        Ok(ExportOutcome {
            file_name,
            path,
            rows: table.rows.len(),
        })
    }

    /// `App_Table[_View]`; lookup failures fall back to `bitable`, the table
    /// id and the view id
    async fn default_stem(&self, app_token: &str, table_id: &str, view_id: Option<&str>) -> String {
        let app_name = match self.bitables.bitable_app(app_token).await {
            Ok(app) if !app.name.trim().is_empty() => app.name,
            Ok(_) => DEFAULT_APP_NAME.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch bitable app name");
                DEFAULT_APP_NAME.to_string()
            }
        };

        let table_name = match self.bitables.bitable_tables(app_token).await {
            Ok(tables) => tables
                .into_iter()
                .find(|table| table.table_id == table_id && !table.name.trim().is_empty())
                .map(|table| table.name)
                .unwrap_or_else(|| table_id.to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to list bitable tables");
                table_id.to_string()
            }
        };

        let mut parts = vec![sanitize_file_name(&app_name), sanitize_file_name(&table_name)];

        if let Some(view_id) = view_id {
            let view_name = match self.bitables.bitable_views(app_token, table_id).await {
                Ok(views) => views
                    .into_iter()
                    .find(|view| view.view_id == view_id && !view.view_name.trim().is_empty())
                    .map(|view| view.view_name)
                    .unwrap_or_else(|| view_id.to_string()),
                Err(e) => {
                    warn!(error = %e, "Failed to list bitable views");
                    view_id.to_string()
                }
            };
            parts.push(sanitize_file_name(&view_name));
        }

        parts.join("_")
    }
}
