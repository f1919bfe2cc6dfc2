//! End-to-end export through an in-memory provider

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::document::{
    BitableApp, BitableBlock, BitableProvider, BitableTable, BitableView, DocumentInfo,
    DocumentProvider, DocxBlock, DriveFile, MediaFile, RawRecord, RecordPage, RemoteField,
    WikiNode, WikiSpace,
};
use bridge_traits::error::{BridgeError, Result};
use core_bitable::{CatalogPolicy, ExportFormat, ExportRequest, TableExporter, TimeZoneSetting};
use serde_json::{json, Value};
use tempfile::TempDir;

/// A wiki page embedding two tables; only `appReal` holds `tblMain`
struct Workspace {
    record_pages: Vec<RecordPage>,
    requested_pages: Mutex<Vec<Option<String>>>,
}

impl Workspace {
    fn new(record_pages: Vec<RecordPage>) -> Self {
        Self {
            record_pages,
            requested_pages: Mutex::new(Vec::new()),
        }
    }

    fn not_found() -> BridgeError {
        BridgeError::Remote {
            code: 91402,
            message: "NOTEXIST".to_string(),
        }
    }
}

#[async_trait]
impl DocumentProvider for Workspace {
    async fn document_info(&self, _document_id: &str) -> Result<DocumentInfo> {
        Err(BridgeError::NotAvailable("document_info".to_string()))
    }

    async fn document_blocks(&self, document_id: &str) -> Result<Vec<DocxBlock>> {
        assert_eq!(document_id, "docBacking");
        let embed = |id: &str, token: &str| DocxBlock {
            block_id: id.to_string(),
            parent_id: Some("docBacking".to_string()),
            block_type: 18,
            bitable: Some(BitableBlock {
                token: token.to_string(),
                view_type: 1,
            }),
            ..Default::default()
        };

        Ok(vec![
            DocxBlock {
                block_id: "docBacking".to_string(),
                children: vec!["e1".to_string(), "e2".to_string()],
                block_type: 1,
                ..Default::default()
            },
            embed("e1", "appDecoy_tblOther"),
            embed("e2", "appReal_tblMain"),
        ])
    }

    async fn wiki_node(&self, node_token: &str) -> Result<WikiNode> {
        assert_eq!(node_token, "wikPage");
        Ok(WikiNode {
            node_token: node_token.to_string(),
            obj_token: "docBacking".to_string(),
            obj_type: "docx".to_string(),
            title: "Planning".to_string(),
            ..Default::default()
        })
    }

    async fn wiki_space(&self, _space_id: &str) -> Result<WikiSpace> {
        Err(BridgeError::NotAvailable("wiki_space".to_string()))
    }

    async fn wiki_children(&self, _space_id: &str, _parent: Option<String>) -> Result<Vec<WikiNode>> {
        Ok(Vec::new())
    }

    async fn folder_files(&self, _folder_token: &str) -> Result<Vec<DriveFile>> {
        Ok(Vec::new())
    }

    async fn download_media(&self, token: &str) -> Result<MediaFile> {
        Err(BridgeError::NotAvailable(token.to_string()))
    }

    async fn user_names(&self, _user_ids: &[String]) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

#[async_trait]
impl BitableProvider for Workspace {
    async fn bitable_app(&self, app_token: &str) -> Result<BitableApp> {
        Ok(BitableApp {
            app_token: app_token.to_string(),
            name: "Planning".to_string(),
            revision: 3,
        })
    }

    async fn bitable_tables(&self, _app_token: &str) -> Result<Vec<BitableTable>> {
        Ok(vec![BitableTable {
            table_id: "tblMain".to_string(),
            name: "Backlog".to_string(),
            revision: 3,
        }])
    }

    async fn bitable_views(&self, _app_token: &str, _table_id: &str) -> Result<Vec<BitableView>> {
        Ok(Vec::new())
    }

    async fn list_fields(
        &self,
        app_token: &str,
        table_id: &str,
        _view_id: Option<String>,
    ) -> Result<Vec<RemoteField>> {
        if app_token != "appReal" || table_id != "tblMain" {
            return Err(Self::not_found());
        }

        Ok(vec![
            RemoteField {
                field_id: "fldTitle".to_string(),
                field_name: "Title".to_string(),
                field_type: 1,
                property: None,
            },
            RemoteField {
                field_id: "fldOwner".to_string(),
                field_name: "Owner".to_string(),
                field_type: 11,
                property: None,
            },
            RemoteField {
                field_id: "fldLink".to_string(),
                field_name: "Depends on".to_string(),
                field_type: 18,
                property: None,
            },
            RemoteField {
                field_id: "fldLookup".to_string(),
                field_name: "Parent status".to_string(),
                field_type: 19,
                property: None,
            },
            RemoteField {
                field_id: "fldModified".to_string(),
                field_name: "Modified".to_string(),
                field_type: 1002,
                property: None,
            },
        ])
    }

    async fn list_records(
        &self,
        _app_token: &str,
        _table_id: &str,
        _view_id: Option<String>,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<RecordPage> {
        assert_eq!(page_size, 500);
        let mut requested = self.requested_pages.lock().unwrap();
        let index = requested.len();
        requested.push(page_token);
        Ok(self.record_pages.get(index).cloned().unwrap_or_default())
    }
}

fn record(id: &str, fields: Value) -> RawRecord {
    RawRecord {
        record_id: id.to_string(),
        fields: fields.as_object().cloned().unwrap_or_default(),
    }
}

fn pages() -> Vec<RecordPage> {
    vec![
        RecordPage {
            items: vec![record(
                "rec1",
                json!({
                    "Title": [{"type": "text", "text": "Ship exporter"}],
                    "Owner": [{"id": "ou_1", "name": "Alice"}],
                    "Depends on": {"link_record_ids": ["recA", "recB"]},
                    "Parent status": {
                        "type": "single_option",
                        "value": ["optOpen"],
                        "value_extra": {"options": [{"id": "optOpen", "name": "Open"}]}
                    },
                    "Modified": 1700000000000i64
                }),
            )],
            page_token: Some("next".to_string()),
            has_more: true,
        },
        RecordPage {
            items: vec![record(
                "rec2",
                json!({
                    "Title": "Write docs",
                    "Depends on": [{"text": "Ship exporter", "record_ids": ["rec1"]}],
                    "Parent status": {"type": 1, "value": [{"type": "text", "text": "Done"}]}
                }),
            )],
            page_token: None,
            has_more: false,
        },
    ]
}

const WIKI_URL: &str = "https://example.feishu.cn/wiki/wikPage?table=tblMain";

#[tokio::test]
async fn test_wiki_embedded_table_to_csv() {
    let dir = TempDir::new().unwrap();
    let workspace = Arc::new(Workspace::new(pages()));
    let exporter = TableExporter::new(workspace.clone(), workspace.clone())
        .with_time_zone(TimeZoneSetting::Utc);

    let request = ExportRequest::new(WIKI_URL, ExportFormat::Csv, dir.path());
    let outcome = exporter.export(&request).await.unwrap();

    assert_eq!(outcome.file_name, "Planning_Backlog.csv");
    assert_eq!(outcome.rows, 2);
    assert_eq!(
        *workspace.requested_pages.lock().unwrap(),
        vec![None, Some("next".to_string())]
    );

    let content = std::fs::read_to_string(&outcome.path).unwrap();
    assert_eq!(
        content,
        "\u{feff}Title,Owner,Depends on,Parent status\n\
         Ship exporter,Alice,,\n\
         Write docs,,Ship exporter,Done\n"
    );
}

#[tokio::test]
async fn test_xlsx_keeps_record_ids_and_system_fields() {
    let dir = TempDir::new().unwrap();
    let workspace = Arc::new(Workspace::new(pages()));
    let exporter = TableExporter::new(workspace.clone(), workspace)
        .with_policy(CatalogPolicy {
            include_system_fields: true,
        })
        .with_time_zone(TimeZoneSetting::Utc);

    let mut request = ExportRequest::new(WIKI_URL, ExportFormat::Xlsx, dir.path());
    request.base_name = Some("backlog/export".to_string());
    let outcome = exporter.export(&request).await.unwrap();

    assert_eq!(outcome.file_name, "backlog_export.xlsx");
    assert_eq!(outcome.rows, 2);
    let bytes = std::fs::read(&outcome.path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_unresolvable_page_reports_requirement() {
    let dir = TempDir::new().unwrap();
    let workspace = Arc::new(Workspace::new(Vec::new()));
    let exporter = TableExporter::new(workspace.clone(), workspace);

    let request = ExportRequest::new(
        "https://example.feishu.cn/docs/legacyTok?table=tblMain",
        ExportFormat::Csv,
        dir.path(),
    );
    let error = exporter.export(&request).await.unwrap_err();

    assert!(error
        .to_string()
        .contains("the page must embed a table or point to a bitable file"));
}
