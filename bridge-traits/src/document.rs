//! Cloud Document Abstractions
//!
//! Provider traits for the document service: docx documents and their block
//! trees, wiki spaces, drive folders and Bitable tables. The types here are
//! the provider-neutral shapes consumed by the renderer, the exporter and the
//! sync engine.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Result;

// ============================================================================
// Docx documents
// ============================================================================

/// Document header returned by the document info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    /// Linear revision counter, bumped on every edit
    #[serde(default)]
    pub revision_id: i64,
    #[serde(default)]
    pub title: String,
}

/// Style of a single inline text run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElementStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub inline_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_element_style: TextElementStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionUser {
    pub user_id: String,
    #[serde(default)]
    pub text_element_style: TextElementStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionDoc {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub obj_type: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineEquation {
    #[serde(default)]
    pub content: String,
}

/// One inline element of a text-bearing block. Exactly one variant is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_user: Option<MentionUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_doc: Option<MentionDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation: Option<InlineEquation>,
}

/// Block-level style (code language, todo state, alignment)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<i64>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub wrap: bool,
}

/// Payload of every text-bearing block (page, text, headings, lists, code...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub elements: Vec<TextElement>,
    #[serde(default)]
    pub style: TextStyle,
}

/// Embedded Bitable; `token` is `<app_token>_<table_id>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitableBlock {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub view_type: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlock {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProperty {
    #[serde(default)]
    pub row_size: usize,
    #[serde(default)]
    pub column_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Cell block ids in row-major order
    #[serde(default)]
    pub cells: Vec<String>,
    #[serde(default)]
    pub property: TableProperty,
}

/// One node of a docx block tree as delivered by the blocks endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocxBlock {
    pub block_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    pub block_type: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading1: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading2: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading3: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading4: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading5: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading6: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading7: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading8: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading9: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitable: Option<BitableBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableBlock>,
}

impl DocxBlock {
    /// Text payload of this block, whichever heading/list/text slot carries it
    pub fn text_block(&self) -> Option<&TextBlock> {
        [
            &self.page,
            &self.text,
            &self.heading1,
            &self.heading2,
            &self.heading3,
            &self.heading4,
            &self.heading5,
            &self.heading6,
            &self.heading7,
            &self.heading8,
            &self.heading9,
            &self.bullet,
            &self.ordered,
            &self.code,
            &self.quote,
            &self.equation,
            &self.todo,
        ]
        .into_iter()
        .find_map(|slot| slot.as_ref())
    }
}

// ============================================================================
// Wiki and drive
// ============================================================================

/// Wiki node; `obj_token`/`obj_type` point at the backing object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiNode {
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub node_token: String,
    #[serde(default)]
    pub obj_token: String,
    /// `docx`, `doc`, `sheet`, `bitable`, `mindnote`, `file`, ...
    #[serde(default)]
    pub obj_type: String,
    #[serde(default)]
    pub parent_node_token: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub has_child: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiSpace {
    pub space_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Entry of a drive folder listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub token: String,
    #[serde(default)]
    pub name: String,
    /// `docx`, `doc`, `folder`, `bitable`, `file`, ...
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub parent_token: String,
    #[serde(default)]
    pub url: String,
}

/// Downloaded media blob with its server-provided file name
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content: Bytes,
}

// ============================================================================
// Bitable
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitableApp {
    pub app_token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitableTable {
    pub table_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitableView {
    pub view_id: String,
    #[serde(default)]
    pub view_name: String,
    #[serde(default)]
    pub view_type: String,
}

/// Field schema entry as reported by the fields endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteField {
    pub field_id: String,
    pub field_name: String,
    /// Numeric type code
    #[serde(rename = "type")]
    pub field_type: i64,
    /// Type-specific properties (select options live under `options`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Value>,
}

/// One record; values are keyed by field name (or id) and left untyped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// One page of the record listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub items: Vec<RawRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl RecordPage {
    /// Continuation token when another page should be requested
    pub fn next_token(&self) -> Option<&str> {
        match self.page_token.as_deref() {
            Some(token) if self.has_more && !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

// ============================================================================
// Provider traits
// ============================================================================

/// Document service provider trait
///
/// Read-only access to docx documents, wiki trees and drive folders.
/// Paged endpoints are drained by the implementation.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::document::DocumentProvider;
///
/// async fn title_of(provider: &dyn DocumentProvider, id: &str) -> Result<String> {
///     Ok(provider.document_info(id).await?.title)
/// }
/// ```
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Fetch the document header (title and revision)
    async fn document_info(&self, document_id: &str) -> Result<DocumentInfo>;

    /// Fetch every block of a document, in remote order
    async fn document_blocks(&self, document_id: &str) -> Result<Vec<DocxBlock>>;

    /// Resolve a wiki node token
    async fn wiki_node(&self, node_token: &str) -> Result<WikiNode>;

    /// Fetch wiki space information
    async fn wiki_space(&self, space_id: &str) -> Result<WikiSpace>;

    /// List direct children of a wiki node, or the space roots when `parent` is `None`
    async fn wiki_children(&self, space_id: &str, parent: Option<String>) -> Result<Vec<WikiNode>>;

    /// List the direct entries of a drive folder
    async fn folder_files(&self, folder_token: &str) -> Result<Vec<DriveFile>>;

    /// Download an image or attachment by media token
    async fn download_media(&self, token: &str) -> Result<MediaFile>;

    /// Resolve user ids to display names; unknown ids are omitted
    async fn user_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>>;
}

/// Bitable provider trait
///
/// Schema and record access for one Bitable app (the container) and its
/// tables.
#[async_trait]
pub trait BitableProvider: Send + Sync {
    /// Fetch app metadata (name)
    async fn bitable_app(&self, app_token: &str) -> Result<BitableApp>;

    /// List the tables of an app
    async fn bitable_tables(&self, app_token: &str) -> Result<Vec<BitableTable>>;

    /// List the views of a table
    async fn bitable_views(&self, app_token: &str, table_id: &str) -> Result<Vec<BitableView>>;

    /// List field descriptors, optionally scoped to a view
    async fn list_fields(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<String>,
    ) -> Result<Vec<RemoteField>>;

    /// Fetch one page of records
    async fn list_records(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<String>,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<RecordPage>;
}
