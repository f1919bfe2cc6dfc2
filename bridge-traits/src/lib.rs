//! # Host Bridge Traits
//!
//! Seams between the sync engine and the outside world. The core crates only
//! see these traits; `bridge-desktop` supplies the HTTP transport and
//! `provider-feishu` supplies the document and Bitable APIs on top of it.
//!
//! - [`HttpClient`](http::HttpClient): one request, one response
//! - [`DocumentProvider`](document::DocumentProvider): docx blocks, wiki trees, drive folders, media
//! - [`BitableProvider`](document::BitableProvider): Bitable apps, tables, views, fields and record pages
//! - [`Clock`](time::Clock): timestamps for sync records
//!
//! Provider failures arrive as [`BridgeError`]. Business codes from the
//! Open API envelope are kept in [`BridgeError::Remote`] so callers can
//! react to specific codes (missing tables, deleted fields).

pub mod document;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use document::{
    BitableApp, BitableProvider, BitableTable, BitableView, DocumentInfo, DocumentProvider,
    DocxBlock, DriveFile, MediaFile, RawRecord, RecordPage, RemoteField, WikiNode, WikiSpace,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, FixedClock, SystemClock};
