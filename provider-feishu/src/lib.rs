//! # Feishu Provider
//!
//! Implements `DocumentProvider` and `BitableProvider` for the Feishu/Lark
//! open platform.
//!
//! ## Overview
//!
//! This module provides:
//! - Tenant access token acquisition and caching (app id + app secret)
//! - Docx documents and block trees, wiki spaces and nodes, drive folders
//! - Media downloads with server-provided file names
//! - Bitable app, table, view, field and record endpoints
//! - Exponential backoff on rate limiting and server errors
//! - Parsing of document, folder, wiki space and Bitable URLs

pub mod auth;
pub mod connector;
pub mod error;
pub mod types;
pub mod url;

pub use connector::{FeishuConnector, FEISHU_API_BASE};
pub use error::{FeishuError, Result};
