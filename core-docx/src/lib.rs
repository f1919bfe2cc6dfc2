//! # Docx Rendering Module
//!
//! Turns a docx block tree into Markdown.
//!
//! ## Overview
//!
//! This module provides:
//! - Block rendering (headings, lists, code, quotes, todos, tables, images)
//! - Inline styles, links, equations and mentions
//! - Collection of image tokens for the downloader to fetch
//! - Collection of mentioned user ids for name resolution

pub mod error;
pub mod language;
pub mod renderer;

pub use error::{DocxError, Result};
pub use renderer::{collect_mention_user_ids, render_document, RenderOptions, RenderedDocument};
