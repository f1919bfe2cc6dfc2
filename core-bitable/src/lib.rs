//! # Bitable Export Module
//!
//! Exports one Bitable table (optionally one view of it) to CSV or XLSX.
//!
//! ## Overview
//!
//! This module provides:
//! - Field descriptors and the visibility-filtered field catalog
//! - The field value normalizer turning weakly typed record values into
//!   deterministic string cells
//! - Discovery of the container (app) token behind wiki pages and documents
//!   that embed a table
//! - Record paging, CSV and XLSX writers

pub mod catalog;
pub mod error;
pub mod exporter;
pub mod field;
pub mod normalizer;
pub mod resolver;
pub mod value;
pub mod writer;

#[cfg(test)]
mod testing;

pub use catalog::{CatalogPolicy, FieldCatalog};
pub use error::{BitableError, Result};
pub use exporter::{
    sanitize_file_name, sanitize_file_name_or, ExportOutcome, ExportRequest, TableExporter,
};
pub use field::{FieldDescriptor, FieldKind, SelectOption};
pub use normalizer::{normalize, ExportFormat, NormalizeOptions, TimeZoneSetting};
