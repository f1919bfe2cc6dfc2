//! Field catalog
//!
//! The ordered set of fields that become export columns.

use bridge_traits::document::{RawRecord, RemoteField};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::field::FieldDescriptor;

/// Which fields are eligible for export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogPolicy {
    /// Keep created/modified time and created/modified by
    pub include_system_fields: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
    restricted: bool,
}

impl FieldCatalog {
    /// Build from the fields endpoint, keeping remote order
    pub fn build(remote: &[RemoteField], policy: CatalogPolicy) -> Self {
        let fields = remote
            .iter()
            .map(FieldDescriptor::from_remote)
            .filter(|field| policy.include_system_fields || !field.kind.is_system())
            .collect();

        Self {
            fields,
            restricted: false,
        }
    }

    pub fn from_descriptors(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            fields,
            restricted: false,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Keep only fields observed as a key in at least one record of the page.
    ///
    /// Applied at most once; an empty page leaves the catalog unchanged.
    pub fn restrict_to_observed(&mut self, records: &[RawRecord]) {
        if self.restricted || records.is_empty() {
            return;
        }
        self.restricted = true;

        let observed: HashSet<&str> = records
            .iter()
            .flat_map(|record| record.fields.keys().map(String::as_str))
            .collect();

        let before = self.fields.len();
        self.fields.retain(|field| {
            observed.contains(field.name.as_str()) || observed.contains(field.id.as_str())
        });
        debug!(
            before,
            after = self.fields.len(),
            "Restricted field catalog to observed fields"
        );
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }
}

/// Look up a field's raw value: by name, then id, then case-insensitive name
pub fn lookup_value<'a>(record: &'a RawRecord, field: &FieldDescriptor) -> Option<&'a Value> {
    record
        .fields
        .get(&field.name)
        .or_else(|| record.fields.get(&field.id))
        .or_else(|| {
            record
                .fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(&field.name))
                .map(|(_, value)| value)
        })
}
