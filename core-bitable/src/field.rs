//! Field descriptors
//!
//! A Bitable table is a list of typed fields. The numeric type code decides
//! how record values are normalized; select fields additionally carry the
//! option table used to resolve option ids.

use bridge_traits::document::RemoteField;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field type, keyed by the remote numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    SingleSelect,
    MultiSelect,
    DateTime,
    Checkbox,
    Person,
    Phone,
    Url,
    Attachment,
    /// One-way relation to another table
    OneWayLink,
    /// Lookup / rollup
    Lookup,
    Formula,
    /// Two-way relation
    DuplexLink,
    Location,
    GroupChat,
    CreatedTime,
    ModifiedTime,
    CreatedBy,
    ModifiedBy,
    AutoNumber,
    Unknown(i64),
}

impl FieldKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => FieldKind::Text,
            2 => FieldKind::Number,
            3 => FieldKind::SingleSelect,
            4 => FieldKind::MultiSelect,
            5 => FieldKind::DateTime,
            7 => FieldKind::Checkbox,
            11 => FieldKind::Person,
            13 => FieldKind::Phone,
            15 => FieldKind::Url,
            17 => FieldKind::Attachment,
            18 => FieldKind::OneWayLink,
            19 => FieldKind::Lookup,
            20 => FieldKind::Formula,
            21 => FieldKind::DuplexLink,
            22 => FieldKind::Location,
            23 => FieldKind::GroupChat,
            1001 => FieldKind::CreatedTime,
            1002 => FieldKind::ModifiedTime,
            1003 => FieldKind::CreatedBy,
            1004 => FieldKind::ModifiedBy,
            1005 => FieldKind::AutoNumber,
            other => FieldKind::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            FieldKind::Text => 1,
            FieldKind::Number => 2,
            FieldKind::SingleSelect => 3,
            FieldKind::MultiSelect => 4,
            FieldKind::DateTime => 5,
            FieldKind::Checkbox => 7,
            FieldKind::Person => 11,
            FieldKind::Phone => 13,
            FieldKind::Url => 15,
            FieldKind::Attachment => 17,
            FieldKind::OneWayLink => 18,
            FieldKind::Lookup => 19,
            FieldKind::Formula => 20,
            FieldKind::DuplexLink => 21,
            FieldKind::Location => 22,
            FieldKind::GroupChat => 23,
            FieldKind::CreatedTime => 1001,
            FieldKind::ModifiedTime => 1002,
            FieldKind::CreatedBy => 1003,
            FieldKind::ModifiedBy => 1004,
            FieldKind::AutoNumber => 1005,
            FieldKind::Unknown(code) => *code,
        }
    }

    /// Fields that mirror data from another table
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            FieldKind::OneWayLink | FieldKind::Lookup | FieldKind::DuplexLink
        )
    }

    /// Fields maintained by the service itself
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            FieldKind::CreatedTime
                | FieldKind::ModifiedTime
                | FieldKind::CreatedBy
                | FieldKind::ModifiedBy
        )
    }

    pub fn is_select(&self) -> bool {
        matches!(self, FieldKind::SingleSelect | FieldKind::MultiSelect)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Immutable description of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    pub options: Option<Vec<SelectOption>>,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            options: None,
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// Build from the fields endpoint; options are read from `property.options`
    pub fn from_remote(field: &RemoteField) -> Self {
        let options = field
            .property
            .as_ref()
            .and_then(|property| property.get("options"))
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| serde_json::from_value(option.clone()).ok())
                    .collect::<Vec<SelectOption>>()
            });

        Self {
            id: field.field_id.clone(),
            name: field.field_name.clone(),
            kind: FieldKind::from_code(field.field_type),
            options,
        }
    }

    /// Display name of an option id, if known and non-empty
    pub fn option_name(&self, id: &str) -> Option<&str> {
        self.options
            .as_deref()?
            .iter()
            .find(|option| option.id == id)
            .map(|option| option.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Non-empty option names in schema order (dropdown source)
    pub fn option_names(&self) -> Vec<String> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|option| !option.name.is_empty())
            .map(|option| option.name.clone())
            .collect()
    }
}
