//! Field value normalizer
//!
//! Turns one raw record value into the string cell the vendor's own export
//! would produce. Normalization is pure and never fails: anything it cannot
//! interpret degrades to `""` or a best-effort stringification.
//!
//! Evaluation order:
//!
//! 1. `null` or absent values render `""`.
//! 2. Reference-derived fields (one-way link, lookup, two-way link) whose
//!    value is a pure reference echo render `""`.
//! 3. `{type, value}` wrappers are unwrapped to `value`; a single
//!    attachment-shaped element short-circuits to the attachment name.
//! 4. The `(field class, shape)` dispatch table picks the handler.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::field::{FieldDescriptor, FieldKind};
use crate::value::{
    as_number, is_attachment_shaped, is_image_name, list_field, scalar_string, shape_of,
    string_field, unwrap_value, Shape,
};

/// Epoch values above this are milliseconds, at or below it seconds
pub const MILLIS_THRESHOLD: f64 = 1e11;

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Target file format; reference fields render differently per format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unsupported export format: {}", other)),
        }
    }
}

/// Zone used to render timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeZoneSetting {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    fn format(&self, instant: DateTime<Utc>) -> String {
        match self {
            TimeZoneSetting::Local => instant
                .with_timezone(&Local)
                .format(DATE_TIME_FORMAT)
                .to_string(),
            TimeZoneSetting::Utc => instant.format(DATE_TIME_FORMAT).to_string(),
            TimeZoneSetting::Fixed(offset) => instant
                .with_timezone(offset)
                .format(DATE_TIME_FORMAT)
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub format: ExportFormat,
    /// Drop attachment and text items that name image files
    pub filter_images: bool,
    pub time_zone: TimeZoneSetting,
}

/// Handler family a field kind dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FieldClass {
    Text,
    Natural,
    Select,
    Time,
    Person,
    Url,
    Attachment,
    Reference,
    Default,
}

impl FieldClass {
    fn of(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldClass::Text,
            FieldKind::Number | FieldKind::Checkbox | FieldKind::Phone | FieldKind::AutoNumber => {
                FieldClass::Natural
            }
            FieldKind::SingleSelect | FieldKind::MultiSelect => FieldClass::Select,
            FieldKind::DateTime | FieldKind::CreatedTime | FieldKind::ModifiedTime => {
                FieldClass::Time
            }
            FieldKind::Person | FieldKind::CreatedBy | FieldKind::ModifiedBy => FieldClass::Person,
            FieldKind::Url => FieldClass::Url,
            FieldKind::Attachment => FieldClass::Attachment,
            FieldKind::OneWayLink | FieldKind::Lookup | FieldKind::DuplexLink => {
                FieldClass::Reference
            }
            FieldKind::Formula
            | FieldKind::Location
            | FieldKind::GroupChat
            | FieldKind::Unknown(_) => FieldClass::Default,
        }
    }
}

type Handler = fn(&FieldDescriptor, &Value, &NormalizeOptions) -> String;

/// Dispatch table keyed by `(class, shape)`
fn handler(class: FieldClass, shape: Shape) -> Handler {
    use FieldClass as C;
    use Shape as S;

    match (class, shape) {
        (_, S::Null) => render_empty,

        (C::Text, S::Scalar) => render_text_scalar,
        (C::Text, S::List) => render_text_list,
        (C::Text, S::Object) => render_text_object,

        (C::Natural, S::Scalar) => render_natural,
        (C::Natural, S::List) => render_natural_list,

        (C::Select, S::Scalar) => render_select_item,
        (C::Select, S::Object) => render_select_item,
        (C::Select, S::List) => render_select_list,

        (C::Time, S::Scalar) => render_time,
        (C::Time, S::List) => render_time_list,

        (C::Person, S::List) => render_person_list,
        (C::Person, S::Object) => render_person,

        (C::Url, S::Object) => render_url,
        (C::Url, S::List) => render_url_list,
        (C::Url, S::Scalar) => render_natural,

        (C::Attachment, S::List) => render_attachment_list,
        (C::Attachment, S::Object) => render_attachment,

        (C::Reference, S::List) => render_reference_list,
        (C::Reference, S::Object) | (C::Reference, S::Wrapper) => render_reference_item,
        (C::Reference, S::Scalar) => render_natural,

        _ => render_default,
    }
}

/// Normalize one raw value to its cell text
pub fn normalize(
    field: &FieldDescriptor,
    raw: Option<&Value>,
    options: &NormalizeOptions,
) -> String {
    let raw = match raw {
        None | Some(Value::Null) => return String::new(),
        Some(raw) => raw,
    };

    if field.kind.is_reference() && is_reference_echo(raw) {
        return String::new();
    }

    let value = unwrap_value(raw);
    if let Value::Array(items) = value {
        if items.len() == 1 && is_attachment_shaped(&items[0]) {
            return render_attachment_list(field, value, options);
        }
    }

    handler(FieldClass::of(field.kind), shape_of(value))(field, value, options)
}

/// Select-typed wrapper with a non-null `value_extra`: a bare echo of the
/// referenced record's option, not literal snapshot text
fn is_reference_echo(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };

    let select_like = match map.get("type") {
        Some(Value::String(kind)) => matches!(
            kind.as_str(),
            "single_option" | "multi_option" | "single_select" | "multi_select"
        ),
        Some(Value::Number(code)) => matches!(code.as_i64(), Some(3) | Some(4)),
        _ => false,
    };

    select_like && map.get("value_extra").map_or(false, |extra| !extra.is_null())
}

fn join_non_empty(parts: impl Iterator<Item = String>, separator: &str) -> String {
    parts
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_empty(_: &FieldDescriptor, _: &Value, _: &NormalizeOptions) -> String {
    String::new()
}

fn render_natural(_: &FieldDescriptor, value: &Value, _: &NormalizeOptions) -> String {
    scalar_string(value)
}

fn render_natural_list(_: &FieldDescriptor, value: &Value, _: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(items.iter().map(scalar_string), ",")
}

// Text

fn filter_image_text(text: String, options: &NormalizeOptions) -> String {
    if options.filter_images && is_image_name(&text) {
        String::new()
    } else {
        text
    }
}

fn render_text_scalar(_: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    filter_image_text(scalar_string(value), options)
}

fn text_item(value: &Value) -> String {
    match value {
        Value::Object(_) => string_field(value, "text")
            .or_else(|| string_field(value, "name"))
            .map(str::to_string)
            .unwrap_or_default(),
        other => scalar_string(other),
    }
}

fn render_text_list(_: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items
            .iter()
            .map(|item| filter_image_text(text_item(item), options)),
        "\n",
    )
}

fn render_text_object(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    match string_field(value, "text").or_else(|| string_field(value, "name")) {
        Some(text) => filter_image_text(text.to_string(), options),
        None => render_default(field, value, options),
    }
}

// Select

fn render_select_item(field: &FieldDescriptor, value: &Value, _: &NormalizeOptions) -> String {
    match value {
        Value::Object(_) => {
            if let Some(name) = string_field(value, "name") {
                return name.to_string();
            }
            match string_field(value, "id") {
                Some(id) => field.option_name(id).unwrap_or(id).to_string(),
                None => String::new(),
            }
        }
        other => {
            let id = scalar_string(other);
            field
                .option_name(&id)
                .map(str::to_string)
                .unwrap_or(id)
        }
    }
}

fn render_select_list(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items
            .iter()
            .map(|item| render_select_item(field, item, options)),
        ",",
    )
}

// Time

/// Format an epoch value, auto-detecting seconds vs milliseconds
pub fn format_epoch(value: &Value, time_zone: TimeZoneSetting) -> String {
    let Some(number) = as_number(value) else {
        return String::new();
    };
    if !number.is_finite() || number <= 0.0 {
        return String::new();
    }

    let seconds = if number > MILLIS_THRESHOLD {
        (number / 1000.0).floor()
    } else {
        number.floor()
    };

    match DateTime::from_timestamp(seconds as i64, 0) {
        Some(instant) => time_zone.format(instant),
        None => String::new(),
    }
}

fn render_time(_: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    format_epoch(value, options.time_zone)
}

fn render_time_list(_: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items
            .iter()
            .map(|item| format_epoch(item, options.time_zone)),
        ",",
    )
}

// Person

fn render_person(_: &FieldDescriptor, value: &Value, _: &NormalizeOptions) -> String {
    string_field(value, "name")
        .or_else(|| string_field(value, "en_name"))
        .map(str::to_string)
        .unwrap_or_default()
}

fn render_person_list(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items.iter().map(|item| match item {
            Value::Object(_) => render_person(field, item, options),
            other => scalar_string(other),
        }),
        ",",
    )
}

// URL

fn render_url(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    match string_field(value, "link") {
        Some(link) => link.to_string(),
        None => render_default(field, value, options),
    }
}

fn render_url_list(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items.iter().map(|item| match item {
            Value::Object(_) => render_url(field, item, options),
            other => scalar_string(other),
        }),
        ",",
    )
}

// Attachment

fn attachment_name(value: &Value, options: &NormalizeOptions) -> String {
    match string_field(value, "name") {
        Some(name) if options.filter_images && is_image_name(name) => String::new(),
        Some(name) => name.to_string(),
        None => String::new(),
    }
}

fn render_attachment(_: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    attachment_name(value, options)
}

fn render_attachment_list(_: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items.iter().map(|item| match item {
            Value::Object(_) => attachment_name(item, options),
            other => scalar_string(other),
        }),
        ",",
    )
}

// Reference-derived

fn render_reference_item(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    match value {
        Value::Object(map) => {
            if is_reference_echo(value) {
                return String::new();
            }
            if let Some(text) = string_field(value, "text") {
                return text.to_string();
            }
            if let Some(parts) = list_field(value, "text_arr") {
                return join_non_empty(parts.iter().map(scalar_string), ",");
            }
            if map.get("type").and_then(Value::as_str) == Some("text") {
                // Reference marker without literal text
                return String::new();
            }
            if options.format == ExportFormat::Xlsx {
                // First linked record only
                if let Some(first) = list_field(value, "record_ids")
                    .or_else(|| list_field(value, "link_record_ids"))
                    .and_then(|ids| ids.first())
                {
                    return scalar_string(first);
                }
            }
            String::new()
        }
        Value::Array(_) => render_reference_list(field, value, options),
        other => scalar_string(other),
    }
}

fn render_reference_list(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    join_non_empty(
        items
            .iter()
            .map(|item| render_reference_item(field, item, options)),
        ",",
    )
}

// Default

const CONTENT_MARKERS: &[&str] = &["type", "text", "name", "text_arr", "value_extra"];

fn render_default(field: &FieldDescriptor, value: &Value, options: &NormalizeOptions) -> String {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                return String::new();
            }
            if let Some(text) = string_field(value, "text").or_else(|| string_field(value, "name")) {
                return text.to_string();
            }
            if let Some(parts) = list_field(value, "text_arr") {
                return join_non_empty(parts.iter().map(scalar_string), ",");
            }
            match map.get("value") {
                Some(inner) if !inner.is_null() => render_default(field, inner, options),
                Some(_) => String::new(),
                // Typed or text-bearing objects whose content is empty
                None if CONTENT_MARKERS.iter().any(|key| map.contains_key(*key)) => String::new(),
                None => scalar_string(value),
            }
        }
        Value::Array(items) => join_non_empty(
            items.iter().map(|item| {
                if is_attachment_shaped(item) {
                    attachment_name(item, options)
                } else {
                    render_default(field, item, options)
                }
            }),
            ",",
        ),
        other => scalar_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::SelectOption;
    use serde_json::json;

    fn options() -> NormalizeOptions {
        NormalizeOptions {
            format: ExportFormat::Csv,
            filter_images: false,
            time_zone: TimeZoneSetting::Utc,
        }
    }

    fn xlsx() -> NormalizeOptions {
        NormalizeOptions {
            format: ExportFormat::Xlsx,
            ..options()
        }
    }

    fn field(kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor::new("fld", "Field", kind)
    }

    fn select_field(kind: FieldKind) -> FieldDescriptor {
        field(kind).with_options(vec![
            SelectOption {
                id: "opt1".to_string(),
                name: "Red".to_string(),
            },
            SelectOption {
                id: "opt2".to_string(),
                name: "Blue".to_string(),
            },
        ])
    }

    fn run(field: &FieldDescriptor, raw: Value) -> String {
        normalize(field, Some(&raw), &options())
    }

    #[test]
    fn test_absent_and_null() {
        let text = field(FieldKind::Text);
        assert_eq!(normalize(&text, None, &options()), "");
        assert_eq!(run(&text, Value::Null), "");
    }

    #[test]
    fn test_single_select_resolves_option() {
        let status = select_field(FieldKind::SingleSelect);
        assert_eq!(run(&status, json!("opt1")), "Red");
    }

    #[test]
    fn test_select_unknown_id_passes_through() {
        let status = select_field(FieldKind::SingleSelect);
        assert_eq!(run(&status, json!("optX")), "optX");

        let tags = select_field(FieldKind::MultiSelect);
        assert_eq!(run(&tags, json!(["opt2", "optY", "opt1"])), "Blue,optY,Red");
    }

    #[test]
    fn test_select_object_prefers_embedded_name() {
        let status = select_field(FieldKind::SingleSelect);
        assert_eq!(run(&status, json!({"id": "opt1", "name": "Crimson"})), "Crimson");
        assert_eq!(run(&status, json!({"id": "opt2"})), "Blue");
    }

    #[test]
    fn test_select_without_option_table() {
        let status = field(FieldKind::SingleSelect);
        assert_eq!(run(&status, json!("Done")), "Done");
    }

    #[test]
    fn test_reference_echo_is_suppressed() {
        for kind in [FieldKind::OneWayLink, FieldKind::Lookup, FieldKind::DuplexLink] {
            let reference = field(kind);
            let echo = json!({
                "type": "single_option",
                "value": ["optA"],
                "value_extra": {"options": [{"id": "optA", "name": "Open"}]},
                "text": "Open"
            });
            assert_eq!(normalize(&reference, Some(&echo), &options()), "");
            assert_eq!(normalize(&reference, Some(&echo), &xlsx()), "");

            let numeric = json!({"type": 4, "value_extra": ["x"]});
            assert_eq!(run(&reference, numeric), "");
        }
    }

    #[test]
    fn test_reference_echo_with_null_extra_is_not_suppressed() {
        let lookup = field(FieldKind::Lookup);
        let value = json!({"type": "single_option", "value": [{"text": "Open"}], "value_extra": null});
        assert_eq!(run(&lookup, value), "Open");
    }

    #[test]
    fn test_reference_literal_text() {
        let link = field(FieldKind::OneWayLink);
        let value = json!([
            {"record_ids": ["rec1"], "table_id": "tbl", "text": "Alpha", "type": "text"},
            {"record_ids": ["rec2"], "text_arr": ["Beta", "Gamma"], "type": "text"}
        ]);
        assert_eq!(run(&link, value), "Alpha,Beta,Gamma");
    }

    #[test]
    fn test_reference_text_marker_without_text() {
        let link = field(FieldKind::DuplexLink);
        let value = json!([{"record_ids": ["rec1"], "type": "text"}]);
        assert_eq!(normalize(&link, Some(&value), &xlsx()), "");
    }

    #[test]
    fn test_reference_record_ids_depend_on_format() {
        let link = field(FieldKind::OneWayLink);
        let value = json!([{"record_ids": ["rec1", "rec2"], "table_id": "tbl"}]);

        assert_eq!(normalize(&link, Some(&value), &options()), "");
        assert_eq!(normalize(&link, Some(&value), &xlsx()), "rec1");

        let two_items = json!([{"record_ids": ["rec1", "rec2"]}, {"record_ids": ["rec3"]}]);
        assert_eq!(normalize(&link, Some(&two_items), &xlsx()), "rec1,rec3");

        let legacy = json!({"link_record_ids": ["rec9"]});
        assert_eq!(normalize(&link, Some(&legacy), &xlsx()), "rec9");
    }

    #[test]
    fn test_lookup_wrapper_unwrapped() {
        let lookup = field(FieldKind::Lookup);
        let value = json!({"type": 1, "value": [{"text": "Snapshot", "type": "text"}]});
        assert_eq!(run(&lookup, value), "Snapshot");
    }

    #[test]
    fn test_wrapped_attachment_short_circuits() {
        let formula = field(FieldKind::Formula);
        let value = json!({"type": 17, "value": [{"name": "brief.pdf", "file_token": "t1"}]});
        assert_eq!(run(&formula, value), "brief.pdf");

        let value = json!({"type": 17, "value": [{"name": "pic.png", "file_token": "t1"}]});
        let filtered = NormalizeOptions {
            filter_images: true,
            ..options()
        };
        assert_eq!(normalize(&formula, Some(&value), &filtered), "");
    }

    #[test]
    fn test_default_drops_empty_text_segments() {
        let formula = field(FieldKind::Formula);
        let value = json!({
            "type": 1,
            "value": [{"type": "text", "text": ""}, {"type": "text", "text": "ok"}]
        });
        assert_eq!(run(&formula, value), "ok");

        assert_eq!(run(&formula, json!([{"type": "text"}, {"name": ""}])), "");
        assert_eq!(run(&formula, json!({"text": "", "text_arr": []})), "");
    }

    #[test]
    fn test_timestamps_seconds_and_millis_agree() {
        let date = field(FieldKind::DateTime);

        let millis = run(&date, json!(1_700_000_000_000i64));
        let seconds = run(&date, json!(1_700_000_000i64));

        assert_eq!(millis, "2023-11-14 22:13:20");
        assert_eq!(seconds, millis);
    }

    #[test]
    fn test_timestamp_threshold_boundary() {
        let date = field(FieldKind::CreatedTime);
        // Exactly 10^11 is still seconds: year 5138
        assert!(run(&date, json!(100_000_000_000i64)).starts_with("5138-"));
        // Just above is milliseconds: 1973
        assert!(run(&date, json!(100_000_000_001i64)).starts_with("1973-"));
    }

    #[test]
    fn test_timestamp_malformed_values() {
        let date = field(FieldKind::ModifiedTime);
        assert_eq!(run(&date, json!(0)), "");
        assert_eq!(run(&date, json!(-5)), "");
        assert_eq!(run(&date, json!("soon")), "");
        assert_eq!(run(&date, json!("1700000000000")), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_timestamp_fixed_offset() {
        let date = field(FieldKind::DateTime);
        let shanghai = NormalizeOptions {
            time_zone: TimeZoneSetting::Fixed(FixedOffset::east_opt(8 * 3600).unwrap()),
            ..options()
        };
        assert_eq!(
            normalize(&date, Some(&json!(1_700_000_000i64)), &shanghai),
            "2023-11-15 06:13:20"
        );
    }

    #[test]
    fn test_attachment_filter_images() {
        let files = field(FieldKind::Attachment);
        let raw = json!([{"name": "a.png", "attachmentToken": "t1"}]);

        let filtered = NormalizeOptions {
            filter_images: true,
            ..options()
        };
        assert_eq!(normalize(&files, Some(&raw), &filtered), "");
        assert_eq!(normalize(&files, Some(&raw), &options()), "a.png");

        let mixed = json!([
            {"name": "a.png", "file_token": "t1"},
            {"name": "b.pdf", "file_token": "t2"}
        ]);
        assert_eq!(normalize(&files, Some(&mixed), &filtered), "b.pdf");
        assert_eq!(normalize(&files, Some(&mixed), &options()), "a.png,b.pdf");
    }

    #[test]
    fn test_text_list_joined_with_newline() {
        let text = field(FieldKind::Text);
        let value = json!([{"type": "text", "text": "line one"}, {"type": "mention", "name": "Alice"}]);
        assert_eq!(run(&text, value), "line one\nAlice");
        assert_eq!(run(&text, json!("plain")), "plain");
    }

    #[test]
    fn test_text_filters_image_names() {
        let text = field(FieldKind::Text);
        let filtered = NormalizeOptions {
            filter_images: true,
            ..options()
        };
        let value = json!(["cover.jpg", "caption"]);
        assert_eq!(normalize(&text, Some(&value), &filtered), "caption");
    }

    #[test]
    fn test_natural_scalars() {
        assert_eq!(run(&field(FieldKind::Number), json!(12.0)), "12");
        assert_eq!(run(&field(FieldKind::Number), json!(12.5)), "12.5");
        assert_eq!(run(&field(FieldKind::Checkbox), json!(true)), "true");
        assert_eq!(run(&field(FieldKind::Phone), json!("+86 100")), "+86 100");
        assert_eq!(run(&field(FieldKind::AutoNumber), json!("0007")), "0007");
    }

    #[test]
    fn test_person_names() {
        let person = field(FieldKind::Person);
        let value = json!([
            {"id": "ou_1", "name": "Alice", "email": "a@example.com"},
            {"id": "ou_2", "name": "Bob"}
        ]);
        assert_eq!(run(&person, value), "Alice,Bob");

        let creator = field(FieldKind::CreatedBy);
        assert_eq!(run(&creator, json!({"id": "ou_3", "name": "Carol"})), "Carol");
    }

    #[test]
    fn test_url_prefers_link() {
        let url = field(FieldKind::Url);
        assert_eq!(
            run(&url, json!({"link": "https://example.com", "text": "Example"})),
            "https://example.com"
        );
        assert_eq!(run(&url, json!("https://raw.example.com")), "https://raw.example.com");
    }

    #[test]
    fn test_default_best_effort() {
        let formula = field(FieldKind::Formula);
        assert_eq!(run(&formula, json!({"type": 2, "value": [3.0]})), "3");
        assert_eq!(run(&formula, json!({"text_arr": ["a", "b"]})), "a,b");
        assert_eq!(run(&formula, json!({})), "");
        assert_eq!(run(&formula, json!([])), "");

        let location = field(FieldKind::Location);
        assert_eq!(
            run(&location, json!({"name": "HQ", "location": "116.3,39.9"})),
            "HQ"
        );

        let chat = field(FieldKind::GroupChat);
        assert_eq!(run(&chat, json!([{"name": "Team", "id": "oc_1"}])), "Team");

        let unknown = field(FieldKind::Unknown(4242));
        assert_eq!(run(&unknown, json!({"x": 1})), r#"{"x":1}"#);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let tags = select_field(FieldKind::MultiSelect);
        let raw = json!(["opt1", "opt2"]);

        let first = run(&tags, raw.clone());
        let second = run(&tags, raw);
        assert_eq!(first, second);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("xlsx".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Xlsx.to_string(), "xlsx");
    }
}
