//! Shape sniffing for raw record values
//!
//! Record values are untyped JSON. Before normalization each value is
//! classified by shape so the normalizer can dispatch on `(kind, shape)`.

use serde_json::{Map, Value};

/// Structural class of a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Null,
    /// String, number or boolean
    Scalar,
    List,
    /// Object carrying `type` plus `value` and/or `value_extra`
    Wrapper,
    Object,
}

pub fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Null => Shape::Null,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Shape::Scalar,
        Value::Array(_) => Shape::List,
        Value::Object(map) if is_wrapper_map(map) => Shape::Wrapper,
        Value::Object(_) => Shape::Object,
    }
}

fn is_wrapper_map(map: &Map<String, Value>) -> bool {
    map.contains_key("type") && (map.contains_key("value") || map.contains_key("value_extra"))
}

/// Unwrap `{type, value}` to `value`; anything else is returned as is
pub fn unwrap_value(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.contains_key("type") => map.get("value").unwrap_or(value),
        _ => value,
    }
}

/// Object with a `name` and some file token key
pub fn is_attachment_shaped(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key("name")
                && ["file_token", "attachmentToken", "token"]
                    .iter()
                    .any(|key| map.contains_key(*key))
        }
        _ => false,
    }
}

/// Non-empty string stored under `key`, with a case-insensitive key fallback
pub fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    let map = value.as_object()?;
    let found = map.get(key).or_else(|| {
        map.iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })?;
    found.as_str().filter(|text| !text.is_empty())
}

/// Non-empty list stored under `key`
pub fn list_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value
        .as_object()?
        .get(key)?
        .as_array()
        .filter(|items| !items.is_empty())
}

/// Natural string form of a scalar
///
/// Integral floats print without a fractional part; empty containers render
/// as `""`; other containers fall back to compact JSON.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                integer.to_string()
            } else if let Some(integer) = number.as_u64() {
                integer.to_string()
            } else {
                match number.as_f64() {
                    Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                        format!("{}", float as i64)
                    }
                    Some(float) => float.to_string(),
                    None => number.to_string(),
                }
            }
        }
        Value::Array(items) if items.is_empty() => String::new(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => other.to_string(),
    }
}

/// Numeric reading of a number or numeric string
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "tif", "tiff", "heic", "ico",
];

/// File name with a known image extension
pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, extension)| {
            !stem.is_empty()
                && IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| extension.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
