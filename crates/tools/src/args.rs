//! Typed access to model-supplied tool arguments.

use dvagent_core::ToolError;
use serde_json::{Map, Value};

/// A required, non-empty string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(ToolError::InvalidArguments(format!("Missing '{key}' argument")))
        }
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

/// An optional string argument; blank strings count as absent.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim()).filter(|s| !s.is_empty())),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

/// A non-negative integer argument with a default. Integral floats and
/// numeric strings are accepted since models emit both.
pub fn u32_or(args: &Value, key: &str, default: u32) -> Result<u32, ToolError> {
    let invalid = || ToolError::InvalidArguments(format!("'{key}' must be a non-negative integer"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32)
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// A boolean argument with a default.
pub fn bool_or(args: &Value, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a boolean, got {other}"
        ))),
    }
}

/// A required JSON object argument.
pub fn required_object<'a>(args: &'a Value, key: &str) -> Result<&'a Map<String, Value>, ToolError> {
    match args.get(key) {
        Some(Value::Object(map)) => Ok(map),
        None | Some(Value::Null) => Err(ToolError::InvalidArguments(format!("Missing '{key}' argument"))),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be an object, got {other}"
        ))),
    }
}

/// Column list given either as `"a,b"` or `["a", "b"]`.
pub fn column_list(args: &Value, key: &str) -> Result<Vec<String>, ToolError> {
    let columns: Vec<String> = match args.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.split(',').map(|c| c.trim().to_string()).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(|c| c.trim().to_string()).ok_or_else(|| {
                    ToolError::InvalidArguments(format!("'{key}' entries must be strings"))
                })
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(ToolError::InvalidArguments(format!(
                "'{key}' must be a string or an array of strings, got {other}"
            )));
        }
    };
    Ok(columns.into_iter().filter(|c| !c.is_empty()).collect())
}
