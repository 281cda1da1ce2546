//! Decoding of untrusted backend payloads into [`ResultRecord`]s.
//!
//! Every function here is total: any JSON value maps to a well-formed record,
//! so shape drift on the backend never reaches the ledger as a partial entry.

use crate::model::{CheckRequest, Position, ResultRecord};
use serde_json::Value;

/// JavaScript-style truthiness over a JSON value.
///
/// `null`, `false`, numeric zero and the empty string are falsy; everything
/// else (including empty arrays and objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `mentioned` coerced to a boolean; absent counts as `false`.
pub fn decode_mentioned(raw: &Value) -> bool {
    raw.get("mentioned").map(is_truthy).unwrap_or(false)
}

/// `position` if present and not `null`. Non-integral values pass through as-is.
pub fn decode_position(raw: &Value) -> Option<Position> {
    match raw.get("position")? {
        Value::Null => None,
        Value::Number(n) if n.as_i64().is_some() => n.as_i64().map(Position::Rank),
        other => Some(Position::Other(other.clone())),
    }
}

/// Backend-reported error text, if the field is present and truthy.
pub fn decode_error(raw: &Value) -> Option<String> {
    let v = raw.get("error").filter(|v| is_truthy(v))?;
    Some(match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Build a record from the original request and a raw response body.
///
/// The prompt always comes from the request, never from the backend's echo.
pub fn normalize(request: &CheckRequest, raw: &Value) -> ResultRecord {
    ResultRecord::new(
        request.prompt.clone(),
        decode_mentioned(raw),
        decode_position(raw),
        decode_error(raw),
    )
}
