//! Content normalizer.
//!
//! Turns the raw bytes of an uploaded source file into its canonical form:
//!
//! 1. Parse as JSON (a leading UTF-8 BOM is tolerated).
//! 2. Wrap a single object into a one-element array; keep arrays as-is.
//! 3. Classify by probing the first object for the fields in
//!    [`DISCRIMINATORS`], in order.
//! 4. Sanitize the display name so it is a safe path segment.
//! 5. Re-serialize with 2-space indentation, non-ASCII kept literally,
//!    keys in document order and number literals exactly as uploaded.
//!
//! The bytes produced in step 5 are exactly what gets published, and
//! downstream reader apps parse the stored file, so the serialization must
//! stay stable.

use serde_json::{Map, Value};

use crate::error::UploadError;
use crate::models::{ClassifiedContent, SourceKind, DISCRIMINATORS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Characters that cannot appear in a published file name.
const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Normalize an uploaded source document.
///
/// # Errors
///
/// Returns [`UploadError::InvalidContent`] if the bytes are empty or not JSON,
/// the top-level value is not an object or array, the array is empty or
/// starts with a non-object, no discriminator field is present, or the name
/// is not a string or sanitizes to nothing.
pub fn normalize(raw: &[u8]) -> Result<ClassifiedContent, UploadError> {
    if raw.is_empty() {
        return Err(UploadError::InvalidContent(
            "file content is empty".to_string(),
        ));
    }

    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    let parsed: Value = serde_json::from_slice(raw)
        .map_err(|_| UploadError::InvalidContent("uploaded file is not valid JSON".to_string()))?;

    let (items, from_array) = match parsed {
        Value::Object(map) => (vec![Value::Object(map)], false),
        Value::Array(items) => (items, true),
        _ => return Err(UploadError::content("JSON is not an object or an array")),
    };

    let first = match items.first() {
        None => return Err(UploadError::content("JSON array is empty")),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(UploadError::content("JSON array element is not an object")),
    };

    let (kind, name_value) = classify(first).ok_or_else(|| {
        if from_array {
            UploadError::content("bookSourceName or sourceName not found in JSON array")
        } else {
            UploadError::content("bookSourceName or sourceName not found in JSON")
        }
    })?;

    let display_name = match name_value {
        Value::String(s) => sanitize_name(s),
        other if is_blank(other) => String::new(),
        _ => {
            return Err(UploadError::content(format!(
                "{} must be a string",
                kind.name_field()
            )))
        }
    };
    if display_name.is_empty() {
        return Err(UploadError::InvalidContent(
            "could not extract a name from the JSON".to_string(),
        ));
    }

    let canonical_bytes = serde_json::to_vec_pretty(&Value::Array(items))
        .map_err(|e| UploadError::Internal(e.into()))?;

    Ok(ClassifiedContent {
        kind,
        display_name,
        canonical_bytes,
    })
}

/// Find the first discriminator field present on `obj`.
///
/// Presence is what counts: a `null` value still classifies the document.
pub fn classify(obj: &Map<String, Value>) -> Option<(SourceKind, &Value)> {
    DISCRIMINATORS
        .iter()
        .find_map(|(field, kind)| obj.get(*field).map(|value| (*kind, value)))
}

/// `null`, `false`, zero and empty containers carry no usable name.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Strip path-hostile characters and surrounding whitespace from a name.
///
/// ```rust
/// use source_uploader::normalize::sanitize_name;
///
/// assert_eq!(sanitize_name(" A/B:C*D "), "ABCD");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN_NAME_CHARS.contains(c))
        .collect();
    cleaned.trim().to_string()
}
