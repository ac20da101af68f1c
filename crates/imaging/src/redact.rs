//! Structural redaction of decoded metadata trees.
//!
//! Redaction is driven by field name, not by path: every mapping entry whose
//! key is a redacted field is replaced with `null`, at any depth, including
//! mappings nested inside arrays. All other entries are left untouched.

use serde_json::Value;

/// DICOM JSON key carrying base64 bulk binary payloads.
pub const INLINE_BINARY: &str = "InlineBinary";

/// VOI LUT Sequence (0028,3010), view transform parameters.
pub const VOI_LUT_SEQUENCE: &str = "00283010";

/// Fields nulled before metadata is published.
pub const REDACTED_FIELDS: [&str; 2] = [INLINE_BINARY, VOI_LUT_SEQUENCE];

/// Redact a decoded header for publication.
///
/// # Arguments
/// * `header` - DICOM JSON model tree
///
/// # Returns
/// The same tree with every [`REDACTED_FIELDS`] entry set to `null`.
pub fn redact(mut header: Value) -> Value {
    nullify_fields(&mut header, &REDACTED_FIELDS);
    header
}

/// Null every mapping entry whose key is one of `fields`.
///
/// # Arguments
/// * `value` - Tree to modify in place
/// * `fields` - Field names to null
pub fn nullify_fields(value: &mut Value, fields: &[&str]) {
    nullify_matching(value, &|key: &str| fields.contains(&key));
}

/// Depth-first walk nulling every mapping entry whose key matches `predicate`.
///
/// Nulled values are not descended into.
///
/// # Arguments
/// * `value` - Tree to modify in place
/// * `predicate` - Returns `true` for field names to null
pub fn nullify_matching<F>(value: &mut Value, predicate: &F)
where
    F: Fn(&str) -> bool,
{
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if predicate(key.as_str()) {
                    *child = Value::Null;
                } else {
                    nullify_matching(child, predicate);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                nullify_matching(item, predicate);
            }
        }
        _ => {}
    }
}
