//! Generic JSON 6902 patches for objects without a known schema.
use serde_json::Value;

/// Computes the sequence of `add`, `remove` and `replace` operations which turn `original` into
/// `modified`.
pub fn create_json_patch(original: &Value, modified: &Value) -> json_patch::Patch {
    json_patch::diff(original, modified)
}
