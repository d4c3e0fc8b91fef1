use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{HaioError, Result};

/// Render `value` into a canonical JSON string: every object's keys are
/// sorted, recursively, so that two structurally equal values always
/// serialise identically regardless of field insertion order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// A stable, content-addressed fingerprint of `value`.
///
/// `fp(x) == fp(y)` iff `x` and `y` canonicalise to the same JSON, per
/// Field order and whitespace never affect the result.
pub fn fp<T: Serialize>(value: &T) -> Result<String> {
    let raw = serde_json::to_value(value).map_err(|source| HaioError::Serde { path: "<fingerprint input>".into(), source })?;
    let canonical = canonicalize(&raw);
    let bytes = serde_json::to_vec(&canonical).map_err(|source| HaioError::Serde { path: "<fingerprint input>".into(), source })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// A fresh random identifier, used for cache ids, requested-question
/// handles, and reservation ids.
pub fn uid() -> String {
    Uuid::new_v4().to_string()
}
