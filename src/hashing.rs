//! Hashing - Canonical JSON and Avatar Fingerprints
//!
//! A fingerprint identifies a normalized avatar regardless of key order,
//! so callers can cache rendered URIs and skip redundant saves.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::avatar::AvatarConfig;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// fingerprint = sha256(canonical_json(config))
pub fn fingerprint(config: &AvatarConfig) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(config)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::TraitCategory;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"y": true, "b": false}});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":{"b":false,"y":true},"z":1}"#);
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a = AvatarConfig::new()
            .with(TraitCategory::Hat, "cap")
            .with(TraitCategory::Hair, "bun");
        let b = AvatarConfig::new()
            .with(TraitCategory::Hair, "bun")
            .with(TraitCategory::Hat, "cap");
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_eq!(fingerprint(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_traits() {
        let a = AvatarConfig::new().with(TraitCategory::Lashes, true);
        let b = AvatarConfig::new().with(TraitCategory::Lashes, false);
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }
}
