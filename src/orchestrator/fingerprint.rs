//! State fingerprinting
//!
//! SHA-256 over canonical (sorted-key) JSON. Two states with equal
//! fingerprints are byte-identical under canonical serialization, which
//! is how the determinism contract is checked without diffing trees.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::SimulationError;

/// Canonical SHA-256 fingerprint of any serializable value.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, SimulationError> {
    let json =
        serde_json::to_value(value).map_err(|e| SimulationError::Serialization(e.to_string()))?;
    let canonical = canonicalize(json);
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| SimulationError::Serialization(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Recursively sort object keys so serialization order is deterministic
/// regardless of how maps were built.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_bank_state;

    #[test]
    fn test_equal_states_equal_fingerprints() {
        let a = default_bank_state(42);
        let b = default_bank_state(42);
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_any_field_change_changes_fingerprint() {
        let a = default_bank_state(42);
        let mut b = default_bank_state(42);
        b.capital.cet1 += 1.0;
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let state = default_bank_state(1);
        let fp = fingerprint(&state).unwrap();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
