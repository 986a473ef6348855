//! Content-addressed item identity
//!
//! An item's fingerprint is a version-5 UUID over its canonical JSON text:
//! object keys sorted at every depth, compact separators, numbers as
//! `serde_json` renders them with float zero always unsigned. Two items with
//! equal content always share a fingerprint, no matter how their maps were
//! built or where they came from.
//!
//! JSON has no spelling for NaN or infinity, and `serde_json` quietly turns
//! them into `null`. Items carrying such floats are rejected rather than
//! being folded together with their `null` siblings.

use super::error::{QueueError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Namespace for fingerprint hashing (the X.500 DN namespace)
pub const FINGERPRINT_NAMESPACE: Uuid = Uuid::NAMESPACE_X500;

/// Stable identifier for "the same logical item"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for Fingerprint {
    fn from(value: Uuid) -> Self {
        Self(value.hyphenated().to_string())
    }
}

/// Compute the fingerprint of any serializable item
pub fn fingerprint<T: Serialize + ?Sized>(item: &T) -> Result<Fingerprint> {
    let text = canonical_json(item)?;
    Ok(Uuid::new_v5(&FINGERPRINT_NAMESPACE, text.as_bytes()).into())
}

/// Render an item as sorted-key compact JSON
pub fn canonical_json<T: Serialize + ?Sized>(item: &T) -> Result<String> {
    let value = canonicalize(serde_json::to_value(item)?);
    ensure_finite(item)?;
    Ok(serde_json::to_string(&value)?)
}

// CBOR keeps floats as they are, so NaN and infinity survive to be seen here.
fn ensure_finite<T: Serialize + ?Sized>(item: &T) -> Result<()> {
    let value = serde_cbor::value::to_value(item)
        .map_err(|err| QueueError::InvalidItem(err.to_string()))?;

    if has_non_finite(&value) {
        return Err(QueueError::InvalidItem(
            "NaN and infinite numbers have no JSON form".to_string(),
        ));
    }
    Ok(())
}

fn has_non_finite(value: &serde_cbor::Value) -> bool {
    use serde_cbor::Value as Cbor;

    match value {
        Cbor::Float(number) => !number.is_finite(),
        Cbor::Array(items) => items.iter().any(has_non_finite),
        Cbor::Map(entries) => entries
            .iter()
            .any(|(key, inner)| has_non_finite(key) || has_non_finite(inner)),
        Cbor::Tag(_, inner) => has_non_finite(inner),
        _ => false,
    }
}

// Rebuilds maps in key order so the output does not depend on whether
// serde_json was compiled with `preserve_order`.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        // -0.0 == 0.0
        Value::Number(number) if number.is_f64() && number.as_f64() == Some(0.0) => {
            Value::from(0.0_f64)
        }
        other => other,
    }
}
