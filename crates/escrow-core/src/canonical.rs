//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only input accepted by [`crate::sha256_digest`].
//! Journal entries, snapshots and anything else whose digest is compared
//! across processes pass through here first.
//!
//! ## Security Invariant
//!
//! The inner buffer is private. The single constructor serializes to a JSON
//! value, rejects floats anywhere in the tree, and emits RFC 8785 (JCS)
//! bytes via `serde_jcs`: sorted keys, compact separators, UTF-8.
//!
//! Ledger amounts are `u128` and serialize as decimal strings (see
//! [`crate::Amount`]), so no amount ever reaches the float check.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by float-rejecting JCS canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value tree contains a non-integral number,
    /// `SerializationFailed` if serde cannot represent the value as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// The canonical rendering.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the rendering in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the rendering is empty. Never true for a serialized value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}
