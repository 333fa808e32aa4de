//! # Signing Messages and Signature Bytes
//!
//! ## Security Invariant
//!
//! A [`SigningMessage`] can only be built from an [`EscrowId`]. Its bytes are
//! [`SIGNED_ID_PREFIX`] followed by the 32 id bytes, so a signature over an
//! escrow id is never a valid signature over anything else a key might sign.

use escrow_core::{hex, CoreError, EscrowId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Domain-separation prefix. The trailing `32` is the id length.
pub const SIGNED_ID_PREFIX: &[u8] = b"\x19Escrow Ledger Signed Id:\n32";

/// The exact bytes an agent signs to authorize an escrow id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SigningMessage(Vec<u8>);

impl SigningMessage {
    pub fn for_escrow_id(id: &EscrowId) -> Self {
        let mut bytes = Vec::with_capacity(SIGNED_ID_PREFIX.len() + 32);
        bytes.extend_from_slice(SIGNED_ID_PREFIX);
        bytes.extend_from_slice(id.as_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Opaque signature bytes as submitted by a relayer.
///
/// The ledger never interprets these; it hands them to its verifier and
/// keys the canceled-signature set on them. Serializes as `0x` hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignatureBytes(Vec<u8>);

impl SignatureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        hex::decode(s).map(Self)
    }
}

impl From<Vec<u8>> for SignatureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::str::FromStr for SignatureBytes {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let head: String = self.0.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "SignatureBytes({} bytes, {head}...)", self.0.len())
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
