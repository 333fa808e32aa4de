//! # Escrow Identifiers
//!
//! An `EscrowId` is the SHA-256 digest of a tightly packed, fixed-layout
//! encoding of the escrow's public parameters:
//!
//! ```text
//! fungible: instance(20) | agent(20) | depositant(20) | retreader(20)
//!           | fee(u16 BE) | asset(20) | salt(32)
//! unique:   instance(20) | agent(20) | depositant(20) | retreader(20)
//!           | asset(20) | token_id(32) | salt(32)
//! ```
//!
//! Binding the ledger `instance` means the same terms produce different ids
//! on different ledgers, so a signature over an id cannot be replayed
//! against another deployment.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::fee::FeeRate;
use crate::hex;
use crate::identity::{Asset, Principal, Salt, TokenId};

const FUNGIBLE_PREIMAGE_LEN: usize = 20 * 4 + 2 + 20 + 32;
const UNIQUE_PREIMAGE_LEN: usize = 20 * 4 + 20 + 32 + 32;

/// A 32-byte escrow identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EscrowId([u8; 32]);

impl EscrowId {
    /// Wrap a raw 32-byte id.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Id in the sequential scheme: the counter, big-endian.
    pub fn from_sequence(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    /// Parse 64 hex digits, `0x` prefix optional.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        hex::decode_fixed::<32>(s).map(Self)
    }
}

impl std::str::FromStr for EscrowId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for EscrowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for EscrowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EscrowId({})", self.to_hex())
    }
}

impl Serialize for EscrowId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EscrowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive the id of a fungible escrow.
pub fn derive_escrow_id(
    instance: &Principal,
    agent: &Principal,
    depositant: &Principal,
    retreader: &Principal,
    fee: FeeRate,
    asset: &Asset,
    salt: &Salt,
) -> EscrowId {
    let mut preimage = Vec::with_capacity(FUNGIBLE_PREIMAGE_LEN);
    preimage.extend_from_slice(instance.as_bytes());
    preimage.extend_from_slice(agent.as_bytes());
    preimage.extend_from_slice(depositant.as_bytes());
    preimage.extend_from_slice(retreader.as_bytes());
    preimage.extend_from_slice(&fee.basis_points().to_be_bytes());
    preimage.extend_from_slice(asset.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    hash(&preimage)
}

/// Derive the id of a unique-asset escrow.
pub fn derive_unique_escrow_id(
    instance: &Principal,
    agent: &Principal,
    depositant: &Principal,
    retreader: &Principal,
    asset: &Asset,
    token_id: &TokenId,
    salt: &Salt,
) -> EscrowId {
    let mut preimage = Vec::with_capacity(UNIQUE_PREIMAGE_LEN);
    preimage.extend_from_slice(instance.as_bytes());
    preimage.extend_from_slice(agent.as_bytes());
    preimage.extend_from_slice(depositant.as_bytes());
    preimage.extend_from_slice(retreader.as_bytes());
    preimage.extend_from_slice(asset.as_bytes());
    preimage.extend_from_slice(token_id.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    hash(&preimage)
}

fn hash(preimage: &[u8]) -> EscrowId {
    let digest = Sha256::digest(preimage);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    EscrowId(bytes)
}
