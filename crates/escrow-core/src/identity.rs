//! # Identity Newtypes
//!
//! Fixed-width byte handles for everything the ledger names:
//!
//! | Type        | Width | Meaning                                  |
//! |-------------|-------|------------------------------------------|
//! | `Principal` | 20    | account that can call the ledger         |
//! | `Asset`     | 20    | token contract handle                    |
//! | `Salt`      | 32    | caller entropy bound into escrow ids     |
//! | `TokenId`   | 32    | unique-asset token number (big-endian)   |
//!
//! ## Security Invariant
//!
//! Distinct types per namespace: a `Salt` can never be passed where a
//! `TokenId` is expected even though both are 32-byte words, and an `Asset`
//! is never mistaken for a `Principal`.
//!
//! All of them render as `0x`-prefixed lowercase hex and serialize as that
//! string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::hex;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Byte width of this handle.
            pub const LEN: usize = $len;

            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Wrap raw bytes.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// The raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            /// Big-endian encoding of `n` in the low-order bytes.
            pub fn from_u64(n: u64) -> Self {
                let mut bytes = [0u8; $len];
                bytes[$len - 8..].copy_from_slice(&n.to_be_bytes());
                Self(bytes)
            }

            /// `0x`-prefixed lowercase hex.
            pub fn to_hex(&self) -> String {
                hex::encode_prefixed(&self.0)
            }

            /// Parse exactly `2 * LEN` hex digits, `0x` prefix optional.
            pub fn from_hex(s: &str) -> Result<Self, CoreError> {
                hex::decode_fixed::<$len>(s).map(Self)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// A 20-byte account handle. [`Principal::ZERO`] is the null principal:
    /// it never authorizes anything.
    Principal,
    20
);

fixed_bytes!(
    /// A 20-byte handle of a fungible or unique token contract.
    Asset,
    20
);

fixed_bytes!(
    /// Caller-chosen 32-byte entropy that keeps otherwise identical escrow
    /// terms from colliding.
    Salt,
    32
);

fixed_bytes!(
    /// Token number of a unique asset, stored big-endian.
    TokenId,
    32
);

impl Salt {
    /// Big-endian encoding of `n` in the low 16 bytes.
    pub fn from_u128(n: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

impl TokenId {
    /// Token number `n`, big-endian in the low 16 bytes.
    pub fn from_u128(n: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

impl Principal {
    /// Take the trailing 20 bytes of a 32-byte digest as a principal.
    pub fn from_digest_tail(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }
}
