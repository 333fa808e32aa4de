//! # Amounts
//!
//! `Amount` wraps a `u128` token quantity. It serializes as a decimal string
//! because JSON numbers cannot carry the full `u128` range and canonical
//! digests reject floats.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A fungible token quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    /// Nothing.
    pub const ZERO: Self = Self(0);
    /// The largest representable quantity.
    pub const MAX: Self = Self(u128::MAX);

    /// Wrap a raw quantity.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The raw quantity.
    pub const fn get(&self) -> u128 {
        self.0
    }

    /// Whether this is [`Amount::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self + other`, or `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `self - other`, or `None` if `other` is larger.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Amount {
    type Err = CoreError;

    /// Decimal digits only; `_` separators are allowed for readability.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '_').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::InvalidAmount(s.to_string()));
        }
        digits
            .parse::<u128>()
            .map(Self)
            .map_err(|_| CoreError::InvalidAmount(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    /// Accepts a decimal string or, for hand-written YAML/JSON, a
    /// non-negative integer.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Int(n) => Ok(Self(u128::from(n))),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
