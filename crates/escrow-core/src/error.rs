//! # Error Types
//!
//! Errors raised while parsing or computing core values. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Ledger-level failures (authorization, balances, signatures) live in
//! `escrow-ledger`; this module only covers what can go wrong before a value
//! ever reaches the ledger.

use thiserror::Error;

/// Errors produced by core value construction and arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A hex string had the wrong number of digits for the target type.
    #[error("expected {expected} hex digits, got {actual}")]
    InvalidLength {
        /// Required digit count (without the `0x` prefix).
        expected: usize,
        /// Digit count that was supplied.
        actual: usize,
    },

    /// A hex string contained a non-hex character.
    #[error("invalid hex digit at position {position}")]
    InvalidHex {
        /// Zero-based character offset after the `0x` prefix.
        position: usize,
    },

    /// A decimal amount string could not be parsed.
    #[error("invalid amount: \"{0}\"")]
    InvalidAmount(String),

    /// A fee rate exceeded its configured maximum.
    #[error("fee rate {fee} exceeds maximum {max}")]
    FeeTooHigh {
        /// The rejected raw fee.
        fee: u64,
        /// The inclusive maximum.
        max: u16,
    },

    /// Checked arithmetic overflowed or underflowed.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// A timestamp string was malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_length_display() {
        let err = CoreError::InvalidLength {
            expected: 40,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("40"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn fee_too_high_display() {
        let err = CoreError::FeeTooHigh {
            fee: 1001,
            max: 1000,
        };
        assert_eq!(err.to_string(), "fee rate 1001 exceeds maximum 1000");
    }

    #[test]
    fn overflow_display() {
        let err = CoreError::Overflow("balance credit");
        assert!(err.to_string().contains("balance credit"));
    }

    #[test]
    fn float_rejected_display() {
        let err = CanonicalizationError::FloatRejected(1.5);
        assert!(err.to_string().contains("1.5"));
    }
}
