//! # Error Types

use thiserror::Error;

/// Errors from key and signature handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key parsing or decoding failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A signature or envelope had the wrong shape.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        assert_eq!(
            CryptoError::KeyError("bad seed".into()).to_string(),
            "key error: bad seed"
        );
        assert!(CryptoError::MalformedSignature("95 bytes".into())
            .to_string()
            .contains("95 bytes"));
        assert!(CryptoError::VerificationFailed("wrong key".into())
            .to_string()
            .starts_with("signature verification failed"));
    }
}
