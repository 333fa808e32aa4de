//! # Ed25519 Keys and Escrow-Id Signatures
//!
//! ## Security Invariant
//!
//! - [`Ed25519KeyPair::sign`] accepts only `&SigningMessage`. There is no way
//!   to sign raw bytes with an escrow key, so an id signature cannot be
//!   repurposed.
//! - Private keys are never serialized or logged. `Ed25519KeyPair` does not
//!   implement `Serialize` and its `Debug` output is redacted.
//!
//! ## Envelope
//!
//! Ed25519 signatures do not allow public-key recovery, so what the agent
//! hands a relayer is `public_key(32) | signature(64)` as a 96-byte
//! [`SignatureBytes`]. The verifier checks the signature under the enclosed
//! key and reports the key's [`Principal`] via [`principal_of`].
//!
//! ## Serde
//!
//! Public keys and signatures serialize as lowercase hex strings.

use ed25519_dalek::{Signer, Verifier};
use escrow_core::{hex, Principal};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::message::{SignatureBytes, SigningMessage};

/// Length of an Ed25519 signature envelope.
pub const ENVELOPE_LEN: usize = 32 + 64;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; 64]);

/// An Ed25519 key pair for signing escrow ids.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ── Principal mapping ────────────────────────────────────────────────

/// The principal controlled by a public key: last 20 bytes of `SHA-256(pk)`.
pub fn principal_of(public_key: &Ed25519PublicKey) -> Principal {
    let digest = Sha256::digest(public_key.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Principal::from_digest_tail(&bytes)
}

// ── Ed25519PublicKey ─────────────────────────────────────────────────

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse 64 hex digits (`0x` prefix optional).
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_fixed::<32>(s)
            .map(Self)
            .map_err(|e| CryptoError::KeyError(format!("public key: {e}")))
    }

    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }

    /// Verify `signature` over `message` under this key.
    pub fn verify(
        &self,
        message: &SigningMessage,
        signature: &Ed25519Signature,
    ) -> Result<(), CryptoError> {
        let vk = self.to_verifying_key()?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        vk.verify(message.as_bytes(), &sig)
            .map_err(|e| CryptoError::VerificationFailed(format!("ed25519: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex::encode(&self.0[..4]))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ── Ed25519Signature ─────────────────────────────────────────────────

impl Ed25519Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_fixed::<64>(s)
            .map(Self)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))
    }

    /// Pack `public_key | signature` into the 96-byte envelope.
    pub fn envelope(&self, public_key: &Ed25519PublicKey) -> SignatureBytes {
        let mut bytes = Vec::with_capacity(ENVELOPE_LEN);
        bytes.extend_from_slice(public_key.as_bytes());
        bytes.extend_from_slice(&self.0);
        SignatureBytes::new(bytes)
    }

    /// Split an envelope back into its key and signature.
    pub fn open_envelope(
        envelope: &SignatureBytes,
    ) -> Result<(Ed25519PublicKey, Ed25519Signature), CryptoError> {
        let bytes = envelope.as_bytes();
        if bytes.len() != ENVELOPE_LEN {
            return Err(CryptoError::MalformedSignature(format!(
                "envelope must be {ENVELOPE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut pk = [0u8; 32];
        pk.copy_from_slice(&bytes[..32]);
        let mut sig = [0u8; 64];
        sig.copy_from_slice(&bytes[32..]);
        Ok((Ed25519PublicKey(pk), Ed25519Signature(sig)))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex::encode(&self.0[..4]))
    }
}

// ── Ed25519KeyPair ───────────────────────────────────────────────────

impl Ed25519KeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte seed, as written by `escrow keygen`.
    pub fn from_seed_hex(s: &str) -> Result<Self, CryptoError> {
        let seed = hex::decode_fixed::<32>(s)
            .map_err(|e| CryptoError::KeyError(format!("seed: {e}")))?;
        Ok(Self::from_seed(&seed))
    }

    /// Hex-encoded seed. Only for writing key files.
    pub fn seed_hex(&self) -> String {
        hex::encode(&self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn principal(&self) -> Principal {
        principal_of(&self.public_key())
    }

    pub fn sign(&self, message: &SigningMessage) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message.as_bytes()).to_bytes())
    }

    /// Sign and wrap into the envelope a relayer submits.
    pub fn sign_envelope(&self, message: &SigningMessage) -> SignatureBytes {
        self.sign(message).envelope(&self.public_key())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}
