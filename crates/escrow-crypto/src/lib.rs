//! # escrow-crypto — Signing Primitives
//!
//! Off-chain authorization for escrow creation. An agent signs an escrow id;
//! a relayer submits the terms plus that signature; the ledger asks a
//! [`SignatureVerifier`] who signed and compares the answer with the claimed
//! agent.
//!
//! - **Ed25519** key pairs, public keys and raw signatures.
//! - **[`SigningMessage`]**, the only thing a key pair will sign: a fixed
//!   prefix followed by a 32-byte escrow id.
//! - **[`SignatureBytes`]**, the opaque signature the ledger stores and
//!   cancels. For Ed25519 it is a 96-byte envelope `public_key | signature`,
//!   which lets the verifier recover the signer.
//! - **[`SignatureVerifier`]**, the collaborator trait, with the Ed25519
//!   implementation and a fixed-principal fake for tests.
//!
//! ## Crate Policy
//!
//! - Depends only on `escrow-core` internally.
//! - Private keys never serialize and never appear in `Debug` output.
//! - No `unsafe` code.

pub mod ed25519;
pub mod error;
pub mod message;
pub mod verifier;

pub use ed25519::{principal_of, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use message::{SignatureBytes, SigningMessage, SIGNED_ID_PREFIX};
pub use verifier::{Ed25519Verifier, FixedSignerVerifier, SignatureVerifier};
