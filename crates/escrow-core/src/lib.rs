#![deny(missing_docs)]

//! # escrow-core — Foundational Types for the Escrow Ledger
//!
//! This crate is the leaf of the workspace. It defines the value types every
//! other crate passes around and the two pieces of pure arithmetic the ledger
//! is built on: escrow id derivation and basis-point fee splitting.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Principal`, `Asset`,
//!    `Salt`, `TokenId`, `EscrowId`, `Amount`, `FeeRate`. No bare byte
//!    arrays or integers cross a crate boundary.
//!
//! 2. **The zero value is the null value.** `Principal::ZERO` stands for "no
//!    principal". A cleared escrow record reads back with zero principals, so
//!    every authorization check against it fails.
//!
//! 3. **Ids are re-derivable.** [`derive_escrow_id`] and
//!    [`derive_unique_escrow_id`] hash a packed, fixed-layout encoding of
//!    public parameters. Anyone holding the parameters computes the same id.
//!
//! 4. **Fees round down, never overflow.** [`FeeRate::split`] computes
//!    `floor(amount * rate / BASE)` exactly for the whole `u128` range.
//!
//! 5. **`CanonicalBytes` for digests of structured data.** Journal digests
//!    flow through `CanonicalBytes::new()` and [`sha256_digest`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `escrow-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod escrow_id;
pub mod fee;
pub mod hex;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use amount::Amount;
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use escrow_id::{derive_escrow_id, derive_unique_escrow_id, EscrowId};
pub use fee::{FeeRate, FeeSplit, BASE, MAX_AGENT_FEE};
pub use identity::{Asset, Principal, Salt, TokenId};
pub use temporal::Timestamp;
