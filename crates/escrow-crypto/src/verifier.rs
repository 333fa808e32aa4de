//! # Signer Recovery
//!
//! The ledger never decides on its own who signed something. It asks a
//! [`SignatureVerifier`] to recover the signer of a [`SigningMessage`] and
//! compares the result with the principal the relayer claims.

use std::collections::BTreeSet;

use escrow_core::Principal;

use crate::ed25519::{principal_of, Ed25519Signature};
use crate::message::{SignatureBytes, SigningMessage};

/// Recovers the principal that produced a signature.
pub trait SignatureVerifier {
    /// `None` if the signature is malformed or does not verify.
    fn recover_signer(&self, message: &SigningMessage, signature: &SignatureBytes)
        -> Option<Principal>;
}

/// Ed25519 recovery over the 96-byte `public_key | signature` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn recover_signer(
        &self,
        message: &SigningMessage,
        signature: &SignatureBytes,
    ) -> Option<Principal> {
        let (public_key, sig) = Ed25519Signature::open_envelope(signature).ok()?;
        public_key.verify(message, &sig).ok()?;
        Some(principal_of(&public_key))
    }
}

/// Test double that attributes every signature to one principal.
///
/// Signatures listed with [`FixedSignerVerifier::rejecting`] recover to
/// `None` instead.
#[derive(Debug, Clone, Default)]
pub struct FixedSignerVerifier {
    signer: Principal,
    rejected: BTreeSet<SignatureBytes>,
}

impl FixedSignerVerifier {
    pub fn new(signer: Principal) -> Self {
        Self {
            signer,
            rejected: BTreeSet::new(),
        }
    }

    pub fn rejecting(mut self, signature: SignatureBytes) -> Self {
        self.rejected.insert(signature);
        self
    }
}

impl SignatureVerifier for FixedSignerVerifier {
    fn recover_signer(
        &self,
        _message: &SigningMessage,
        signature: &SignatureBytes,
    ) -> Option<Principal> {
        if self.rejected.contains(signature) {
            None
        } else {
            Some(self.signer)
        }
    }
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for &V {
    fn recover_signer(
        &self,
        message: &SigningMessage,
        signature: &SignatureBytes,
    ) -> Option<Principal> {
        (**self).recover_signer(message, signature)
    }
}
