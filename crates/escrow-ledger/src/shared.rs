//! # Shared Ledger Handle
//!
//! Ledger operations take `&mut self`. [`SharedLedger`] serializes them
//! behind one `parking_lot::Mutex` so a ledger can be driven from several
//! threads. The lock is held for exactly one closure; collaborators are
//! called inside it and must not call back into the handle.

use std::sync::Arc;

use parking_lot::Mutex;

/// Cloneable, thread-safe handle to a ledger.
///
/// Works for both [`crate::EscrowLedger`] and [`crate::UniqueEscrowLedger`].
/// The mutex does not poison, so a panicking closure leaves the ledger
/// usable; ledger operations never leave partial state behind anyway.
#[derive(Debug)]
pub struct SharedLedger<L> {
    inner: Arc<Mutex<L>>,
}

impl<L> Clone for SharedLedger<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L> SharedLedger<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Run `f` with exclusive access to the ledger.
    ///
    /// Read-validate-write sequences inside one closure are atomic with
    /// respect to every other handle.
    pub fn with<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Recover the ledger if this is the last handle.
    pub fn try_unwrap(self) -> Result<L, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
