//! # escrow-ledger — Escrow State Machine and Accounting
//!
//! The ledger holds a depositant's assets until the agent, or the
//! counter-party, releases them. Proceeds are split between the
//! beneficiary, the agent (a per-escrow fee taken on withdrawal) and the
//! platform operator (a global fee taken on deposit).
//!
//! - [`EscrowLedger`]: fungible assets, optional approval gate, operator
//!   fee administration.
//! - [`UniqueEscrowLedger`]: unique (non-fungible) assets; each record
//!   tracks whether it holds its token, no fees.
//! - [`AssetTransferAgent`] / [`UniqueAssetTransferAgent`]: custody
//!   collaborators, with in-memory implementations for simulation and tests.
//! - [`EventJournal`]: every emitted event, hash-chained.
//!   [`LedgerSnapshot::replay`] rebuilds ledger state from events alone.
//! - [`SharedLedger`]: a cloneable, lock-guarded handle for multi-threaded
//!   callers.
//!
//! ## Security Invariant
//!
//! Every operation validates first, moves assets second, and commits state
//! last. A rejected call or a failed transfer leaves records, balances, the
//! canceled-signature set and the journal exactly as they were.
//!
//! ## Crate Policy
//!
//! - Callers are explicit: every mutating method takes the calling
//!   [`Principal`](escrow_core::Principal) as its first argument.
//! - Authorization errors do not distinguish "unknown escrow" from "wrong
//!   principal".
//! - No `unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod event;
pub mod journal;
pub mod ledger;
pub mod record;
pub mod shared;
pub mod snapshot;
pub mod transfer;
pub mod unique;

pub use config::{ApprovalMode, CancelPolicy, IdScheme, LedgerConfig};
pub use error::{ConfigError, JournalError, LedgerError, TransferError};
pub use event::{LedgerEvent, UniqueLedgerEvent};
pub use journal::{EventJournal, JournalEntry};
pub use ledger::EscrowLedger;
pub use record::{
    DepositSplit, EscrowRecord, EscrowState, EscrowTerms, UniqueEscrowRecord, UniqueEscrowTerms,
    WithdrawSplit,
};
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, UniqueLedgerSnapshot};
pub use transfer::{
    AssetTransferAgent, InMemoryTokenBank, InMemoryTokenRegistry, UniqueAssetTransferAgent,
};
pub use unique::UniqueEscrowLedger;
