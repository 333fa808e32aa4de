//! # Ledger Snapshots and Replay
//!
//! A snapshot is the complete mutable state of a ledger. The ledgers keep
//! their state *as* a snapshot, so `snapshot()` is a clone and
//! [`LedgerSnapshot::replay`] can be compared against it directly.
//!
//! Replay is strict: an event that refers to an escrow that earlier events
//! never created, or that would drive a balance negative, is an
//! inconsistency, not something to skip.

use std::collections::{BTreeMap, BTreeSet};

use escrow_core::{Amount, Asset, EscrowId, FeeRate, Principal};
use escrow_crypto::SignatureBytes;
use serde::{Deserialize, Serialize};

use crate::error::JournalError;
use crate::event::{LedgerEvent, UniqueLedgerEvent};
use crate::record::{EscrowRecord, UniqueEscrowRecord};

/// Mutable state of an [`crate::EscrowLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub owner: Principal,
    pub operator_fee: FeeRate,
    /// Escrows ever created; drives sequential ids.
    pub escrow_count: u64,
    pub records: BTreeMap<EscrowId, EscrowRecord>,
    /// Operator fees accrued and not yet withdrawn.
    pub platform_balances: BTreeMap<Asset, Amount>,
    pub canceled_signatures: BTreeSet<(Principal, SignatureBytes)>,
    pub canceled_ids: BTreeSet<EscrowId>,
}

/// Mutable state of a [`crate::UniqueEscrowLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UniqueLedgerSnapshot {
    pub escrow_count: u64,
    pub records: BTreeMap<EscrowId, UniqueEscrowRecord>,
    pub canceled_signatures: BTreeSet<(Principal, SignatureBytes)>,
    pub canceled_ids: BTreeSet<EscrowId>,
}

fn missing(sequence: usize, event: &str, id: &EscrowId) -> JournalError {
    JournalError::Inconsistent(format!("event {sequence} ({event}) refers to unknown escrow {id}"))
}

fn custody(sequence: usize, event: &str, id: &EscrowId) -> JournalError {
    JournalError::Inconsistent(format!(
        "event {sequence} ({event}) contradicts the custody of escrow {id}"
    ))
}

fn overflow(sequence: usize, event: &str) -> JournalError {
    JournalError::Inconsistent(format!("event {sequence} ({event}) overflows a balance"))
}

impl LedgerSnapshot {
    /// Rebuild state from the full event history, starting from empty.
    pub fn replay<'a>(
        events: impl IntoIterator<Item = &'a LedgerEvent>,
    ) -> Result<Self, JournalError> {
        let mut state = Self::default();
        for (seq, event) in events.into_iter().enumerate() {
            state.apply(seq, event)?;
        }
        Ok(state)
    }

    fn record_mut(
        &mut self,
        seq: usize,
        event: &str,
        id: &EscrowId,
    ) -> Result<&mut EscrowRecord, JournalError> {
        self.records
            .get_mut(id)
            .filter(|r| !r.canceled)
            .ok_or_else(|| missing(seq, event, id))
    }

    fn apply(&mut self, seq: usize, event: &LedgerEvent) -> Result<(), JournalError> {
        let name = event.name();
        match event {
            LedgerEvent::CreateEscrow {
                escrow_id,
                agent,
                depositant,
                retreader,
                fee,
                asset,
                approved,
                ..
            } => {
                self.records.insert(
                    *escrow_id,
                    EscrowRecord {
                        agent: *agent,
                        depositant: *depositant,
                        retreader: *retreader,
                        fee: *fee,
                        asset: *asset,
                        balance: Amount::ZERO,
                        approved: *approved,
                        canceled: false,
                    },
                );
                self.escrow_count = self
                    .escrow_count
                    .checked_add(1)
                    .ok_or_else(|| overflow(seq, name))?;
            }
            LedgerEvent::SignedCreateEscrow { .. } => {}
            LedgerEvent::CancelSignature { signer, signature } => {
                self.canceled_signatures.insert((*signer, signature.clone()));
            }
            LedgerEvent::CancelSignatureId { escrow_id } => {
                self.canceled_ids.insert(*escrow_id);
            }
            LedgerEvent::ApproveEscrow { escrow_id } => {
                self.record_mut(seq, name, escrow_id)?.approved = true;
            }
            LedgerEvent::RemoveApproveEscrow { escrow_id } => {
                self.record_mut(seq, name, escrow_id)?.approved = false;
            }
            LedgerEvent::Deposit {
                escrow_id,
                to_escrow,
                to_operator,
            } => {
                let record = self.record_mut(seq, name, escrow_id)?;
                record.balance = record
                    .balance
                    .checked_add(*to_escrow)
                    .ok_or_else(|| overflow(seq, name))?;
                let asset = record.asset;
                let platform = self.platform_balances.entry(asset).or_default();
                *platform = platform
                    .checked_add(*to_operator)
                    .ok_or_else(|| overflow(seq, name))?;
            }
            LedgerEvent::Withdraw {
                escrow_id,
                to_amount,
                to_agent,
                ..
            } => {
                let record = self.record_mut(seq, name, escrow_id)?;
                let amount = to_amount
                    .checked_add(*to_agent)
                    .ok_or_else(|| overflow(seq, name))?;
                record.balance = record
                    .balance
                    .checked_sub(amount)
                    .ok_or_else(|| overflow(seq, name))?;
            }
            LedgerEvent::Cancel {
                escrow_id,
                retained,
                ..
            } => {
                if *retained {
                    let record = self.record_mut(seq, name, escrow_id)?;
                    record.balance = Amount::ZERO;
                    record.approved = false;
                    record.canceled = true;
                } else if self.records.remove(escrow_id).is_none() {
                    return Err(missing(seq, name, escrow_id));
                }
            }
            LedgerEvent::SetOperatorFee { fee } => {
                self.operator_fee = *fee;
            }
            LedgerEvent::OperatorWithdraw { asset, amount, .. } => {
                let platform = self.platform_balances.entry(*asset).or_default();
                *platform = platform
                    .checked_sub(*amount)
                    .ok_or_else(|| overflow(seq, name))?;
            }
            LedgerEvent::OwnershipTransferred { new, .. } => {
                self.owner = *new;
            }
        }
        Ok(())
    }
}

impl UniqueLedgerSnapshot {
    /// Rebuild state from the full event history, starting from empty.
    pub fn replay<'a>(
        events: impl IntoIterator<Item = &'a UniqueLedgerEvent>,
    ) -> Result<Self, JournalError> {
        let mut state = Self::default();
        for (seq, event) in events.into_iter().enumerate() {
            match event {
                UniqueLedgerEvent::CreateEscrow {
                    escrow_id,
                    agent,
                    depositant,
                    retreader,
                    asset,
                    token_id,
                    ..
                } => {
                    state.records.insert(
                        *escrow_id,
                        UniqueEscrowRecord {
                            agent: *agent,
                            depositant: *depositant,
                            retreader: *retreader,
                            asset: *asset,
                            token_id: *token_id,
                            deposited: false,
                        },
                    );
                    state.escrow_count = state
                        .escrow_count
                        .checked_add(1)
                        .ok_or_else(|| overflow(seq, "CreateEscrow"))?;
                }
                UniqueLedgerEvent::CancelSignature { signer, signature } => {
                    state.canceled_signatures.insert((*signer, signature.clone()));
                }
                UniqueLedgerEvent::CancelSignatureId { escrow_id } => {
                    state.canceled_ids.insert(*escrow_id);
                }
                UniqueLedgerEvent::Deposit { escrow_id } => {
                    let record = state
                        .records
                        .get_mut(escrow_id)
                        .ok_or_else(|| missing(seq, "Deposit", escrow_id))?;
                    if record.deposited {
                        return Err(custody(seq, "Deposit", escrow_id));
                    }
                    record.deposited = true;
                }
                UniqueLedgerEvent::Withdraw { escrow_id, .. } => {
                    let record = state
                        .records
                        .get_mut(escrow_id)
                        .ok_or_else(|| missing(seq, "Withdraw", escrow_id))?;
                    if !record.deposited {
                        return Err(custody(seq, "Withdraw", escrow_id));
                    }
                    record.deposited = false;
                }
                UniqueLedgerEvent::Cancel { escrow_id } => {
                    if state.records.remove(escrow_id).is_none() {
                        return Err(missing(seq, "Cancel", escrow_id));
                    }
                }
                UniqueLedgerEvent::SignedCreateEscrow { .. } => {}
            }
        }
        Ok(state)
    }
}
