//! # Fungible Escrow Ledger
//!
//! [`EscrowLedger`] owns every fungible escrow record, the operator fee and
//! its accrued balances, and the canceled-signature set. Callers act only
//! through escrow ids.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──create──▶ Created{approved?} ──deposit──▶ Funded
//!       ▲                        │    ▲                        │
//!       │                        │    └──────withdraw all──────┘
//!       └─────────cancel─────────┴──────────cancel─────────────┘
//! ```
//!
//! ## Fees
//!
//! - Deposit: `to_operator = floor(amount * operator_fee / BASE)`; the rest
//!   is credited to the escrow.
//! - Withdraw: `to_agent = floor(amount * escrow.fee / BASE)`; the rest goes
//!   to the beneficiary. Both payouts go through one atomic `push_many`.
//!
//! ## Security Invariant
//!
//! Each operation runs validate → seal journal entries → transfer →
//! commit. Nothing in `self` changes until the collaborator has accepted
//! the transfer.

use escrow_core::{derive_escrow_id, Amount, Asset, EscrowId, FeeRate, Principal, Salt};
use escrow_crypto::{SignatureBytes, SignatureVerifier, SigningMessage};

use crate::config::{CancelPolicy, IdScheme, LedgerConfig};
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::journal::EventJournal;
use crate::record::{DepositSplit, EscrowRecord, EscrowState, EscrowTerms, Release, WithdrawSplit};
use crate::snapshot::LedgerSnapshot;
use crate::transfer::AssetTransferAgent;

/// Escrow ledger for fungible assets.
#[derive(Debug)]
pub struct EscrowLedger<T, V> {
    config: LedgerConfig,
    state: LedgerSnapshot,
    journal: EventJournal<LedgerEvent>,
    bank: T,
    verifier: V,
}

/// Log a rejection at `warn` when it concerns the caller's identity.
pub(crate) fn rejected(
    operation: &'static str,
    caller: &Principal,
    err: LedgerError,
) -> LedgerError {
    if err.is_authorization() {
        tracing::warn!(operation, caller = %caller, error = %err, "rejected unauthorized call");
    } else {
        tracing::debug!(operation, caller = %caller, error = %err, "rejected call");
    }
    err
}

impl<T: AssetTransferAgent, V: SignatureVerifier> EscrowLedger<T, V> {
    /// Build a ledger. Journals the initial ownership and operator fee so
    /// that replay starts from an empty snapshot.
    pub fn new(config: LedgerConfig, bank: T, verifier: V) -> Result<Self, LedgerError> {
        let operator_fee = config.initial_operator_fee()?;
        let mut ledger = Self {
            config,
            state: LedgerSnapshot::default(),
            journal: EventJournal::new(),
            bank,
            verifier,
        };
        let sealed = ledger.journal.seal(vec![
            LedgerEvent::OwnershipTransferred {
                previous: Principal::ZERO,
                new: ledger.config.owner,
            },
            LedgerEvent::SetOperatorFee { fee: operator_fee },
        ])?;
        ledger.state.owner = ledger.config.owner;
        ledger.state.operator_fee = operator_fee;
        ledger.journal.commit(sealed);
        tracing::debug!(
            instance = %ledger.config.instance,
            owner = %ledger.config.owner,
            operator_fee = %operator_fee,
            "escrow ledger initialised"
        );
        Ok(ledger)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The configuration the ledger was built with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The ledger's own principal. Custodied funds are held under it.
    pub fn instance(&self) -> &Principal {
        &self.config.instance
    }

    /// Current platform owner.
    pub fn owner(&self) -> &Principal {
        &self.state.owner
    }

    /// Operator cut taken from every deposit.
    pub fn operator_fee(&self) -> FeeRate {
        self.state.operator_fee
    }

    /// The stored record, including one spent by a retaining cancel.
    pub fn escrow(&self, id: &EscrowId) -> Option<&EscrowRecord> {
        self.state.records.get(id)
    }

    /// The record, or the all-zero record for unknown ids.
    pub fn escrow_view(&self, id: &EscrowId) -> EscrowRecord {
        self.escrow(id).cloned().unwrap_or_default()
    }

    /// Lifecycle position of `id`. Unknown and canceled ids are
    /// [`EscrowState::Uninitialized`].
    pub fn state(&self, id: &EscrowId) -> EscrowState {
        EscrowState::of(self.escrow(id))
    }

    /// Operator fees accrued in `asset` and not yet withdrawn.
    pub fn platform_balance(&self, asset: &Asset) -> Amount {
        self.state
            .platform_balances
            .get(asset)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Whether `signer` has canceled `signature` for relayed creation.
    pub fn is_signature_canceled(
        &self,
        signer: &Principal,
        signature: &SignatureBytes,
    ) -> bool {
        self.state
            .canceled_signatures
            .contains(&(*signer, signature.clone()))
    }

    /// Whether relayed creation of `id` has been canceled.
    pub fn is_id_canceled(&self, id: &EscrowId) -> bool {
        self.state.canceled_ids.contains(id)
    }

    /// A copy of the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.clone()
    }

    /// Every event committed so far.
    pub fn journal(&self) -> &EventJournal<LedgerEvent> {
        &self.journal
    }

    /// The custody collaborator.
    pub fn bank(&self) -> &T {
        &self.bank
    }

    /// Mutable access to the custody collaborator, for funding accounts in
    /// simulations and tests.
    pub fn bank_mut(&mut self) -> &mut T {
        &mut self.bank
    }

    /// The signature verifier used for relayed creation.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// The id an escrow with these parameters gets on this ledger.
    ///
    /// Under [`IdScheme::Sequential`] this is the next counter value and the
    /// parameters are ignored.
    pub fn calculate_id(
        &self,
        agent: &Principal,
        depositant: &Principal,
        retreader: &Principal,
        fee: FeeRate,
        asset: &Asset,
        salt: &Salt,
    ) -> EscrowId {
        match self.config.id_scheme {
            IdScheme::Derived => derive_escrow_id(
                &self.config.instance,
                agent,
                depositant,
                retreader,
                fee,
                asset,
                salt,
            ),
            IdScheme::Sequential => {
                EscrowId::from_sequence(self.state.escrow_count.saturating_add(1))
            }
        }
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create an escrow with the caller as agent.
    pub fn create_escrow(
        &mut self,
        caller: &Principal,
        terms: &EscrowTerms,
    ) -> Result<EscrowId, LedgerError> {
        self.try_create(caller, terms)
            .map_err(|e| rejected("create_escrow", caller, e))
    }

    fn try_create(
        &mut self,
        caller: &Principal,
        terms: &EscrowTerms,
    ) -> Result<EscrowId, LedgerError> {
        let (id, fee) = self.prepare_create(caller, terms)?;
        let approved = self.config.approval_required();
        self.commit_create(id, caller, fee, terms, approved, None)
    }

    /// Create an escrow on behalf of `agent`, authorized by the agent's
    /// signature over the escrow id. The caller is only the relayer.
    pub fn signed_create_escrow(
        &mut self,
        caller: &Principal,
        agent: &Principal,
        terms: &EscrowTerms,
        signature: &SignatureBytes,
    ) -> Result<EscrowId, LedgerError> {
        self.try_signed_create(caller, agent, terms, signature)
            .map_err(|e| rejected("signed_create_escrow", caller, e))
    }

    fn try_signed_create(
        &mut self,
        caller: &Principal,
        agent: &Principal,
        terms: &EscrowTerms,
        signature: &SignatureBytes,
    ) -> Result<EscrowId, LedgerError> {
        let (id, fee) = self.prepare_create(agent, terms)?;
        if self.is_signature_canceled(agent, signature) || self.is_id_canceled(&id) {
            return Err(LedgerError::SignatureCanceled);
        }
        let message = SigningMessage::for_escrow_id(&id);
        match self.verifier.recover_signer(&message, signature) {
            Some(signer) if signer == *agent => {}
            _ => return Err(LedgerError::InvalidSignature),
        }
        let approved = self.config.approval_required() && caller == agent;
        self.commit_create(id, agent, fee, terms, approved, Some(signature.clone()))
    }

    fn bounded_agent_fee(&self, raw: u64) -> Result<FeeRate, LedgerError> {
        let max = self.config.max_agent_fee;
        FeeRate::bounded(raw, max).map_err(|_| LedgerError::FeeTooHigh { fee: raw, max })
    }

    fn prepare_create(
        &self,
        agent: &Principal,
        terms: &EscrowTerms,
    ) -> Result<(EscrowId, FeeRate), LedgerError> {
        if agent.is_zero() {
            return Err(LedgerError::MissingAgent);
        }
        let fee = self.bounded_agent_fee(terms.fee)?;
        let id = self.calculate_id(
            agent,
            &terms.depositant,
            &terms.retreader,
            fee,
            &terms.asset,
            &terms.salt,
        );
        Ok((id, fee))
    }

    fn commit_create(
        &mut self,
        id: EscrowId,
        agent: &Principal,
        fee: FeeRate,
        terms: &EscrowTerms,
        approved: bool,
        signature: Option<SignatureBytes>,
    ) -> Result<EscrowId, LedgerError> {
        if self.state.records.contains_key(&id) {
            return Err(LedgerError::EscrowAlreadyExists);
        }
        let count = self
            .state
            .escrow_count
            .checked_add(1)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let mut events = vec![LedgerEvent::CreateEscrow {
            escrow_id: id,
            agent: *agent,
            depositant: terms.depositant,
            retreader: terms.retreader,
            fee,
            asset: terms.asset,
            salt: terms.salt,
            approved,
        }];
        let signed = signature.is_some();
        if let Some(signature) = signature {
            events.push(LedgerEvent::SignedCreateEscrow { escrow_id: id, signature });
        }
        let sealed = self.journal.seal(events)?;

        self.state.records.insert(
            id,
            EscrowRecord {
                agent: *agent,
                depositant: terms.depositant,
                retreader: terms.retreader,
                fee,
                asset: terms.asset,
                balance: Amount::ZERO,
                approved,
                canceled: false,
            },
        );
        self.state.escrow_count = count;
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, agent = %agent, fee = %fee, signed, "escrow created");
        Ok(id)
    }

    // ── Signature cancellation ───────────────────────────────────────

    /// Permanently invalidate `(caller, signature)` for signed creation.
    pub fn cancel_signature(
        &mut self,
        caller: &Principal,
        signature: &SignatureBytes,
    ) -> Result<(), LedgerError> {
        let sealed = self
            .journal
            .seal(vec![LedgerEvent::CancelSignature {
                signer: *caller,
                signature: signature.clone(),
            }])
            .map_err(|e| rejected("cancel_signature", caller, e.into()))?;
        self.state
            .canceled_signatures
            .insert((*caller, signature.clone()));
        self.journal.commit(sealed);
        tracing::debug!(signer = %caller, "signature canceled");
        Ok(())
    }

    /// Permanently invalidate the id the caller would get as agent of
    /// `terms`, whatever signature is later presented for it.
    pub fn cancel_signature_for_terms(
        &mut self,
        caller: &Principal,
        terms: &EscrowTerms,
    ) -> Result<EscrowId, LedgerError> {
        self.try_cancel_terms(caller, terms)
            .map_err(|e| rejected("cancel_signature_for_terms", caller, e))
    }

    fn try_cancel_terms(
        &mut self,
        caller: &Principal,
        terms: &EscrowTerms,
    ) -> Result<EscrowId, LedgerError> {
        let fee = self.bounded_agent_fee(terms.fee)?;
        let id = self.calculate_id(
            caller,
            &terms.depositant,
            &terms.retreader,
            fee,
            &terms.asset,
            &terms.salt,
        );
        if self.state.records.contains_key(&id) {
            return Err(LedgerError::EscrowAlreadyExists);
        }
        let sealed = self
            .journal
            .seal(vec![LedgerEvent::CancelSignatureId { escrow_id: id }])?;
        self.state.canceled_ids.insert(id);
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, signer = %caller, "escrow id canceled");
        Ok(id)
    }

    // ── Approval ─────────────────────────────────────────────────────

    pub fn approve_escrow(&mut self, caller: &Principal, id: &EscrowId) -> Result<(), LedgerError> {
        self.try_set_approval(caller, id, true)
            .map_err(|e| rejected("approve_escrow", caller, e))
    }

    pub fn remove_approve_escrow(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
    ) -> Result<(), LedgerError> {
        self.try_set_approval(caller, id, false)
            .map_err(|e| rejected("remove_approve_escrow", caller, e))
    }

    /// The record, unless it is unknown or spent by a retaining cancel.
    fn live(&self, id: &EscrowId) -> Option<&EscrowRecord> {
        self.escrow(id).filter(|r| !r.canceled)
    }

    fn agent_record(
        &self,
        caller: &Principal,
        id: &EscrowId,
    ) -> Result<EscrowRecord, LedgerError> {
        self.live(id)
            .filter(|r| !caller.is_zero() && r.agent == *caller)
            .cloned()
            .ok_or(LedgerError::NotAgent)
    }

    fn try_set_approval(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        approved: bool,
    ) -> Result<(), LedgerError> {
        if !self.config.approval_required() {
            return Err(LedgerError::ApprovalDisabled);
        }
        let record = self.agent_record(caller, id)?;
        if !approved && !record.balance.is_zero() {
            return Err(LedgerError::NonZeroBalance);
        }
        let event = if approved {
            LedgerEvent::ApproveEscrow { escrow_id: *id }
        } else {
            LedgerEvent::RemoveApproveEscrow { escrow_id: *id }
        };
        let sealed = self.journal.seal(vec![event])?;
        if let Some(r) = self.state.records.get_mut(id) {
            r.approved = approved;
        }
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, approved, "escrow approval changed");
        Ok(())
    }

    // ── Funding ──────────────────────────────────────────────────────

    /// Pull `amount` from the depositant into custody, minus the operator fee.
    pub fn deposit(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        amount: Amount,
    ) -> Result<DepositSplit, LedgerError> {
        self.try_deposit(caller, id, amount)
            .map_err(|e| rejected("deposit", caller, e))
    }

    fn try_deposit(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        amount: Amount,
    ) -> Result<DepositSplit, LedgerError> {
        let record = self
            .live(id)
            .filter(|r| !caller.is_zero() && r.depositant == *caller)
            .cloned()
            .ok_or(LedgerError::WrongSender)?;
        if self.config.approval_required() && !record.approved {
            return Err(LedgerError::NotApproved);
        }

        let split = self
            .state
            .operator_fee
            .split(amount)
            .map_err(|_| LedgerError::ArithmeticOverflow)?;
        let deposit = DepositSplit {
            to_escrow: split.net,
            to_operator: split.fee,
        };
        let balance = record
            .balance
            .checked_add(deposit.to_escrow)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let platform = self
            .platform_balance(&record.asset)
            .checked_add(deposit.to_operator)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let sealed = self.journal.seal(vec![LedgerEvent::Deposit {
            escrow_id: *id,
            to_escrow: deposit.to_escrow,
            to_operator: deposit.to_operator,
        }])?;

        self.bank
            .pull(&record.asset, caller, &self.config.instance, amount)?;

        if let Some(r) = self.state.records.get_mut(id) {
            r.balance = balance;
        }
        self.state.platform_balances.insert(record.asset, platform);
        self.journal.commit(sealed);
        tracing::debug!(
            escrow_id = %id,
            to_escrow = %deposit.to_escrow,
            to_operator = %deposit.to_operator,
            "deposit"
        );
        Ok(deposit)
    }

    // ── Release ──────────────────────────────────────────────────────

    /// Release `amount` to the retreader. Allowed for the agent and the
    /// depositant.
    pub fn withdraw_to_retreader(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        amount: Amount,
    ) -> Result<WithdrawSplit, LedgerError> {
        self.try_withdraw(caller, id, amount, Release::ToRetreader)
            .map_err(|e| rejected(Release::ToRetreader.operation(), caller, e))
    }

    /// Release `amount` back to the depositant. Allowed for the agent and
    /// the retreader.
    pub fn withdraw_to_depositant(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        amount: Amount,
    ) -> Result<WithdrawSplit, LedgerError> {
        self.try_withdraw(caller, id, amount, Release::ToDepositant)
            .map_err(|e| rejected(Release::ToDepositant.operation(), caller, e))
    }

    fn try_withdraw(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        amount: Amount,
        release: Release,
    ) -> Result<WithdrawSplit, LedgerError> {
        let record = self
            .live(id)
            .filter(|r| release.authorizes(caller, &r.agent, &r.depositant, &r.retreader))
            .cloned()
            .ok_or(LedgerError::Unauthorized)?;
        let balance = record
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                requested: amount,
                available: record.balance,
            })?;

        let split = record
            .fee
            .split(amount)
            .map_err(|_| LedgerError::ArithmeticOverflow)?;
        let payout = WithdrawSplit {
            to_beneficiary: split.net,
            to_agent: split.fee,
        };
        let (beneficiary, _) = release.parties((&record.depositant, &record.retreader));
        let sealed = self.journal.seal(vec![LedgerEvent::Withdraw {
            escrow_id: *id,
            sender: *caller,
            to: beneficiary,
            to_amount: payout.to_beneficiary,
            to_agent: payout.to_agent,
        }])?;

        self.bank.push_many(
            &record.asset,
            &self.config.instance,
            &[(beneficiary, payout.to_beneficiary), (record.agent, payout.to_agent)],
        )?;

        if let Some(r) = self.state.records.get_mut(id) {
            r.balance = balance;
        }
        self.journal.commit(sealed);
        tracing::debug!(
            escrow_id = %id,
            to = %beneficiary,
            to_amount = %payout.to_beneficiary,
            to_agent = %payout.to_agent,
            "withdraw"
        );
        Ok(payout)
    }

    /// Return the whole balance to the depositant and tear the escrow down
    /// according to the configured [`CancelPolicy`]. Agent only.
    pub fn cancel(&mut self, caller: &Principal, id: &EscrowId) -> Result<Amount, LedgerError> {
        self.try_cancel(caller, id)
            .map_err(|e| rejected("cancel", caller, e))
    }

    fn try_cancel(&mut self, caller: &Principal, id: &EscrowId) -> Result<Amount, LedgerError> {
        let record = self.agent_record(caller, id)?;
        let amount = record.balance;
        let retained = self.config.cancel_policy == CancelPolicy::RetainParties;
        let sealed = self.journal.seal(vec![LedgerEvent::Cancel {
            escrow_id: *id,
            amount,
            retained,
        }])?;

        self.bank
            .push(&record.asset, &self.config.instance, &record.depositant, amount)?;

        if retained {
            if let Some(r) = self.state.records.get_mut(id) {
                r.balance = Amount::ZERO;
                r.approved = false;
                r.canceled = true;
            }
        } else {
            self.state.records.remove(id);
        }
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, amount = %amount, retained, "escrow canceled");
        Ok(amount)
    }

    // ── Operator administration ──────────────────────────────────────

    fn require_owner(&self, caller: &Principal) -> Result<(), LedgerError> {
        if caller.is_zero() || *caller != self.state.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    /// Change the operator fee. `rate` is validated before narrowing.
    pub fn set_operator_fee(&mut self, caller: &Principal, rate: u64) -> Result<(), LedgerError> {
        self.try_set_operator_fee(caller, rate)
            .map_err(|e| rejected("set_operator_fee", caller, e))
    }

    fn try_set_operator_fee(&mut self, caller: &Principal, rate: u64) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        let max = self.config.max_operator_fee;
        let fee = FeeRate::bounded(rate, max)
            .map_err(|_| LedgerError::FeeTooHigh { fee: rate, max })?;
        let sealed = self.journal.seal(vec![LedgerEvent::SetOperatorFee { fee }])?;
        self.state.operator_fee = fee;
        self.journal.commit(sealed);
        tracing::debug!(fee = %fee, "operator fee set");
        Ok(())
    }

    /// Pay accrued operator fees out of custody.
    pub fn operator_withdraw(
        &mut self,
        caller: &Principal,
        asset: &Asset,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.try_operator_withdraw(caller, asset, to, amount)
            .map_err(|e| rejected("operator_withdraw", caller, e))
    }

    fn try_operator_withdraw(
        &mut self,
        caller: &Principal,
        asset: &Asset,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if to.is_zero() {
            return Err(LedgerError::InvalidDestination);
        }
        let available = self.platform_balance(asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            })?;
        let sealed = self.journal.seal(vec![LedgerEvent::OperatorWithdraw {
            asset: *asset,
            to: *to,
            amount,
        }])?;

        self.bank.push(asset, &self.config.instance, to, amount)?;

        self.state.platform_balances.insert(*asset, remaining);
        self.journal.commit(sealed);
        tracing::debug!(asset = %asset, to = %to, amount = %amount, "operator withdraw");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Principal,
        new_owner: &Principal,
    ) -> Result<(), LedgerError> {
        self.try_transfer_ownership(caller, new_owner)
            .map_err(|e| rejected("transfer_ownership", caller, e))
    }

    fn try_transfer_ownership(
        &mut self,
        caller: &Principal,
        new_owner: &Principal,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(LedgerError::InvalidDestination);
        }
        let previous = self.state.owner;
        let sealed = self.journal.seal(vec![LedgerEvent::OwnershipTransferred {
            previous,
            new: *new_owner,
        }])?;
        self.state.owner = *new_owner;
        self.journal.commit(sealed);
        tracing::debug!(previous = %previous, new = %new_owner, "ownership transferred");
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::transfer::InMemoryTokenBank;
    use escrow_crypto::FixedSignerVerifier;
    use proptest::prelude::*;

    fn p(n: u64) -> Principal {
        Principal::from_u64(n)
    }

    fn ledger(
        operator_fee: u16,
        minted: u128,
    ) -> EscrowLedger<InMemoryTokenBank, FixedSignerVerifier> {
        let mut bank = InMemoryTokenBank::new();
        bank.mint(&Asset::from_u64(1), &p(2), Amount::new(minted)).unwrap();
        let config =
            LedgerConfig::approval_gated(p(0xe5c0), p(0x0a)).with_operator_fee(operator_fee);
        EscrowLedger::new(config, bank, FixedSignerVerifier::default()).unwrap()
    }

    fn terms(fee: u64) -> EscrowTerms {
        EscrowTerms {
            depositant: p(2),
            retreader: p(3),
            fee,
            asset: Asset::from_u64(1),
            salt: Salt::from_u64(1),
        }
    }

    proptest! {
        #[test]
        fn deposit_split_is_exact(rate in 0u16..=5000, amount in 0u128..=u128::MAX / 2) {
            let mut ledger = ledger(rate, amount);
            let id = ledger.create_escrow(&p(1), &terms(0)).unwrap();
            let split = ledger.deposit(&p(2), &id, Amount::new(amount)).unwrap();
            prop_assert_eq!(split.to_escrow.get() + split.to_operator.get(), amount);
            let expected = amount / 10_000 * u128::from(rate)
                + amount % 10_000 * u128::from(rate) / 10_000;
            prop_assert_eq!(split.to_operator.get(), expected);
        }

        #[test]
        fn withdraw_conserves_balance(
            fee in 0u64..=1000,
            deposit in 1u128..=1u128 << 100,
            frac in 0u128..=100,
        ) {
            let mut ledger = ledger(0, deposit);
            let id = ledger.create_escrow(&p(1), &terms(fee)).unwrap();
            ledger.deposit(&p(2), &id, Amount::new(deposit)).unwrap();
            let amount = deposit / 100 * frac;
            let split = ledger.withdraw_to_retreader(&p(1), &id, Amount::new(amount)).unwrap();
            prop_assert_eq!(split.to_agent.get() + split.to_beneficiary.get(), amount);
            prop_assert_eq!(ledger.escrow(&id).unwrap().balance.get(), deposit - amount);
            let custody = ledger.bank().balance_of(&Asset::from_u64(1), &p(0xe5c0));
            prop_assert_eq!(custody.get(), deposit - amount);
        }

        #[test]
        fn any_fee_above_max_is_rejected(fee in 1001u64..) {
            let mut ledger = ledger(0, 0);
            prop_assert_eq!(
                ledger.create_escrow(&p(1), &terms(fee)),
                Err(LedgerError::FeeTooHigh { fee, max: 1000 })
            );
            prop_assert!(ledger.snapshot().records.is_empty());
        }
    }
}
