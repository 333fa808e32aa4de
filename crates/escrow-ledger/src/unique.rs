//! # Unique-Asset Escrow Ledger
//!
//! Same lifecycle as [`crate::EscrowLedger`] for a single non-fungible
//! token per escrow. There is no balance and no fee. Each record carries a
//! `deposited` flag, and only a deposit into that record lets it release
//! the token: two records naming the same token never share custody.
//!
//! - `deposit` pulls the token from the depositant and marks the record.
//! - `withdraw_*` hands it to the beneficiary, unmarks the record and
//!   keeps it.
//! - `cancel` returns the token to the depositant if this record holds it,
//!   then clears the record.

use escrow_core::{derive_unique_escrow_id, Asset, EscrowId, Principal, Salt, TokenId};
use escrow_crypto::{SignatureBytes, SignatureVerifier, SigningMessage};

use crate::error::LedgerError;
use crate::event::UniqueLedgerEvent;
use crate::journal::EventJournal;
use crate::ledger::rejected;
use crate::record::{Release, UniqueEscrowRecord, UniqueEscrowTerms};
use crate::snapshot::UniqueLedgerSnapshot;
use crate::transfer::UniqueAssetTransferAgent;

/// Escrow ledger for unique tokens.
#[derive(Debug)]
pub struct UniqueEscrowLedger<R, V> {
    instance: Principal,
    state: UniqueLedgerSnapshot,
    journal: EventJournal<UniqueLedgerEvent>,
    registry: R,
    verifier: V,
}

impl<R: UniqueAssetTransferAgent, V: SignatureVerifier> UniqueEscrowLedger<R, V> {
    pub fn new(instance: Principal, registry: R, verifier: V) -> Self {
        tracing::debug!(instance = %instance, "unique escrow ledger initialised");
        Self {
            instance,
            state: UniqueLedgerSnapshot::default(),
            journal: EventJournal::new(),
            registry,
            verifier,
        }
    }

    /// The ledger's own principal. Deposited tokens are held under it.
    pub fn instance(&self) -> &Principal {
        &self.instance
    }

    pub fn escrow(&self, id: &EscrowId) -> Option<&UniqueEscrowRecord> {
        self.state.records.get(id)
    }

    /// The record, or the all-zero record for unknown ids.
    pub fn escrow_view(&self, id: &EscrowId) -> UniqueEscrowRecord {
        self.escrow(id).cloned().unwrap_or_default()
    }

    /// Whether the escrow holds its token.
    pub fn in_custody(&self, id: &EscrowId) -> bool {
        self.escrow(id).is_some_and(|r| r.deposited)
    }

    pub fn is_signature_canceled(
        &self,
        signer: &Principal,
        signature: &SignatureBytes,
    ) -> bool {
        self.state
            .canceled_signatures
            .contains(&(*signer, signature.clone()))
    }

    pub fn is_id_canceled(&self, id: &EscrowId) -> bool {
        self.state.canceled_ids.contains(id)
    }

    pub fn snapshot(&self) -> UniqueLedgerSnapshot {
        self.state.clone()
    }

    pub fn journal(&self) -> &EventJournal<UniqueLedgerEvent> {
        &self.journal
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn calculate_id(
        &self,
        agent: &Principal,
        depositant: &Principal,
        retreader: &Principal,
        asset: &Asset,
        token_id: &TokenId,
        salt: &Salt,
    ) -> EscrowId {
        derive_unique_escrow_id(&self.instance, agent, depositant, retreader, asset, token_id, salt)
    }

    fn terms_id(&self, agent: &Principal, terms: &UniqueEscrowTerms) -> EscrowId {
        self.calculate_id(
            agent,
            &terms.depositant,
            &terms.retreader,
            &terms.asset,
            &terms.token_id,
            &terms.salt,
        )
    }

    pub fn create_escrow(
        &mut self,
        caller: &Principal,
        terms: &UniqueEscrowTerms,
    ) -> Result<EscrowId, LedgerError> {
        if caller.is_zero() {
            return Err(rejected("create_escrow", caller, LedgerError::MissingAgent));
        }
        let id = self.terms_id(caller, terms);
        self.commit_create(id, caller, terms, None)
            .map_err(|e| rejected("create_escrow", caller, e))
    }

    /// Create on behalf of `agent`, authorized by the agent's signature
    /// over the escrow id.
    pub fn signed_create_escrow(
        &mut self,
        caller: &Principal,
        agent: &Principal,
        terms: &UniqueEscrowTerms,
        signature: &SignatureBytes,
    ) -> Result<EscrowId, LedgerError> {
        self.try_signed_create(agent, terms, signature)
            .map_err(|e| rejected("signed_create_escrow", caller, e))
    }

    fn try_signed_create(
        &mut self,
        agent: &Principal,
        terms: &UniqueEscrowTerms,
        signature: &SignatureBytes,
    ) -> Result<EscrowId, LedgerError> {
        if agent.is_zero() {
            return Err(LedgerError::MissingAgent);
        }
        let id = self.terms_id(agent, terms);
        if self.is_signature_canceled(agent, signature) || self.is_id_canceled(&id) {
            return Err(LedgerError::SignatureCanceled);
        }
        let message = SigningMessage::for_escrow_id(&id);
        if self.verifier.recover_signer(&message, signature) != Some(*agent) {
            return Err(LedgerError::InvalidSignature);
        }
        self.commit_create(id, agent, terms, Some(signature.clone()))
    }

    fn commit_create(
        &mut self,
        id: EscrowId,
        agent: &Principal,
        terms: &UniqueEscrowTerms,
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
        let mut events = vec![UniqueLedgerEvent::CreateEscrow {
            escrow_id: id,
            agent: *agent,
            depositant: terms.depositant,
            retreader: terms.retreader,
            asset: terms.asset,
            token_id: terms.token_id,
            salt: terms.salt,
        }];
        if let Some(signature) = signature {
            events.push(UniqueLedgerEvent::SignedCreateEscrow { escrow_id: id, signature });
        }
        let sealed = self.journal.seal(events)?;
        self.state.records.insert(
            id,
            UniqueEscrowRecord {
                agent: *agent,
                depositant: terms.depositant,
                retreader: terms.retreader,
                asset: terms.asset,
                token_id: terms.token_id,
                deposited: false,
            },
        );
        self.state.escrow_count = count;
        self.journal.commit(sealed);
        tracing::debug!(
            escrow_id = %id,
            agent = %agent,
            token_id = %terms.token_id,
            "unique escrow created"
        );
        Ok(id)
    }

    pub fn cancel_signature(
        &mut self,
        caller: &Principal,
        signature: &SignatureBytes,
    ) -> Result<(), LedgerError> {
        let sealed = self
            .journal
            .seal(vec![UniqueLedgerEvent::CancelSignature {
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

    pub fn cancel_signature_for_terms(
        &mut self,
        caller: &Principal,
        terms: &UniqueEscrowTerms,
    ) -> Result<EscrowId, LedgerError> {
        let id = self.terms_id(caller, terms);
        if self.state.records.contains_key(&id) {
            return Err(rejected(
                "cancel_signature_for_terms",
                caller,
                LedgerError::EscrowAlreadyExists,
            ));
        }
        let sealed = self
            .journal
            .seal(vec![UniqueLedgerEvent::CancelSignatureId { escrow_id: id }])
            .map_err(|e| rejected("cancel_signature_for_terms", caller, e.into()))?;
        self.state.canceled_ids.insert(id);
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, signer = %caller, "escrow id canceled");
        Ok(id)
    }

    /// Pull the token from the depositant into custody.
    pub fn deposit(&mut self, caller: &Principal, id: &EscrowId) -> Result<(), LedgerError> {
        self.try_deposit(caller, id)
            .map_err(|e| rejected("deposit", caller, e))
    }

    fn try_deposit(&mut self, caller: &Principal, id: &EscrowId) -> Result<(), LedgerError> {
        let record = self
            .escrow(id)
            .filter(|r| !caller.is_zero() && r.depositant == *caller)
            .cloned()
            .ok_or(LedgerError::WrongSender)?;
        if record.deposited {
            return Err(LedgerError::AlreadyDeposited);
        }
        let sealed = self
            .journal
            .seal(vec![UniqueLedgerEvent::Deposit { escrow_id: *id }])?;
        self.registry
            .pull_token(&record.asset, &record.token_id, caller, &self.instance)?;
        self.set_deposited(id, true);
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, token_id = %record.token_id, "token deposited");
        Ok(())
    }

    pub fn withdraw_to_retreader(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
    ) -> Result<(), LedgerError> {
        self.try_withdraw(caller, id, Release::ToRetreader)
            .map_err(|e| rejected(Release::ToRetreader.operation(), caller, e))
    }

    pub fn withdraw_to_depositant(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
    ) -> Result<(), LedgerError> {
        self.try_withdraw(caller, id, Release::ToDepositant)
            .map_err(|e| rejected(Release::ToDepositant.operation(), caller, e))
    }

    fn try_withdraw(
        &mut self,
        caller: &Principal,
        id: &EscrowId,
        release: Release,
    ) -> Result<(), LedgerError> {
        let record = self
            .escrow(id)
            .filter(|r| release.authorizes(caller, &r.agent, &r.depositant, &r.retreader))
            .cloned()
            .ok_or(LedgerError::Unauthorized)?;
        if !record.deposited {
            return Err(LedgerError::NotDeposited);
        }
        let (beneficiary, _) = release.parties((&record.depositant, &record.retreader));
        let sealed = self.journal.seal(vec![UniqueLedgerEvent::Withdraw {
            escrow_id: *id,
            sender: *caller,
            to: beneficiary,
        }])?;
        self.registry
            .push_token(&record.asset, &record.token_id, &self.instance, &beneficiary)?;
        self.set_deposited(id, false);
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, to = %beneficiary, "token released");
        Ok(())
    }

    /// Return the token to the depositant if this escrow holds it, then
    /// clear the record. Agent only.
    pub fn cancel(&mut self, caller: &Principal, id: &EscrowId) -> Result<(), LedgerError> {
        self.try_cancel(caller, id)
            .map_err(|e| rejected("cancel", caller, e))
    }

    fn try_cancel(&mut self, caller: &Principal, id: &EscrowId) -> Result<(), LedgerError> {
        let record = self
            .escrow(id)
            .filter(|r| !caller.is_zero() && r.agent == *caller)
            .cloned()
            .ok_or(LedgerError::NotAgent)?;
        let sealed = self
            .journal
            .seal(vec![UniqueLedgerEvent::Cancel { escrow_id: *id }])?;
        if record.deposited {
            self.registry.push_token(
                &record.asset,
                &record.token_id,
                &self.instance,
                &record.depositant,
            )?;
        }
        self.state.records.remove(id);
        self.journal.commit(sealed);
        tracing::debug!(escrow_id = %id, returned = record.deposited, "unique escrow canceled");
        Ok(())
    }

    fn set_deposited(&mut self, id: &EscrowId, deposited: bool) {
        if let Some(record) = self.state.records.get_mut(id) {
            record.deposited = deposited;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::InMemoryTokenRegistry;
    use escrow_crypto::FixedSignerVerifier;

    const INSTANCE: u64 = 0xe5c1;
    const AGENT: u64 = 0x11;
    const DEPOSITANT: u64 = 0x22;
    const RETREADER: u64 = 0x33;
    const STRANGER: u64 = 0x44;

    fn p(n: u64) -> Principal {
        Principal::from_u64(n)
    }

    fn nft() -> Asset {
        Asset::from_u64(0x721)
    }

    fn token() -> TokenId {
        TokenId::from_u64(42)
    }

    fn terms(salt: u64) -> UniqueEscrowTerms {
        UniqueEscrowTerms {
            depositant: p(DEPOSITANT),
            retreader: p(RETREADER),
            asset: nft(),
            token_id: token(),
            salt: Salt::from_u64(salt),
        }
    }

    type TestLedger = UniqueEscrowLedger<InMemoryTokenRegistry, FixedSignerVerifier>;

    fn ledger() -> TestLedger {
        let mut registry = InMemoryTokenRegistry::new();
        registry.mint(&nft(), &token(), &p(DEPOSITANT)).unwrap();
        UniqueEscrowLedger::new(p(INSTANCE), registry, FixedSignerVerifier::new(p(AGENT)))
    }

    fn deposited(ledger: &mut TestLedger) -> EscrowId {
        let id = ledger.create_escrow(&p(AGENT), &terms(1)).unwrap();
        ledger.deposit(&p(DEPOSITANT), &id).unwrap();
        id
    }

    #[test]
    fn create_uses_unique_id_layout() {
        let mut ledger = ledger();
        let id = ledger.create_escrow(&p(AGENT), &terms(1)).unwrap();
        assert_eq!(
            id,
            derive_unique_escrow_id(
                &p(INSTANCE),
                &p(AGENT),
                &p(DEPOSITANT),
                &p(RETREADER),
                &nft(),
                &token(),
                &Salt::from_u64(1),
            )
        );
        assert_eq!(ledger.escrow(&id).unwrap().token_id, token());
        assert_eq!(
            ledger.create_escrow(&p(AGENT), &terms(1)),
            Err(LedgerError::EscrowAlreadyExists)
        );
        assert_eq!(
            ledger.create_escrow(&Principal::ZERO, &terms(2)),
            Err(LedgerError::MissingAgent)
        );
    }

    #[test]
    fn deposit_moves_token_into_custody() {
        let mut ledger = ledger();
        let id = ledger.create_escrow(&p(AGENT), &terms(1)).unwrap();
        assert!(!ledger.in_custody(&id));
        assert_eq!(ledger.deposit(&p(STRANGER), &id), Err(LedgerError::WrongSender));
        ledger.deposit(&p(DEPOSITANT), &id).unwrap();
        assert!(ledger.in_custody(&id));
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(INSTANCE)));
    }

    #[test]
    fn withdraw_releases_and_keeps_record() {
        let mut ledger = ledger();
        let id = deposited(&mut ledger);
        assert_eq!(
            ledger.withdraw_to_retreader(&p(RETREADER), &id),
            Err(LedgerError::Unauthorized)
        );
        ledger.withdraw_to_retreader(&p(DEPOSITANT), &id).unwrap();
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(RETREADER)));
        assert!(ledger.escrow(&id).is_some());

        assert!(!ledger.in_custody(&id));
        assert_eq!(ledger.withdraw_to_retreader(&p(AGENT), &id), Err(LedgerError::NotDeposited));
    }

    #[test]
    fn withdraw_to_depositant_by_retreader() {
        let mut ledger = ledger();
        let id = deposited(&mut ledger);
        assert_eq!(
            ledger.withdraw_to_depositant(&p(DEPOSITANT), &id),
            Err(LedgerError::Unauthorized)
        );
        ledger.withdraw_to_depositant(&p(RETREADER), &id).unwrap();
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(DEPOSITANT)));
    }

    #[test]
    fn cancel_returns_token_and_clears() {
        let mut ledger = ledger();
        let id = deposited(&mut ledger);
        assert_eq!(ledger.cancel(&p(DEPOSITANT), &id), Err(LedgerError::NotAgent));
        ledger.cancel(&p(AGENT), &id).unwrap();
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(DEPOSITANT)));
        assert_eq!(ledger.escrow_view(&id), UniqueEscrowRecord::default());
        assert_eq!(ledger.cancel(&p(AGENT), &id), Err(LedgerError::NotAgent));
    }

    #[test]
    fn cancel_without_deposit_clears_and_moves_nothing() {
        let mut ledger = ledger();
        let id = ledger.create_escrow(&p(AGENT), &terms(1)).unwrap();
        ledger.cancel(&p(AGENT), &id).unwrap();
        assert!(ledger.escrow(&id).is_none());
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(DEPOSITANT)));
    }

    #[test]
    fn second_deposit_is_rejected() {
        let mut ledger = ledger();
        let id = deposited(&mut ledger);
        let len = ledger.journal().len();
        assert_eq!(ledger.deposit(&p(DEPOSITANT), &id), Err(LedgerError::AlreadyDeposited));
        assert_eq!(ledger.journal().len(), len);
    }

    #[test]
    fn sibling_escrow_cannot_release_custodied_token() {
        let mut ledger = ledger();
        let honest = deposited(&mut ledger);

        // same token, but an agent of its own choosing
        let thief = p(0x66);
        let sibling = ledger
            .create_escrow(&thief, &UniqueEscrowTerms { retreader: thief, ..terms(2) })
            .unwrap();
        assert!(!ledger.in_custody(&sibling));

        let before = ledger.snapshot();
        assert_eq!(ledger.withdraw_to_retreader(&thief, &sibling), Err(LedgerError::NotDeposited));
        assert_eq!(ledger.withdraw_to_depositant(&thief, &sibling), Err(LedgerError::NotDeposited));
        assert_eq!(ledger.snapshot(), before);

        ledger.cancel(&thief, &sibling).unwrap();
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(INSTANCE)));
        assert!(ledger.in_custody(&honest));

        ledger.withdraw_to_retreader(&p(AGENT), &honest).unwrap();
        assert_eq!(ledger.registry().owner_of(&nft(), &token()), Some(p(RETREADER)));
    }

    #[test]
    fn signed_creation_and_replay_protection() {
        let mut ledger = ledger();
        let sig = SignatureBytes::new(vec![4; 96]);
        assert_eq!(
            ledger.signed_create_escrow(&p(STRANGER), &p(STRANGER), &terms(1), &sig),
            Err(LedgerError::InvalidSignature)
        );
        let id = ledger.signed_create_escrow(&p(STRANGER), &p(AGENT), &terms(1), &sig).unwrap();
        assert_eq!(ledger.escrow(&id).unwrap().agent, p(AGENT));

        ledger.cancel_signature(&p(AGENT), &sig).unwrap();
        assert_eq!(
            ledger.signed_create_escrow(&p(STRANGER), &p(AGENT), &terms(2), &sig),
            Err(LedgerError::SignatureCanceled)
        );
        let blocked = ledger.cancel_signature_for_terms(&p(AGENT), &terms(3)).unwrap();
        assert!(ledger.is_id_canceled(&blocked));
        assert_eq!(
            ledger.cancel_signature_for_terms(&p(AGENT), &terms(1)),
            Err(LedgerError::EscrowAlreadyExists)
        );
    }

    #[test]
    fn journal_replays_to_live_snapshot() {
        let mut ledger = ledger();
        let id = deposited(&mut ledger);
        ledger.cancel_signature(&p(AGENT), &SignatureBytes::new(vec![1])).unwrap();
        ledger.cancel(&p(AGENT), &id).unwrap();
        ledger.journal().verify_chain().unwrap();
        let replayed = UniqueLedgerSnapshot::replay(ledger.journal().events()).unwrap();
        assert_eq!(replayed, ledger.snapshot());
    }
}
