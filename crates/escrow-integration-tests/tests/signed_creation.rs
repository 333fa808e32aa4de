//! # Relayed Creation with Ed25519 Signatures
//!
//! An agent signs an escrow id offline; a relayer submits it. These tests
//! use real key pairs and the Ed25519 verifier, including ids derived by
//! an external observer through the CLI helpers.

use escrow_cli::id::{derive, IdArgs};
use escrow_core::{Amount, Asset, FeeRate, Principal, Salt};
use escrow_crypto::{Ed25519KeyPair, Ed25519Verifier, SignatureBytes, SigningMessage};
use escrow_ledger::{
    EscrowLedger, EscrowTerms, InMemoryTokenBank, LedgerConfig, LedgerError, LedgerEvent,
};

fn p(n: u64) -> Principal {
    Principal::from_u64(n)
}

fn terms(salt: u64) -> EscrowTerms {
    EscrowTerms {
        depositant: p(0x22),
        retreader: p(0x33),
        fee: 250,
        asset: Asset::from_u64(0xc0),
        salt: Salt::from_u64(salt),
    }
}

type Ledger = EscrowLedger<InMemoryTokenBank, Ed25519Verifier>;

fn ledger(config: LedgerConfig) -> Ledger {
    let mut bank = InMemoryTokenBank::new();
    bank.mint(&Asset::from_u64(0xc0), &p(0x22), Amount::new(1_000)).unwrap();
    EscrowLedger::new(config, bank, Ed25519Verifier).unwrap()
}

fn sign(ledger: &Ledger, key: &Ed25519KeyPair, t: &EscrowTerms) -> SignatureBytes {
    let fee = FeeRate::bounded(t.fee, 1_000).unwrap();
    let agent = key.principal();
    let id = ledger.calculate_id(&agent, &t.depositant, &t.retreader, fee, &t.asset, &t.salt);
    key.sign_envelope(&SigningMessage::for_escrow_id(&id))
}

#[test]
fn relayed_creation_matches_externally_derived_id() {
    let key = Ed25519KeyPair::from_seed(&[11u8; 32]);
    let mut ledger = ledger(LedgerConfig::new(p(0xe5c0), p(0x0a)));
    let t = terms(1);

    let external = derive(&IdArgs {
        instance: p(0xe5c0),
        agent: key.principal(),
        depositant: t.depositant,
        retreader: t.retreader,
        asset: t.asset,
        fee: Some(t.fee),
        token_id: None,
        salt: "1".to_string(),
    })
    .unwrap();

    let signature = key.sign_envelope(&SigningMessage::for_escrow_id(&external));
    let id = ledger
        .signed_create_escrow(&p(0x99), &key.principal(), &t, &signature)
        .unwrap();
    assert_eq!(id, external);
    assert_eq!(ledger.escrow(&id).unwrap().agent, key.principal());

    let last: Vec<_> = ledger
        .journal()
        .entries()
        .iter()
        .rev()
        .take(2)
        .map(|e| &e.event)
        .collect();
    assert_eq!(last[0], &LedgerEvent::SignedCreateEscrow { escrow_id: id, signature });
    assert_eq!(last[1].name(), "CreateEscrow");
}

#[test]
fn signature_is_bound_to_instance() {
    let key = Ed25519KeyPair::from_seed(&[12u8; 32]);
    let a = ledger(LedgerConfig::new(p(0xe5c0), p(0x0a)));
    let mut b = ledger(LedgerConfig::new(p(0xe5c1), p(0x0a)));
    let signature = sign(&a, &key, &terms(1));
    assert_eq!(
        b.signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &signature),
        Err(LedgerError::InvalidSignature)
    );
}

#[test]
fn signature_does_not_transfer_to_other_terms() {
    let key = Ed25519KeyPair::from_seed(&[13u8; 32]);
    let mut ledger = ledger(LedgerConfig::new(p(0xe5c0), p(0x0a)));
    let signature = sign(&ledger, &key, &terms(1));
    let mut altered = terms(1);
    altered.fee = 1_000;
    assert_eq!(
        ledger.signed_create_escrow(&p(0x99), &key.principal(), &altered, &signature),
        Err(LedgerError::InvalidSignature)
    );
    let other_agent = Ed25519KeyPair::from_seed(&[14u8; 32]);
    assert_eq!(
        ledger.signed_create_escrow(&p(0x99), &other_agent.principal(), &terms(1), &signature),
        Err(LedgerError::InvalidSignature)
    );
}

#[test]
fn replayed_signature_hits_existing_escrow() {
    let key = Ed25519KeyPair::from_seed(&[15u8; 32]);
    let mut ledger = ledger(LedgerConfig::new(p(0xe5c0), p(0x0a)));
    let signature = sign(&ledger, &key, &terms(1));
    ledger
        .signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &signature)
        .unwrap();
    assert_eq!(
        ledger.signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &signature),
        Err(LedgerError::EscrowAlreadyExists)
    );
}

#[test]
fn canceled_signature_stays_canceled_after_escrow_is_gone() {
    let key = Ed25519KeyPair::from_seed(&[16u8; 32]);
    let mut ledger = ledger(LedgerConfig::new(p(0xe5c0), p(0x0a)));
    let signature = sign(&ledger, &key, &terms(1));
    let id = ledger
        .signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &signature)
        .unwrap();
    ledger.cancel(&key.principal(), &id).unwrap();
    ledger.cancel_signature(&key.principal(), &signature).unwrap();

    // without the cancellation the cleared id could be re-created
    assert_eq!(
        ledger.signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &signature),
        Err(LedgerError::SignatureCanceled)
    );
}

#[test]
fn canceled_signature_is_checked_before_verification() {
    let key = Ed25519KeyPair::from_seed(&[17u8; 32]);
    let mut ledger = ledger(LedgerConfig::new(p(0xe5c0), p(0x0a)));
    let garbage = SignatureBytes::new(vec![0u8; 10]);
    ledger.cancel_signature(&key.principal(), &garbage).unwrap();
    assert_eq!(
        ledger.signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &garbage),
        Err(LedgerError::SignatureCanceled)
    );
    // a different signer's cancellation does not apply
    let other = Ed25519KeyPair::from_seed(&[18u8; 32]);
    assert_eq!(
        ledger.signed_create_escrow(&p(0x99), &other.principal(), &terms(1), &garbage),
        Err(LedgerError::InvalidSignature)
    );
}

#[test]
fn approval_gated_relay_needs_agent_approval() {
    let key = Ed25519KeyPair::from_seed(&[19u8; 32]);
    let mut ledger = ledger(LedgerConfig::approval_gated(p(0xe5c0), p(0x0a)));
    let signature = sign(&ledger, &key, &terms(1));
    let id = ledger
        .signed_create_escrow(&p(0x99), &key.principal(), &terms(1), &signature)
        .unwrap();
    assert_eq!(ledger.deposit(&p(0x22), &id, Amount::new(1)), Err(LedgerError::NotApproved));
    ledger.approve_escrow(&key.principal(), &id).unwrap();
    ledger.deposit(&p(0x22), &id, Amount::new(1)).unwrap();

    // the agent relaying its own signature is approved immediately
    let own = sign(&ledger, &key, &terms(2));
    let id2 = ledger
        .signed_create_escrow(&key.principal(), &key.principal(), &terms(2), &own)
        .unwrap();
    assert!(ledger.escrow(&id2).unwrap().approved);
}
