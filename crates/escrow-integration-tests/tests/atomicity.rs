//! # Atomic Rollback on Collaborator Failure
//!
//! When the bank rejects a transfer, the ledger must look exactly as it did
//! before the call: same snapshot, same journal head, same bank balances.

use escrow_core::{Amount, Asset, EscrowId, Principal, Salt};
use escrow_crypto::FixedSignerVerifier;
use escrow_ledger::{
    AssetTransferAgent, EscrowLedger, EscrowTerms, InMemoryTokenBank, LedgerConfig, LedgerError,
    TransferError,
};

const INSTANCE: u64 = 0xe5c0;
const OWNER: u64 = 0x0a;
const AGENT: u64 = 0x11;
const DEPOSITANT: u64 = 0x22;
const RETREADER: u64 = 0x33;

fn p(n: u64) -> Principal {
    Principal::from_u64(n)
}

fn usd() -> Asset {
    Asset::from_u64(0xc0)
}

type Ledger = EscrowLedger<InMemoryTokenBank, FixedSignerVerifier>;

fn funded() -> (Ledger, EscrowId) {
    let mut bank = InMemoryTokenBank::new();
    bank.mint(&usd(), &p(DEPOSITANT), Amount::new(10_000)).unwrap();
    let config = LedgerConfig::new(p(INSTANCE), p(OWNER)).with_operator_fee(50);
    let mut ledger = EscrowLedger::new(config, bank, FixedSignerVerifier::default()).unwrap();
    let terms = EscrowTerms {
        depositant: p(DEPOSITANT),
        retreader: p(RETREADER),
        fee: 1_000,
        asset: usd(),
        salt: Salt::from_u64(1),
    };
    let id = ledger.create_escrow(&p(AGENT), &terms).unwrap();
    ledger.deposit(&p(DEPOSITANT), &id, Amount::new(4_000)).unwrap();
    (ledger, id)
}

/// Run `op`, expect a transfer failure, and check nothing moved.
fn assert_untouched(ledger: &mut Ledger, op: impl FnOnce(&mut Ledger) -> Result<(), LedgerError>) {
    let snapshot = ledger.snapshot();
    let head = ledger.journal().head().copied();
    let len = ledger.journal().len();
    let holders = [INSTANCE, OWNER, AGENT, DEPOSITANT, RETREADER];
    let balances: Vec<_> = holders
        .iter()
        .map(|h| ledger.bank().balance_of(&usd(), &p(*h)))
        .collect();

    let result = op(ledger);
    assert!(matches!(result, Err(LedgerError::FailedTransfer(_))), "got {result:?}");

    assert_eq!(ledger.snapshot(), snapshot);
    assert_eq!(ledger.journal().head().copied(), head);
    assert_eq!(ledger.journal().len(), len);
    let after: Vec<_> = holders
        .iter()
        .map(|h| ledger.bank().balance_of(&usd(), &p(*h)))
        .collect();
    assert_eq!(after, balances);
}

#[test]
fn deposit_from_frozen_depositant() {
    let (mut ledger, id) = funded();
    ledger.bank_mut().freeze(p(DEPOSITANT));
    assert_untouched(&mut ledger, |l| l.deposit(&p(DEPOSITANT), &id, Amount::new(1)).map(drop));
}

#[test]
fn withdraw_with_frozen_agent_pays_nobody() {
    let (mut ledger, id) = funded();
    ledger.bank_mut().freeze(p(AGENT));
    assert_untouched(&mut ledger, |l| {
        l.withdraw_to_retreader(&p(DEPOSITANT), &id, Amount::new(1_000)).map(drop)
    });
}

#[test]
fn withdraw_with_frozen_beneficiary() {
    let (mut ledger, id) = funded();
    ledger.bank_mut().freeze(p(DEPOSITANT));
    assert_untouched(&mut ledger, |l| {
        l.withdraw_to_depositant(&p(AGENT), &id, Amount::new(10)).map(drop)
    });
}

#[test]
fn cancel_to_frozen_depositant() {
    let (mut ledger, id) = funded();
    ledger.bank_mut().freeze(p(DEPOSITANT));
    assert_untouched(&mut ledger, |l| l.cancel(&p(AGENT), &id).map(drop));
    ledger.bank_mut().unfreeze(&p(DEPOSITANT));
    assert_eq!(ledger.cancel(&p(AGENT), &id), Ok(Amount::new(3_980)));
}

#[test]
fn operator_withdraw_to_frozen_destination() {
    let (mut ledger, _) = funded();
    ledger.bank_mut().freeze(p(OWNER));
    assert_untouched(&mut ledger, |l| {
        l.operator_withdraw(&p(OWNER), &usd(), &p(OWNER), Amount::new(20))
    });
}

#[test]
fn frozen_custodian_blocks_everything_outbound() {
    let (mut ledger, id) = funded();
    ledger.bank_mut().freeze(p(INSTANCE));
    let err = ledger
        .withdraw_to_retreader(&p(AGENT), &id, Amount::new(1))
        .unwrap_err();
    assert_eq!(err, LedgerError::FailedTransfer(TransferError::Frozen(p(INSTANCE))));
    assert_untouched(&mut ledger, |l| l.cancel(&p(AGENT), &id).map(drop));
}

#[test]
fn custody_matches_ledger_after_recovery() {
    let (mut ledger, id) = funded();
    ledger.bank_mut().freeze(p(RETREADER));
    assert!(ledger.withdraw_to_retreader(&p(AGENT), &id, Amount::new(100)).is_err());
    ledger.bank_mut().unfreeze(&p(RETREADER));
    ledger.withdraw_to_retreader(&p(AGENT), &id, Amount::new(100)).unwrap();

    let custody = ledger.bank().balance_of(&usd(), &p(INSTANCE)).get();
    let owed = ledger.escrow(&id).unwrap().balance.get() + ledger.platform_balance(&usd()).get();
    assert_eq!(custody, owed);
}
