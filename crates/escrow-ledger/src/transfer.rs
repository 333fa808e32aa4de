//! # Custody Collaborators
//!
//! The ledger never moves assets itself. It calls an
//! [`AssetTransferAgent`] (fungible) or [`UniqueAssetTransferAgent`]
//! (unique tokens) and commits its own state only after the call succeeds.
//!
//! ## Security Invariant
//!
//! [`AssetTransferAgent::push_many`] is all-or-nothing. The ledger uses it
//! for the beneficiary/agent payout of a withdrawal; a half-applied payout
//! would leave custody and the escrow balance out of step.
//!
//! The in-memory implementations here back the CLI simulator and the test
//! suites. Both support freezing a holder, which makes every transfer
//! touching that holder fail.

use std::collections::{BTreeMap, BTreeSet};

use escrow_core::{Amount, Asset, Principal, TokenId};

use crate::error::TransferError;

/// Fungible custody operations.
pub trait AssetTransferAgent {
    /// Move `amount` of `asset` from a depositor into custody.
    fn pull(
        &mut self,
        asset: &Asset,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Move `amount` of `asset` out of custody.
    fn push(
        &mut self,
        asset: &Asset,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Pay several recipients in one atomic step.
    fn push_many(
        &mut self,
        asset: &Asset,
        from: &Principal,
        payouts: &[(Principal, Amount)],
    ) -> Result<(), TransferError>;

    fn balance_of(&self, asset: &Asset, holder: &Principal) -> Amount;
}

/// Unique-token custody operations.
pub trait UniqueAssetTransferAgent {
    fn pull_token(
        &mut self,
        asset: &Asset,
        token_id: &TokenId,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError>;

    fn push_token(
        &mut self,
        asset: &Asset,
        token_id: &TokenId,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError>;

    fn owner_of(&self, asset: &Asset, token_id: &TokenId) -> Option<Principal>;
}

// ── InMemoryTokenBank ────────────────────────────────────────────────

/// Fungible balances keyed by `(asset, holder)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenBank {
    balances: BTreeMap<(Asset, Principal), Amount>,
    frozen: BTreeSet<Principal>,
}

impl InMemoryTokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `to`.
    pub fn mint(
        &mut self,
        asset: &Asset,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let current = self.balance_of(asset, to);
        let next = current.checked_add(amount).ok_or(TransferError::Overflow)?;
        self.balances.insert((*asset, *to), next);
        Ok(())
    }

    /// Make every transfer to or from `holder` fail.
    pub fn freeze(&mut self, holder: Principal) {
        self.frozen.insert(holder);
    }

    pub fn unfreeze(&mut self, holder: &Principal) {
        self.frozen.remove(holder);
    }

    /// Sum of all balances of `asset`.
    pub fn total_supply(&self, asset: &Asset) -> Option<Amount> {
        self.balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .try_fold(Amount::ZERO, |acc, (_, v)| acc.checked_add(*v))
    }

    fn check_frozen(&self, who: &Principal) -> Result<(), TransferError> {
        if self.frozen.contains(who) {
            return Err(TransferError::Frozen(*who));
        }
        Ok(())
    }

    /// Compute every resulting balance first, then write them all.
    fn settle(
        &mut self,
        asset: &Asset,
        from: &Principal,
        payouts: &[(Principal, Amount)],
    ) -> Result<(), TransferError> {
        self.check_frozen(from)?;
        for (to, _) in payouts {
            self.check_frozen(to)?;
        }

        let total = payouts
            .iter()
            .try_fold(Amount::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(TransferError::Overflow)?;
        let available = self.balance_of(asset, from);
        let remaining = available
            .checked_sub(total)
            .ok_or(TransferError::InsufficientFunds {
                holder: *from,
                requested: total,
                available,
            })?;

        let mut staged: BTreeMap<Principal, Amount> = BTreeMap::new();
        staged.insert(*from, remaining);
        for (to, amount) in payouts {
            let current = match staged.get(to) {
                Some(v) => *v,
                None => self.balance_of(asset, to),
            };
            let next = current.checked_add(*amount).ok_or(TransferError::Overflow)?;
            staged.insert(*to, next);
        }

        for (holder, amount) in staged {
            self.balances.insert((*asset, holder), amount);
        }
        Ok(())
    }
}

impl AssetTransferAgent for InMemoryTokenBank {
    fn pull(
        &mut self,
        asset: &Asset,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.settle(asset, from, &[(*to, amount)])
    }

    fn push(
        &mut self,
        asset: &Asset,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.settle(asset, from, &[(*to, amount)])
    }

    fn push_many(
        &mut self,
        asset: &Asset,
        from: &Principal,
        payouts: &[(Principal, Amount)],
    ) -> Result<(), TransferError> {
        self.settle(asset, from, payouts)
    }

    fn balance_of(&self, asset: &Asset, holder: &Principal) -> Amount {
        self.balances
            .get(&(*asset, *holder))
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

// ── InMemoryTokenRegistry ────────────────────────────────────────────

/// Unique token ownership keyed by `(asset, token_id)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenRegistry {
    owners: BTreeMap<(Asset, TokenId), Principal>,
    frozen: BTreeSet<Principal>,
}

impl InMemoryTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(
        &mut self,
        asset: &Asset,
        token_id: &TokenId,
        to: &Principal,
    ) -> Result<(), TransferError> {
        if self.owners.contains_key(&(*asset, *token_id)) {
            return Err(TransferError::TokenExists(*token_id));
        }
        self.owners.insert((*asset, *token_id), *to);
        Ok(())
    }

    pub fn freeze(&mut self, holder: Principal) {
        self.frozen.insert(holder);
    }

    pub fn unfreeze(&mut self, holder: &Principal) {
        self.frozen.remove(holder);
    }

    fn relocate(
        &mut self,
        asset: &Asset,
        token_id: &TokenId,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        for who in [from, to] {
            if self.frozen.contains(who) {
                return Err(TransferError::Frozen(*who));
            }
        }
        let owner = self
            .owners
            .get_mut(&(*asset, *token_id))
            .ok_or(TransferError::UnknownToken(*token_id))?;
        if owner != from {
            return Err(TransferError::NotTokenOwner {
                token_id: *token_id,
                holder: *from,
            });
        }
        *owner = *to;
        Ok(())
    }
}

impl UniqueAssetTransferAgent for InMemoryTokenRegistry {
    fn pull_token(
        &mut self,
        asset: &Asset,
        token_id: &TokenId,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        self.relocate(asset, token_id, from, to)
    }

    fn push_token(
        &mut self,
        asset: &Asset,
        token_id: &TokenId,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        self.relocate(asset, token_id, from, to)
    }

    fn owner_of(&self, asset: &Asset, token_id: &TokenId) -> Option<Principal> {
        self.owners.get(&(*asset, *token_id)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u64) -> Principal {
        Principal::from_u64(n)
    }

    fn usd() -> Asset {
        Asset::from_u64(0xc0)
    }

    fn funded_bank() -> InMemoryTokenBank {
        let mut bank = InMemoryTokenBank::new();
        bank.mint(&usd(), &p(1), Amount::new(100)).unwrap();
        bank
    }

    #[test]
    fn pull_moves_balance() {
        let mut bank = funded_bank();
        bank.pull(&usd(), &p(1), &p(9), Amount::new(40)).unwrap();
        assert_eq!(bank.balance_of(&usd(), &p(1)), Amount::new(60));
        assert_eq!(bank.balance_of(&usd(), &p(9)), Amount::new(40));
    }

    #[test]
    fn insufficient_funds_reports_amounts() {
        let mut bank = funded_bank();
        assert_eq!(
            bank.push(&usd(), &p(1), &p(2), Amount::new(101)),
            Err(TransferError::InsufficientFunds {
                holder: p(1),
                requested: Amount::new(101),
                available: Amount::new(100),
            })
        );
    }

    #[test]
    fn push_many_is_all_or_nothing() {
        let mut bank = funded_bank();
        bank.freeze(p(3));
        let payouts = [(p(2), Amount::new(10)), (p(3), Amount::new(5))];
        let result = bank.push_many(&usd(), &p(1), &payouts);
        assert_eq!(result, Err(TransferError::Frozen(p(3))));
        assert_eq!(bank.balance_of(&usd(), &p(1)), Amount::new(100));
        assert_eq!(bank.balance_of(&usd(), &p(2)), Amount::ZERO);

        let payouts = [(p(2), Amount::new(60)), (p(4), Amount::new(60))];
        let over = bank.push_many(&usd(), &p(1), &payouts);
        assert!(matches!(over, Err(TransferError::InsufficientFunds { .. })));
        assert_eq!(bank.balance_of(&usd(), &p(2)), Amount::ZERO);
    }

    #[test]
    fn push_many_to_same_recipient_accumulates() {
        let mut bank = funded_bank();
        bank.push_many(&usd(), &p(1), &[(p(2), Amount::new(10)), (p(2), Amount::new(5))])
            .unwrap();
        assert_eq!(bank.balance_of(&usd(), &p(2)), Amount::new(15));
        assert_eq!(bank.total_supply(&usd()), Some(Amount::new(100)));
    }

    #[test]
    fn self_transfer_preserves_balance() {
        let mut bank = funded_bank();
        bank.push(&usd(), &p(1), &p(1), Amount::new(30)).unwrap();
        assert_eq!(bank.balance_of(&usd(), &p(1)), Amount::new(100));
    }

    #[test]
    fn frozen_receiver_blocks_pull_until_unfrozen() {
        let mut bank = funded_bank();
        bank.freeze(p(9));
        assert!(bank.pull(&usd(), &p(1), &p(9), Amount::new(1)).is_err());
        bank.unfreeze(&p(9));
        bank.pull(&usd(), &p(1), &p(9), Amount::new(1)).unwrap();
    }

    #[test]
    fn mint_overflow_is_rejected() {
        let mut bank = InMemoryTokenBank::new();
        bank.mint(&usd(), &p(1), Amount::MAX).unwrap();
        assert_eq!(bank.mint(&usd(), &p(1), Amount::new(1)), Err(TransferError::Overflow));
    }

    #[test]
    fn registry_moves_owned_tokens_only() {
        let nft = Asset::from_u64(0x721);
        let token = TokenId::from_u64(7);
        let mut reg = InMemoryTokenRegistry::new();
        reg.mint(&nft, &token, &p(1)).unwrap();
        assert_eq!(reg.mint(&nft, &token, &p(2)), Err(TransferError::TokenExists(token)));

        assert_eq!(
            reg.pull_token(&nft, &token, &p(2), &p(9)),
            Err(TransferError::NotTokenOwner { token_id: token, holder: p(2) })
        );
        reg.pull_token(&nft, &token, &p(1), &p(9)).unwrap();
        assert_eq!(reg.owner_of(&nft, &token), Some(p(9)));
        assert_eq!(
            reg.push_token(&nft, &TokenId::from_u64(8), &p(9), &p(1)),
            Err(TransferError::UnknownToken(TokenId::from_u64(8)))
        );
    }

    #[test]
    fn registry_respects_freeze() {
        let nft = Asset::from_u64(0x721);
        let token = TokenId::from_u64(1);
        let mut reg = InMemoryTokenRegistry::new();
        reg.mint(&nft, &token, &p(1)).unwrap();
        reg.freeze(p(1));
        assert_eq!(reg.pull_token(&nft, &token, &p(1), &p(9)), Err(TransferError::Frozen(p(1))));
        assert_eq!(reg.owner_of(&nft, &token), Some(p(1)));
    }
}
