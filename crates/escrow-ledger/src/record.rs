//! # Escrow Records and Terms
//!
//! Terms are what a caller proposes; records are what the ledger stores.
//! The fee in [`EscrowTerms`] is the caller's raw `u64` so that an
//! out-of-range value is rejected rather than truncated.

use escrow_core::{Amount, Asset, FeeRate, Principal, Salt, TokenId};
use serde::{Deserialize, Serialize};

/// Proposed terms of a fungible escrow. The agent is the caller (or the
/// signer, for signed creation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    pub depositant: Principal,
    pub retreader: Principal,
    /// Agent fee in basis points, unvalidated.
    pub fee: u64,
    pub asset: Asset,
    pub salt: Salt,
}

/// Proposed terms of a unique-asset escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueEscrowTerms {
    pub depositant: Principal,
    pub retreader: Principal,
    pub asset: Asset,
    pub token_id: TokenId,
    pub salt: Salt,
}

/// A live fungible escrow.
///
/// `EscrowRecord::default()` is the all-zero record returned for unknown
/// ids; every principal check against it fails.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub agent: Principal,
    pub depositant: Principal,
    pub retreader: Principal,
    /// Agent's cut of every withdrawal.
    pub fee: FeeRate,
    pub asset: Asset,
    /// Custodied amount, net of operator fees.
    pub balance: Amount,
    /// Deposit gate; meaningful only when approval is required.
    pub approved: bool,
    /// Spent by a retaining cancel. Operations treat the record as absent,
    /// but its id stays taken.
    pub canceled: bool,
}

/// A live unique-asset escrow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UniqueEscrowRecord {
    pub agent: Principal,
    pub depositant: Principal,
    pub retreader: Principal,
    pub asset: Asset,
    pub token_id: TokenId,
    /// Set by a deposit into this escrow, cleared when the token leaves it.
    /// Several records may name the same token; only this flag says which
    /// one the custodied token belongs to.
    pub deposited: bool,
}

/// Lifecycle position of a fungible escrow id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscrowState {
    /// Never created, or cleared or spent by cancel.
    Uninitialized,
    /// Created with a zero balance.
    Created { approved: bool },
    /// Holding a non-zero balance.
    Funded,
}

impl EscrowState {
    pub fn of(record: Option<&EscrowRecord>) -> Self {
        match record {
            None => Self::Uninitialized,
            Some(r) if r.canceled => Self::Uninitialized,
            Some(r) if r.balance.is_zero() => Self::Created { approved: r.approved },
            Some(_) => Self::Funded,
        }
    }
}

/// How a deposit was divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSplit {
    /// Credited to the escrow balance.
    pub to_escrow: Amount,
    /// Accrued to the operator.
    pub to_operator: Amount,
}

/// How a withdrawal was divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawSplit {
    /// Paid to the retreader or depositant.
    pub to_beneficiary: Amount,
    /// Paid to the agent.
    pub to_agent: Amount,
}

/// Release direction of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    ToRetreader,
    ToDepositant,
}

impl Release {
    pub(crate) fn operation(self) -> &'static str {
        match self {
            Self::ToRetreader => "withdraw_to_retreader",
            Self::ToDepositant => "withdraw_to_depositant",
        }
    }

    /// `(beneficiary, counter-principal allowed to release)`.
    pub(crate) fn parties(self, agent_side: (&Principal, &Principal)) -> (Principal, Principal) {
        let (depositant, retreader) = agent_side;
        match self {
            Self::ToRetreader => (*retreader, *depositant),
            Self::ToDepositant => (*depositant, *retreader),
        }
    }

    /// Agent or counter-principal, never the zero principal.
    pub(crate) fn authorizes(
        self,
        caller: &Principal,
        agent: &Principal,
        depositant: &Principal,
        retreader: &Principal,
    ) -> bool {
        if caller.is_zero() {
            return false;
        }
        let (_, counter) = self.parties((depositant, retreader));
        caller == agent || *caller == counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u64) -> Principal {
        Principal::from_u64(n)
    }

    #[test]
    fn state_tracks_balance_and_approval() {
        assert_eq!(EscrowState::of(None), EscrowState::Uninitialized);
        let mut record = EscrowRecord {
            agent: p(1),
            ..EscrowRecord::default()
        };
        assert_eq!(EscrowState::of(Some(&record)), EscrowState::Created { approved: false });
        record.balance = Amount::new(5);
        assert_eq!(EscrowState::of(Some(&record)), EscrowState::Funded);
        record.canceled = true;
        assert_eq!(EscrowState::of(Some(&record)), EscrowState::Uninitialized);
    }

    #[test]
    fn release_parties() {
        let (d, r) = (p(2), p(3));
        assert_eq!(Release::ToRetreader.parties((&d, &r)), (r, d));
        assert_eq!(Release::ToDepositant.parties((&d, &r)), (d, r));
    }

    #[test]
    fn release_authorization() {
        let (a, d, r, x) = (p(1), p(2), p(3), p(4));
        assert!(Release::ToRetreader.authorizes(&a, &a, &d, &r));
        assert!(Release::ToRetreader.authorizes(&d, &a, &d, &r));
        assert!(!Release::ToRetreader.authorizes(&r, &a, &d, &r));
        assert!(Release::ToDepositant.authorizes(&r, &a, &d, &r));
        assert!(!Release::ToDepositant.authorizes(&d, &a, &d, &r));
        assert!(!Release::ToDepositant.authorizes(&x, &a, &d, &r));
    }

    #[test]
    fn zero_record_authorizes_nobody() {
        let z = EscrowRecord::default();
        let nobody = Principal::ZERO;
        assert!(!Release::ToRetreader.authorizes(&nobody, &z.agent, &z.depositant, &z.retreader));
    }

    #[test]
    fn state_serializes_tagged() {
        let json = serde_json::to_string(&EscrowState::Created { approved: true }).unwrap();
        assert_eq!(json, r#"{"state":"created","approved":true}"#);
    }
}
