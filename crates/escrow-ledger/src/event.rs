//! # Ledger Events
//!
//! One variant per observable state change. Events carry every value
//! needed to rebuild ledger state, so [`crate::LedgerSnapshot::replay`]
//! works from the journal alone.

use escrow_core::{Amount, Asset, EscrowId, FeeRate, Principal, Salt, TokenId};
use escrow_crypto::SignatureBytes;
use serde::{Deserialize, Serialize};

/// Events of the fungible [`crate::EscrowLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    CreateEscrow {
        escrow_id: EscrowId,
        agent: Principal,
        depositant: Principal,
        retreader: Principal,
        fee: FeeRate,
        asset: Asset,
        salt: Salt,
        /// Approval state at creation.
        approved: bool,
    },
    /// Follows the `CreateEscrow` of a relayed creation.
    SignedCreateEscrow {
        escrow_id: EscrowId,
        signature: SignatureBytes,
    },
    CancelSignature {
        signer: Principal,
        signature: SignatureBytes,
    },
    CancelSignatureId {
        escrow_id: EscrowId,
    },
    ApproveEscrow {
        escrow_id: EscrowId,
    },
    RemoveApproveEscrow {
        escrow_id: EscrowId,
    },
    Deposit {
        escrow_id: EscrowId,
        to_escrow: Amount,
        to_operator: Amount,
    },
    Withdraw {
        escrow_id: EscrowId,
        sender: Principal,
        to: Principal,
        to_amount: Amount,
        to_agent: Amount,
    },
    Cancel {
        escrow_id: EscrowId,
        amount: Amount,
        /// `true` when the record was kept (retain-parties policy).
        retained: bool,
    },
    SetOperatorFee {
        fee: FeeRate,
    },
    OperatorWithdraw {
        asset: Asset,
        to: Principal,
        amount: Amount,
    },
    OwnershipTransferred {
        previous: Principal,
        new: Principal,
    },
}

impl LedgerEvent {
    /// The escrow this event concerns, if any.
    pub fn escrow_id(&self) -> Option<&EscrowId> {
        match self {
            Self::CreateEscrow { escrow_id, .. }
            | Self::SignedCreateEscrow { escrow_id, .. }
            | Self::CancelSignatureId { escrow_id }
            | Self::ApproveEscrow { escrow_id }
            | Self::RemoveApproveEscrow { escrow_id }
            | Self::Deposit { escrow_id, .. }
            | Self::Withdraw { escrow_id, .. }
            | Self::Cancel { escrow_id, .. } => Some(escrow_id),
            Self::CancelSignature { .. }
            | Self::SetOperatorFee { .. }
            | Self::OperatorWithdraw { .. }
            | Self::OwnershipTransferred { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEscrow { .. } => "CreateEscrow",
            Self::SignedCreateEscrow { .. } => "SignedCreateEscrow",
            Self::CancelSignature { .. } => "CancelSignature",
            Self::CancelSignatureId { .. } => "CancelSignatureId",
            Self::ApproveEscrow { .. } => "ApproveEscrow",
            Self::RemoveApproveEscrow { .. } => "RemoveApproveEscrow",
            Self::Deposit { .. } => "Deposit",
            Self::Withdraw { .. } => "Withdraw",
            Self::Cancel { .. } => "Cancel",
            Self::SetOperatorFee { .. } => "SetOperatorFee",
            Self::OperatorWithdraw { .. } => "OperatorWithdraw",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

/// Events of the [`crate::UniqueEscrowLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum UniqueLedgerEvent {
    CreateEscrow {
        escrow_id: EscrowId,
        agent: Principal,
        depositant: Principal,
        retreader: Principal,
        asset: Asset,
        token_id: TokenId,
        salt: Salt,
    },
    SignedCreateEscrow {
        escrow_id: EscrowId,
        signature: SignatureBytes,
    },
    CancelSignature {
        signer: Principal,
        signature: SignatureBytes,
    },
    CancelSignatureId {
        escrow_id: EscrowId,
    },
    Deposit {
        escrow_id: EscrowId,
    },
    Withdraw {
        escrow_id: EscrowId,
        sender: Principal,
        to: Principal,
    },
    Cancel {
        escrow_id: EscrowId,
    },
}
