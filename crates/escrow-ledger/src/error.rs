//! # Ledger Error Types
//!
//! [`LedgerError`] is what every ledger operation returns on rejection.
//! Errors are terminal for the call and leave ledger state unchanged.
//!
//! Authorization variants (`NotAgent`, `WrongSender`, `Unauthorized`)
//! intentionally carry no escrow id: an unknown id and a wrong caller
//! produce the same error.

use escrow_core::{Amount, Principal, TokenId};
use thiserror::Error;

/// Errors raised by the custody collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The sender does not hold enough of the asset.
    #[error("holder {holder} has {available}, needs {requested}")]
    InsufficientFunds {
        /// The debited holder.
        holder: Principal,
        /// Amount the transfer needed.
        requested: Amount,
        /// Amount the holder had.
        available: Amount,
    },

    /// A participant in the transfer is frozen.
    #[error("holder {0} is frozen")]
    Frozen(Principal),

    /// The sender does not own the unique token.
    #[error("token {token_id} is not owned by {holder}")]
    NotTokenOwner {
        /// The token being moved.
        token_id: TokenId,
        /// The principal that tried to move it.
        holder: Principal,
    },

    /// The unique token has never been minted.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    /// The unique token has already been minted.
    #[error("token {0} already exists")]
    TokenExists(TokenId),

    /// A credit would overflow the receiver's balance.
    #[error("balance overflow")]
    Overflow,
}

/// Errors returned by escrow ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller is not the escrow's agent, or the escrow does not exist.
    #[error("caller is not the agent of this escrow")]
    NotAgent,

    /// The caller is not the escrow's depositant, or the escrow does not exist.
    #[error("caller is not the depositant of this escrow")]
    WrongSender,

    /// The caller is neither the agent nor the counter-party allowed to
    /// release in this direction, or the escrow does not exist.
    #[error("caller is not authorized to withdraw from this escrow")]
    Unauthorized,

    /// The caller is not the ledger owner.
    #[error("caller is not the ledger owner")]
    NotOwner,

    /// The agent principal is zero.
    #[error("agent must not be the zero principal")]
    MissingAgent,

    /// A live record already exists under the derived id.
    #[error("an escrow with this id already exists")]
    EscrowAlreadyExists,

    /// A fee rate exceeds its maximum.
    #[error("fee {fee} exceeds maximum {max}")]
    FeeTooHigh {
        /// The rejected raw fee.
        fee: u64,
        /// The inclusive maximum.
        max: u16,
    },

    /// Deposits require agent approval and the escrow is not approved.
    #[error("escrow is not approved for deposits")]
    NotApproved,

    /// Approval cannot be withdrawn while the escrow holds a balance.
    #[error("escrow balance is not zero")]
    NonZeroBalance,

    /// Approval operations were called on a ledger without an approval gate.
    #[error("approval is disabled on this ledger")]
    ApprovalDisabled,

    /// The signature, or the id it authorizes, has been canceled.
    #[error("signature has been canceled")]
    SignatureCanceled,

    /// The recovered signer does not match the claimed agent.
    #[error("signature does not recover to the agent")]
    InvalidSignature,

    /// The requested amount exceeds the available balance.
    #[error("requested {requested} exceeds available {available}")]
    InsufficientBalance {
        /// Amount the caller asked for.
        requested: Amount,
        /// Balance available to satisfy it.
        available: Amount,
    },

    /// The unique escrow does not hold its token.
    #[error("escrow does not hold its token")]
    NotDeposited,

    /// The unique escrow already holds its token.
    #[error("escrow already holds its token")]
    AlreadyDeposited,

    /// Payout destination is the zero principal.
    #[error("destination must not be the zero principal")]
    InvalidDestination,

    /// Checked arithmetic overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// The custody collaborator rejected the transfer.
    #[error("transfer failed: {0}")]
    FailedTransfer(#[from] TransferError),

    /// The event journal could not seal an entry.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// The ledger was constructed from an invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LedgerError {
    /// Whether this error rejects the caller's identity rather than the
    /// request itself.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotAgent
                | Self::WrongSender
                | Self::Unauthorized
                | Self::NotOwner
                | Self::InvalidSignature
                | Self::SignatureCanceled
        )
    }

    /// Stable snake_case name of the variant, without payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAgent => "not_agent",
            Self::WrongSender => "wrong_sender",
            Self::Unauthorized => "unauthorized",
            Self::NotOwner => "not_owner",
            Self::MissingAgent => "missing_agent",
            Self::EscrowAlreadyExists => "escrow_already_exists",
            Self::FeeTooHigh { .. } => "fee_too_high",
            Self::NotApproved => "not_approved",
            Self::NonZeroBalance => "non_zero_balance",
            Self::ApprovalDisabled => "approval_disabled",
            Self::SignatureCanceled => "signature_canceled",
            Self::InvalidSignature => "invalid_signature",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::NotDeposited => "not_deposited",
            Self::AlreadyDeposited => "already_deposited",
            Self::InvalidDestination => "invalid_destination",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::FailedTransfer(_) => "failed_transfer",
            Self::Journal(_) => "journal",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<ConfigError> for LedgerError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Errors from the hash-chained event journal and replay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// An event could not be canonicalized for digesting.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    /// An entry's digest or back-link does not match its predecessor.
    #[error("hash chain broken at sequence {sequence}")]
    ChainBroken {
        /// Sequence number of the first bad entry.
        sequence: u64,
    },

    /// Sequence numbers are not contiguous from zero.
    #[error("expected sequence {expected}, found {found}")]
    SequenceGap {
        /// The sequence number that should appear next.
        expected: u64,
        /// The sequence number that did.
        found: u64,
    },

    /// An event refers to state that earlier events never created.
    #[error("replay inconsistency: {0}")]
    Inconsistent(String),
}

impl From<escrow_core::CanonicalizationError> for JournalError {
    fn from(err: escrow_core::CanonicalizationError) -> Self {
        Self::Canonicalization(err.to_string())
    }
}

/// Errors from [`LedgerConfig::validate`](crate::LedgerConfig::validate)
/// and config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A fee maximum exceeds 100%.
    #[error("{field} = {value} exceeds BASE ({base})")]
    MaximumAboveBase {
        /// Offending field name.
        field: &'static str,
        /// Its value.
        value: u16,
        /// The fee denominator.
        base: u16,
    },

    /// The initial operator fee exceeds `max_operator_fee`.
    #[error("operator_fee {fee} exceeds max_operator_fee {max}")]
    OperatorFeeAboveMax {
        /// Configured initial fee.
        fee: u16,
        /// Configured maximum.
        max: u16,
    },

    /// The owner is the zero principal.
    #[error("owner must not be the zero principal")]
    ZeroOwner,

    /// YAML parsing failed.
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing failed.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_too_high_display() {
        let err = LedgerError::FeeTooHigh { fee: 1001, max: 1000 };
        assert_eq!(err.to_string(), "fee 1001 exceeds maximum 1000");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = LedgerError::InsufficientBalance {
            requested: Amount::new(10),
            available: Amount::new(3),
        };
        assert_eq!(err.to_string(), "requested 10 exceeds available 3");
    }

    #[test]
    fn transfer_error_wraps_into_ledger_error() {
        let err: LedgerError = TransferError::Frozen(Principal::from_u64(1)).into();
        assert!(matches!(err, LedgerError::FailedTransfer(TransferError::Frozen(_))));
        assert!(err.to_string().starts_with("transfer failed: holder 0x"));
    }

    #[test]
    fn authorization_errors_do_not_mention_ids() {
        for err in [LedgerError::NotAgent, LedgerError::WrongSender, LedgerError::Unauthorized] {
            assert!(!err.to_string().contains("0x"));
        }
    }

    #[test]
    fn authorization_classification() {
        assert!(LedgerError::NotOwner.is_authorization());
        assert!(LedgerError::InvalidSignature.is_authorization());
        assert!(!LedgerError::NonZeroBalance.is_authorization());
        assert!(!LedgerError::FailedTransfer(TransferError::Overflow).is_authorization());
    }

    #[test]
    fn codes_ignore_payload() {
        assert_eq!(LedgerError::FeeTooHigh { fee: 1, max: 0 }.code(), "fee_too_high");
        assert_eq!(
            LedgerError::FailedTransfer(TransferError::Overflow).code(),
            "failed_transfer"
        );
        assert_eq!(LedgerError::SignatureCanceled.code(), "signature_canceled");
    }

    #[test]
    fn config_error_converts() {
        let err: LedgerError = ConfigError::ZeroOwner.into();
        assert_eq!(
            err,
            LedgerError::InvalidConfig("owner must not be the zero principal".to_string())
        );
    }

    #[test]
    fn journal_error_display() {
        assert_eq!(
            JournalError::ChainBroken { sequence: 4 }.to_string(),
            "hash chain broken at sequence 4"
        );
        assert_eq!(
            JournalError::SequenceGap { expected: 2, found: 5 }.to_string(),
            "expected sequence 2, found 5"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::OperatorFeeAboveMax { fee: 60, max: 50 };
        assert_eq!(err.to_string(), "operator_fee 60 exceeds max_operator_fee 50");
    }
}
