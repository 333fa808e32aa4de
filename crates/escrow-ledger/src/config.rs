//! # Ledger Configuration
//!
//! A deployment is described by one [`LedgerConfig`]. Two presets cover the
//! common shapes:
//!
//! | Preset                          | max operator fee | approval   |
//! |---------------------------------|------------------|------------|
//! | [`LedgerConfig::new`]           | 50 (0.5%)        | disabled   |
//! | [`LedgerConfig::approval_gated`]| 5000 (50%)       | required   |
//!
//! Configs load from YAML or JSON; every field except `instance` and
//! `owner` has a default.

use escrow_core::{FeeRate, Principal, BASE, MAX_AGENT_FEE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default ceiling on the operator fee (0.5%).
pub const DEFAULT_MAX_OPERATOR_FEE: u16 = 50;

/// Operator fee ceiling of the approval-gated preset (50%).
pub const APPROVAL_GATED_MAX_OPERATOR_FEE: u16 = 5_000;

/// Whether deposits require the agent's approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    #[default]
    Disabled,
    Required,
}

/// What `cancel` leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Remove the record; the id reads back as never created.
    #[default]
    ClearRecord,
    /// Zero the balance and approval, keep the parties and mark the record
    /// canceled. The id stays occupied and the record accepts no further
    /// operations.
    RetainParties,
}

/// How escrow ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// SHA-256 over the packed escrow terms.
    #[default]
    Derived,
    /// A counter starting at 1; salts are ignored.
    Sequential,
}

/// Configuration of one ledger deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The ledger's own principal. Bound into every derived id and used as
    /// the custodian account.
    pub instance: Principal,
    /// Principal allowed to administer operator fees.
    pub owner: Principal,
    #[serde(default = "default_max_agent_fee")]
    pub max_agent_fee: u16,
    #[serde(default = "default_max_operator_fee")]
    pub max_operator_fee: u16,
    /// Initial operator fee in basis points.
    #[serde(default)]
    pub operator_fee: u16,
    #[serde(default)]
    pub approval: ApprovalMode,
    #[serde(default)]
    pub cancel_policy: CancelPolicy,
    #[serde(default)]
    pub id_scheme: IdScheme,
}

fn default_max_agent_fee() -> u16 {
    MAX_AGENT_FEE
}

fn default_max_operator_fee() -> u16 {
    DEFAULT_MAX_OPERATOR_FEE
}

impl LedgerConfig {
    /// Fungible defaults: no approval gate, operator fee capped at 0.5%.
    pub fn new(instance: Principal, owner: Principal) -> Self {
        Self {
            instance,
            owner,
            max_agent_fee: MAX_AGENT_FEE,
            max_operator_fee: DEFAULT_MAX_OPERATOR_FEE,
            operator_fee: 0,
            approval: ApprovalMode::Disabled,
            cancel_policy: CancelPolicy::ClearRecord,
            id_scheme: IdScheme::Derived,
        }
    }

    /// Agent approval required before deposits, operator fee capped at 50%.
    pub fn approval_gated(instance: Principal, owner: Principal) -> Self {
        Self {
            max_operator_fee: APPROVAL_GATED_MAX_OPERATOR_FEE,
            approval: ApprovalMode::Required,
            ..Self::new(instance, owner)
        }
    }

    pub fn with_operator_fee(mut self, fee: u16) -> Self {
        self.operator_fee = fee;
        self
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    /// Reject maxima above [`BASE`], an initial operator fee above its
    /// maximum, and a zero owner.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_agent_fee", self.max_agent_fee),
            ("max_operator_fee", self.max_operator_fee),
        ] {
            if value > BASE {
                return Err(ConfigError::MaximumAboveBase { field, value, base: BASE });
            }
        }
        if self.operator_fee > self.max_operator_fee {
            return Err(ConfigError::OperatorFeeAboveMax {
                fee: self.operator_fee,
                max: self.max_operator_fee,
            });
        }
        if self.owner.is_zero() {
            return Err(ConfigError::ZeroOwner);
        }
        Ok(())
    }

    /// The validated initial operator fee.
    pub fn initial_operator_fee(&self) -> Result<FeeRate, ConfigError> {
        self.validate()?;
        FeeRate::bounded(u64::from(self.operator_fee), self.max_operator_fee).map_err(|_| {
            ConfigError::OperatorFeeAboveMax {
                fee: self.operator_fee,
                max: self.max_operator_fee,
            }
        })
    }

    pub fn approval_required(&self) -> bool {
        self.approval == ApprovalMode::Required
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}
