//! # Scenarios
//!
//! A scenario describes a ledger deployment, initial token balances and an
//! ordered list of calls. [`run_scenario`] executes it against an
//! [`EscrowLedger`] backed by an [`InMemoryTokenBank`] and the
//! [`Ed25519Verifier`], and reports what every call returned.
//!
//! Principals, assets and escrows are referenced by name:
//!
//! - `parties` maps names to principals given as hex.
//! - `keys` maps names to Ed25519 seeds; the name resolves to the key's
//!   principal and signed creations by that name are signed automatically.
//! - `assets` maps names to asset handles.
//! - an escrow is named by the `label` of the step that created it.
//!
//! Any reference that is not a known name is parsed as hex.
//!
//! ```yaml
//! ledger:
//!   instance: "0x000000000000000000000000000000000000e5c0"
//!   owner: operator
//! parties:
//!   operator: "0x000000000000000000000000000000000000000a"
//! steps:
//!   - op: create_escrow
//!     caller: agent
//!     label: main
//!     terms: { depositant: alice, retreader: bob, fee: 500, asset: usd, salt: 1 }
//!   - op: deposit
//!     caller: alice
//!     escrow: main
//!     amount: 1000000
//!     expect: ok
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use escrow_core::{Amount, Asset, EscrowId, Principal, Salt};
use escrow_crypto::{Ed25519KeyPair, Ed25519Verifier, SignatureBytes, SigningMessage};
use escrow_ledger::{
    ApprovalMode, CancelPolicy, EscrowLedger, EscrowTerms, IdScheme, InMemoryTokenBank,
    JournalEntry, LedgerConfig, LedgerError, LedgerEvent, LedgerSnapshot,
};

/// Ledger settings with principals given by name.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSpec {
    pub instance: String,
    pub owner: String,
    #[serde(default)]
    pub max_agent_fee: Option<u16>,
    #[serde(default)]
    pub max_operator_fee: Option<u16>,
    #[serde(default)]
    pub operator_fee: u16,
    #[serde(default)]
    pub approval: ApprovalMode,
    #[serde(default)]
    pub cancel_policy: CancelPolicy,
    #[serde(default)]
    pub id_scheme: IdScheme,
}

/// A starting balance minted into the bank.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceSpec {
    pub asset: String,
    pub holder: String,
    pub amount: Amount,
}

/// Escrow terms with names instead of raw principals.
#[derive(Debug, Clone, Deserialize)]
pub struct TermsSpec {
    pub depositant: String,
    pub retreader: String,
    pub fee: u64,
    pub asset: String,
    #[serde(default)]
    pub salt: u64,
}

/// One ledger call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    CreateEscrow {
        caller: String,
        label: String,
        terms: TermsSpec,
    },
    SignedCreateEscrow {
        caller: String,
        agent: String,
        label: String,
        terms: TermsSpec,
        /// Explicit envelope; signed with the agent's key when omitted.
        #[serde(default)]
        signature: Option<SignatureBytes>,
    },
    CancelSignature {
        caller: String,
        signature: SignatureBytes,
    },
    CancelSignatureForTerms {
        caller: String,
        terms: TermsSpec,
    },
    ApproveEscrow {
        caller: String,
        escrow: String,
    },
    RemoveApproveEscrow {
        caller: String,
        escrow: String,
    },
    Deposit {
        caller: String,
        escrow: String,
        amount: Amount,
    },
    WithdrawToRetreader {
        caller: String,
        escrow: String,
        amount: Amount,
    },
    WithdrawToDepositant {
        caller: String,
        escrow: String,
        amount: Amount,
    },
    Cancel {
        caller: String,
        escrow: String,
    },
    SetOperatorFee {
        caller: String,
        rate: u64,
    },
    OperatorWithdraw {
        caller: String,
        asset: String,
        to: String,
        amount: Amount,
    },
    TransferOwnership {
        caller: String,
        new_owner: String,
    },
    /// Make every bank transfer touching `holder` fail.
    Freeze {
        holder: String,
    },
    Unfreeze {
        holder: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEscrow { .. } => "create_escrow",
            Self::SignedCreateEscrow { .. } => "signed_create_escrow",
            Self::CancelSignature { .. } => "cancel_signature",
            Self::CancelSignatureForTerms { .. } => "cancel_signature_for_terms",
            Self::ApproveEscrow { .. } => "approve_escrow",
            Self::RemoveApproveEscrow { .. } => "remove_approve_escrow",
            Self::Deposit { .. } => "deposit",
            Self::WithdrawToRetreader { .. } => "withdraw_to_retreader",
            Self::WithdrawToDepositant { .. } => "withdraw_to_depositant",
            Self::Cancel { .. } => "cancel",
            Self::SetOperatorFee { .. } => "set_operator_fee",
            Self::OperatorWithdraw { .. } => "operator_withdraw",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::Freeze { .. } => "freeze",
            Self::Unfreeze { .. } => "unfreeze",
        }
    }
}

/// A call plus its expected outcome: `ok` or a [`LedgerError::code`].
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub expect: Option<String>,
}

/// A complete scenario document.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub ledger: LedgerSpec,
    #[serde(default)]
    pub parties: BTreeMap<String, Principal>,
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
    #[serde(default)]
    pub balances: Vec<BalanceSpec>,
    pub steps: Vec<Step>,
}

/// What one step returned.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    /// `ok` or the error code.
    pub outcome: String,
    /// Return value on success, error message on failure.
    pub detail: Value,
    /// `false` when the step had an `expect` that did not match.
    pub matched: bool,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepOutcome>,
    pub journal: Vec<JournalEntry<LedgerEvent>>,
    pub snapshot: LedgerSnapshot,
    /// Bank balances of every named party and the instance, per named asset.
    pub balances: BTreeMap<String, BTreeMap<String, Amount>>,
}

impl ScenarioReport {
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.matched).count()
    }
}

type SimLedger = EscrowLedger<InMemoryTokenBank, Ed25519Verifier>;

/// Name resolution for one run.
struct Names {
    parties: BTreeMap<String, Principal>,
    keys: BTreeMap<String, Ed25519KeyPair>,
    assets: BTreeMap<String, Asset>,
    escrows: BTreeMap<String, EscrowId>,
}

impl Names {
    fn new(scenario: &Scenario) -> Result<Self> {
        let mut keys = BTreeMap::new();
        let mut parties = scenario.parties.clone();
        for (name, seed) in &scenario.keys {
            let key = Ed25519KeyPair::from_seed_hex(seed.trim())
                .with_context(|| format!("invalid seed for key {name}"))?;
            if parties.insert(name.clone(), key.principal()).is_some() {
                bail!("{name} is declared both as a party and as a key");
            }
            keys.insert(name.clone(), key);
        }
        Ok(Self {
            parties,
            keys,
            assets: scenario.assets.clone(),
            escrows: BTreeMap::new(),
        })
    }

    fn principal(&self, name: &str) -> Result<Principal> {
        match self.parties.get(name) {
            Some(p) => Ok(*p),
            None => name
                .parse()
                .with_context(|| format!("unknown party {name}")),
        }
    }

    fn asset(&self, name: &str) -> Result<Asset> {
        match self.assets.get(name) {
            Some(a) => Ok(*a),
            None => name.parse().with_context(|| format!("unknown asset {name}")),
        }
    }

    fn escrow(&self, name: &str) -> Result<EscrowId> {
        match self.escrows.get(name) {
            Some(id) => Ok(*id),
            None => name.parse().with_context(|| format!("unknown escrow {name}")),
        }
    }

    fn terms(&self, spec: &TermsSpec) -> Result<EscrowTerms> {
        Ok(EscrowTerms {
            depositant: self.principal(&spec.depositant)?,
            retreader: self.principal(&spec.retreader)?,
            fee: spec.fee,
            asset: self.asset(&spec.asset)?,
            salt: Salt::from_u64(spec.salt),
        })
    }
}

fn build_config(spec: &LedgerSpec, names: &Names) -> Result<LedgerConfig> {
    let instance = names.principal(&spec.instance)?;
    let owner = names.principal(&spec.owner)?;
    let base = if spec.approval == ApprovalMode::Required {
        LedgerConfig::approval_gated(instance, owner)
    } else {
        LedgerConfig::new(instance, owner)
    };
    let mut config = base
        .with_operator_fee(spec.operator_fee)
        .with_cancel_policy(spec.cancel_policy)
        .with_id_scheme(spec.id_scheme);
    if let Some(max) = spec.max_agent_fee {
        config.max_agent_fee = max;
    }
    if let Some(max) = spec.max_operator_fee {
        config.max_operator_fee = max;
    }
    config.validate().context("invalid ledger section")?;
    Ok(config)
}

/// Execute every step in order. Ledger rejections are outcomes, not
/// errors; unresolvable names and invalid configuration are errors.
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let mut names = Names::new(scenario)?;
    let config = build_config(&scenario.ledger, &names)?;

    let mut bank = InMemoryTokenBank::new();
    for balance in &scenario.balances {
        bank.mint(
            &names.asset(&balance.asset)?,
            &names.principal(&balance.holder)?,
            balance.amount,
        )
        .map_err(|e| anyhow!("cannot mint initial balance: {e}"))?;
    }
    let mut ledger: SimLedger = EscrowLedger::new(config, bank, Ed25519Verifier)
        .map_err(|e| anyhow!("cannot build ledger: {e}"))?;

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = execute(&mut ledger, &mut names, &step.action)
            .with_context(|| format!("step {index} ({})", step.action.name()))?;
        let (outcome, detail) = match result {
            Ok(value) => ("ok".to_string(), value),
            Err(err) => (err.code().to_string(), Value::String(err.to_string())),
        };
        let matched = step.expect.as_deref().map_or(true, |e| e == outcome);
        if !matched {
            tracing::warn!(index, op = step.action.name(), %outcome, "unexpected outcome");
        }
        outcomes.push(StepOutcome {
            index,
            op: step.action.name(),
            outcome,
            detail,
            matched,
        });
    }

    let balances = balance_table(&ledger, &names);
    Ok(ScenarioReport {
        steps: outcomes,
        journal: ledger.journal().entries().to_vec(),
        snapshot: ledger.snapshot(),
        balances,
    })
}

fn balance_table(ledger: &SimLedger, names: &Names) -> BTreeMap<String, BTreeMap<String, Amount>> {
    use escrow_ledger::AssetTransferAgent;

    let mut holders: Vec<(String, Principal)> = names
        .parties
        .iter()
        .map(|(n, p)| (n.clone(), *p))
        .collect();
    if !names.parties.values().any(|p| p == ledger.instance()) {
        holders.push(("instance".to_string(), *ledger.instance()));
    }
    names
        .assets
        .iter()
        .map(|(asset_name, asset)| {
            let row = holders
                .iter()
                .map(|(n, p)| (n.clone(), ledger.bank().balance_of(asset, p)))
                .collect();
            (asset_name.clone(), row)
        })
        .collect()
}

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Outer `Result`: the step could not be resolved. Inner: the ledger's answer.
fn execute(
    ledger: &mut SimLedger,
    names: &mut Names,
    action: &Action,
) -> Result<Result<Value, LedgerError>> {
    let outcome = match action {
        Action::CreateEscrow { caller, label, terms } => {
            let caller = names.principal(caller)?;
            let terms = names.terms(terms)?;
            ledger.create_escrow(&caller, &terms).map(|id| {
                names.escrows.insert(label.clone(), id);
                json!({ "escrow_id": id })
            })
        }
        Action::SignedCreateEscrow {
            caller,
            agent,
            label,
            terms,
            signature,
        } => {
            let caller_p = names.principal(caller)?;
            let agent_p = names.principal(agent)?;
            let terms = names.terms(terms)?;
            let signature = match signature {
                Some(sig) => sig.clone(),
                None => sign_for(ledger, names, agent, &agent_p, &terms)?,
            };
            ledger
                .signed_create_escrow(&caller_p, &agent_p, &terms, &signature)
                .map(|id| {
                    names.escrows.insert(label.clone(), id);
                    json!({ "escrow_id": id, "signature": signature })
                })
        }
        Action::CancelSignature { caller, signature } => {
            let caller = names.principal(caller)?;
            ledger.cancel_signature(&caller, signature).map(|()| Value::Null)
        }
        Action::CancelSignatureForTerms { caller, terms } => {
            let caller = names.principal(caller)?;
            let terms = names.terms(terms)?;
            ledger
                .cancel_signature_for_terms(&caller, &terms)
                .map(|id| json!({ "escrow_id": id }))
        }
        Action::ApproveEscrow { caller, escrow } => {
            let caller = names.principal(caller)?;
            let id = names.escrow(escrow)?;
            ledger.approve_escrow(&caller, &id).map(|()| Value::Null)
        }
        Action::RemoveApproveEscrow { caller, escrow } => {
            let caller = names.principal(caller)?;
            let id = names.escrow(escrow)?;
            ledger.remove_approve_escrow(&caller, &id).map(|()| Value::Null)
        }
        Action::Deposit { caller, escrow, amount } => {
            let caller = names.principal(caller)?;
            let id = names.escrow(escrow)?;
            ledger.deposit(&caller, &id, *amount).map(to_json)
        }
        Action::WithdrawToRetreader { caller, escrow, amount } => {
            let caller = names.principal(caller)?;
            let id = names.escrow(escrow)?;
            ledger.withdraw_to_retreader(&caller, &id, *amount).map(to_json)
        }
        Action::WithdrawToDepositant { caller, escrow, amount } => {
            let caller = names.principal(caller)?;
            let id = names.escrow(escrow)?;
            ledger.withdraw_to_depositant(&caller, &id, *amount).map(to_json)
        }
        Action::Cancel { caller, escrow } => {
            let caller = names.principal(caller)?;
            let id = names.escrow(escrow)?;
            ledger.cancel(&caller, &id).map(|amount| json!({ "returned": amount }))
        }
        Action::SetOperatorFee { caller, rate } => {
            let caller = names.principal(caller)?;
            ledger.set_operator_fee(&caller, *rate).map(|()| Value::Null)
        }
        Action::OperatorWithdraw { caller, asset, to, amount } => {
            let caller = names.principal(caller)?;
            let asset = names.asset(asset)?;
            let to = names.principal(to)?;
            ledger
                .operator_withdraw(&caller, &asset, &to, *amount)
                .map(|()| Value::Null)
        }
        Action::TransferOwnership { caller, new_owner } => {
            let caller = names.principal(caller)?;
            let new_owner = names.principal(new_owner)?;
            ledger.transfer_ownership(&caller, &new_owner).map(|()| Value::Null)
        }
        Action::Freeze { holder } => {
            let holder = names.principal(holder)?;
            ledger.bank_mut().freeze(holder);
            Ok(Value::Null)
        }
        Action::Unfreeze { holder } => {
            let holder = names.principal(holder)?;
            ledger.bank_mut().unfreeze(&holder);
            Ok(Value::Null)
        }
    };
    Ok(outcome)
}

fn sign_for(
    ledger: &SimLedger,
    names: &Names,
    agent_name: &str,
    agent: &Principal,
    terms: &EscrowTerms,
) -> Result<SignatureBytes> {
    let key = names
        .keys
        .get(agent_name)
        .with_context(|| format!("{agent_name} has no key; give an explicit signature"))?;
    let fee = escrow_core::FeeRate::bounded(terms.fee, escrow_core::BASE)
        .with_context(|| format!("fee {} cannot be signed", terms.fee))?;
    let id = ledger.calculate_id(
        agent,
        &terms.depositant,
        &terms.retreader,
        fee,
        &terms.asset,
        &terms.salt,
    );
    Ok(key.sign_envelope(&SigningMessage::for_escrow_id(&id)))
}
