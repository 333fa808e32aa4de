//! # Id Subcommand
//!
//! Re-derives an escrow id from the public parameters of the escrow, the
//! same way a ledger instance does. `--token-id` selects the unique-asset
//! layout; otherwise `--fee` is required.

use anyhow::{bail, Context, Result};
use clap::Args;

use escrow_core::{
    derive_escrow_id, derive_unique_escrow_id, Asset, EscrowId, FeeRate, Principal, Salt, TokenId,
    BASE,
};

/// Arguments for `escrow id`.
#[derive(Args, Debug)]
pub struct IdArgs {
    /// Principal of the ledger instance.
    #[arg(long)]
    pub instance: Principal,
    #[arg(long)]
    pub agent: Principal,
    #[arg(long)]
    pub depositant: Principal,
    #[arg(long)]
    pub retreader: Principal,
    /// Token contract handle.
    #[arg(long)]
    pub asset: Asset,
    /// Agent fee in basis points (fungible layout).
    #[arg(long, conflicts_with = "token_id")]
    pub fee: Option<u64>,
    /// Token number, decimal or 0x-prefixed 32-byte hex (unique layout).
    #[arg(long)]
    pub token_id: Option<String>,
    /// Salt, decimal or 0x-prefixed 32-byte hex.
    #[arg(long, default_value = "0")]
    pub salt: String,
}

/// Parse a 32-byte word given either as a decimal number or as hex.
pub fn parse_word(s: &str) -> Result<[u8; 32]> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        return escrow_core::hex::decode_fixed::<32>(s).context("invalid 32-byte hex word");
    }
    let n: u128 = s
        .parse()
        .with_context(|| format!("not a decimal or 0x-hex word: {s}"))?;
    Ok(*Salt::from_u128(n).as_bytes())
}

/// Derive the id described by `args`.
pub fn derive(args: &IdArgs) -> Result<EscrowId> {
    let salt = Salt::from_bytes(parse_word(&args.salt)?);
    match (&args.token_id, args.fee) {
        (Some(token), _) => {
            let token_id = TokenId::from_bytes(parse_word(token)?);
            Ok(derive_unique_escrow_id(
                &args.instance,
                &args.agent,
                &args.depositant,
                &args.retreader,
                &args.asset,
                &token_id,
                &salt,
            ))
        }
        (None, Some(raw)) => {
            // Ids are derivable for any representable rate; the ledger
            // enforces its own maximum at creation.
            let fee = FeeRate::bounded(raw, BASE)
                .with_context(|| format!("fee {raw} is above {BASE}"))?;
            Ok(derive_escrow_id(
                &args.instance,
                &args.agent,
                &args.depositant,
                &args.retreader,
                fee,
                &args.asset,
                &salt,
            ))
        }
        (None, None) => bail!("either --fee or --token-id is required"),
    }
}

/// Execute `escrow id`.
pub fn run_id(args: &IdArgs) -> Result<u8> {
    let id = derive(args)?;
    tracing::debug!(escrow_id = %id, "derived escrow id");
    println!("{id}");
    Ok(0)
}
