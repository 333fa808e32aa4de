//! # Key Subcommands
//!
//! `keygen` writes an Ed25519 seed and public key as hex files and prints
//! the principal the ledger will see for that key. `sign-id` produces the
//! 96-byte envelope a relayer submits with `signed_create_escrow`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use escrow_core::EscrowId;
use escrow_crypto::{Ed25519KeyPair, SigningMessage};

/// Arguments for `escrow keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "escrow")]
    pub prefix: String,
}

/// Arguments for `escrow sign-id`.
#[derive(Args, Debug)]
pub struct SignIdArgs {
    /// Path to the seed file (hex-encoded 32 bytes).
    #[arg(long)]
    pub key: PathBuf,
    /// Escrow id to authorize.
    #[arg(value_name = "ID")]
    pub id: EscrowId,
}

/// Execute `escrow keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let (key_path, pub_path, key) = write_keypair(&args.output, &args.prefix)?;
    println!("OK: generated Ed25519 keypair");
    println!("  Seed:       {}", key_path.display());
    println!("  Public key: {}", pub_path.display());
    println!("  Principal:  {}", key.principal());
    Ok(0)
}

fn write_keypair(dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf, Ed25519KeyPair)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let key = Ed25519KeyPair::generate();
    let key_path = dir.join(format!("{prefix}.key"));
    let pub_path = dir.join(format!("{prefix}.pub"));
    std::fs::write(&key_path, key.seed_hex())
        .with_context(|| format!("failed to write seed: {}", key_path.display()))?;
    std::fs::write(&pub_path, key.public_key().to_hex())
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
    tracing::info!(principal = %key.principal(), "generated key pair");
    Ok((key_path, pub_path, key))
}

/// Load a key pair from a hex seed file.
pub fn load_key(path: &Path) -> Result<Ed25519KeyPair> {
    if !path.exists() {
        bail!("key file not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key: {}", path.display()))?;
    Ed25519KeyPair::from_seed_hex(text.trim())
        .with_context(|| format!("invalid key file: {}", path.display()))
}

/// Execute `escrow sign-id`.
pub fn run_sign_id(args: &SignIdArgs) -> Result<u8> {
    let key = load_key(&args.key)?;
    let envelope = key.sign_envelope(&SigningMessage::for_escrow_id(&args.id));
    tracing::debug!(escrow_id = %args.id, signer = %key.principal(), "signed escrow id");
    println!("{}", envelope.to_hex());
    Ok(0)
}
