//! # escrow-cli — Command Line Tools for the Escrow Ledger
//!
//! ## Subcommands
//!
//! - `escrow id`: derive an escrow id from public parameters.
//! - `escrow keygen`: generate an Ed25519 key pair and print its principal.
//! - `escrow sign-id`: sign an escrow id for relayed creation.
//! - `escrow simulate`: run a YAML/JSON scenario against an in-memory
//!   ledger and print outcomes, the event journal and the final snapshot.
//!
//! ```bash
//! escrow keygen --output keys --prefix agent
//! escrow id --instance 0x..e5c0 --agent 0x..11 --depositant 0x..22 \
//!     --retreader 0x..33 --fee 500 --asset 0x..c0 --salt 1
//! escrow sign-id --key keys/agent.key 0x3f5a...
//! escrow simulate demos/basic.yaml
//! ```

pub mod id;
pub mod keys;
pub mod scenario;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a file that is either YAML or JSON, chosen by extension.
pub fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse JSON: {}", path.display()))
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse YAML: {}", path.display()))
    }
}
