//! # escrow CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use escrow_cli::id::{run_id, IdArgs};
use escrow_cli::keys::{run_keygen, run_sign_id, KeygenArgs, SignIdArgs};
use escrow_cli::simulate::{run_simulate, SimulateArgs};

/// Escrow ledger tools: id derivation, signing and scenario simulation.
#[derive(Parser, Debug)]
#[command(name = "escrow", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive an escrow id from its public parameters.
    Id(IdArgs),

    /// Generate an Ed25519 key pair.
    Keygen(KeygenArgs),

    /// Sign an escrow id for relayed creation.
    SignId(SignIdArgs),

    /// Run a scenario against an in-memory ledger.
    Simulate(SimulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Id(args) => run_id(args),
        Commands::Keygen(args) => run_keygen(args),
        Commands::SignId(args) => run_sign_id(args),
        Commands::Simulate(args) => run_simulate(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
