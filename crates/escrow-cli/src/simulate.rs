//! # Simulate Subcommand
//!
//! Loads a scenario (YAML, or JSON by `.json` extension), runs it and
//! prints the report. Exit code 1 when any step's outcome differs from its
//! `expect` field.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::scenario::{run_scenario, Scenario, ScenarioReport};

/// Arguments for `escrow simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file.
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,
    /// Print only the step outcomes, not the journal and snapshot.
    #[arg(long)]
    pub summary: bool,
}

fn print_report(report: &ScenarioReport, summary: bool) -> Result<()> {
    let text = if summary {
        serde_json::to_string_pretty(&report.steps)
    } else {
        serde_json::to_string_pretty(report)
    }
    .context("failed to serialize report")?;
    println!("{text}");
    Ok(())
}

/// Execute `escrow simulate`.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let scenario: Scenario = crate::read_document(&args.scenario)?;
    tracing::info!(
        path = %args.scenario.display(),
        steps = scenario.steps.len(),
        "running scenario"
    );
    let report = run_scenario(&scenario)?;
    print_report(&report, args.summary)?;

    let mismatches = report.mismatches();
    if mismatches > 0 {
        eprintln!("FAIL: {mismatches} step(s) did not match their expectation");
        return Ok(1);
    }
    Ok(0)
}
