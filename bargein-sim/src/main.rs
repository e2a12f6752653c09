//! `bargein-sim` — replays scripted VAD/STT sessions against a decision engine.

mod scenario;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use bargein_core::{Decision, DecisionEngine, MatchMode};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::scenario::{builtin_scenarios, load_scenarios, run_scenario};
use crate::settings::{default_settings_path, load_settings, save_settings};

/// Barge-in decision simulator
#[derive(Parser)]
#[command(name = "bargein-sim", version, about)]
struct Cli {
    /// Settings JSON (word lists, timeout, match mode)
    #[arg(long, env = "BARGEIN_SETTINGS")]
    settings: Option<PathBuf>,

    /// Scenario JSON to replay instead of the built-in cases
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the partial timeout in milliseconds
    #[arg(long, env = "BARGEIN_PARTIAL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Scan utterances for command words instead of matching them whole
    #[arg(long)]
    contains: bool,

    /// Write the effective settings to the settings path and exit
    #[arg(long)]
    save_settings: bool,

    /// Print each decision as a JSON line
    #[arg(long)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "bargein_core=info,bargein_sim=info",
        1 => "bargein_core=debug,bargein_sim=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut config = load_settings(&settings_path)?;
    if let Some(ms) = cli.timeout_ms {
        config.partial_timeout_ms = ms;
    }
    if cli.contains {
        config.match_mode = MatchMode::Contains;
    }
    info!(path = %settings_path.display(), "settings loaded");

    if cli.save_settings {
        config.validate()?;
        save_settings(&settings_path, &config)?;
        info!(path = %settings_path.display(), "settings written");
        return Ok(());
    }

    let scenarios = match &cli.scenario {
        Some(path) => load_scenarios(path)?,
        None => builtin_scenarios(config.partial_timeout_ms),
    };

    let engine = DecisionEngine::new(config, |d: &Decision| {
        info!(decision = %d.kind(), reason = %d.reason(), text = d.text(), "on_decision");
    })?;

    for scenario in &scenarios {
        if !cli.json {
            println!("\n--- {} ---", scenario.name);
        }
        let decisions = run_scenario(&engine, scenario).await;
        if decisions.is_empty() && !cli.json {
            println!("  (no decision)");
        }
        for decision in &decisions {
            if cli.json {
                println!("{}", serde_json::to_string(decision)?);
            } else {
                println!(
                    "  -> decision: {} | reason: {} | stt: {:?}",
                    decision.kind(),
                    decision.reason(),
                    decision.text()
                );
            }
        }
    }

    let diag = engine.diagnostics_snapshot();
    info!(
        decisions = diag.decisions(),
        ignored = diag.ignored,
        interrupted = diag.interrupted,
        passed = diag.passed,
        timeouts = diag.timeouts_fired,
        "simulation finished"
    );
    Ok(())
}
