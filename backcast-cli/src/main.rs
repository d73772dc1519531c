//! `simulate <config.json>` — run one backtest synchronously.
//!
//! The config carries the request fields under the keys `dataPath`,
//! `strategy`, `parameters`, and `initialCash`. The Result DTO goes to
//! stdout as JSON; all diagnostics go to stderr. Exit code 0 on success,
//! 1 on any error.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backcast_core::BacktestEngine;
use backcast_service::BacktestResults;

#[derive(Parser)]
#[command(
    name = "simulate",
    about = "Run one backtest from a JSON config and print the Result DTO"
)]
struct Args {
    /// Path to the JSON config file
    config: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(rename = "dataPath")]
    data_path: String,
    strategy: String,
    #[serde(default)]
    parameters: HashMap<String, f64>,
    #[serde(rename = "initialCash")]
    initial_cash: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = read_config(&args.config)?;

    info!(
        data_path = %config.data_path,
        strategy = %config.strategy,
        "starting backtest"
    );

    let engine = BacktestEngine::new();
    let run = engine.run(
        &config.data_path,
        &config.strategy,
        &config.parameters,
        config.initial_cash,
        &mut |progress, step| info!("{step} ({:.0}%)", progress * 100.0),
    )?;

    let results = BacktestResults::from_run("", &run);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn read_config(path: &PathBuf) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not open config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))
}
