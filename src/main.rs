//! # Run a single backtest
//! yave-backtest run --data data/xauusd_m15.csv --config config/default.toml
//!
//! # Run walk-forward validation
//! yave-backtest walk-forward --data data/xauusd_m15.csv --output results/wf.json
//!
//! # Check a candle export before using it
//! yave-backtest validate --data data/xauusd_m15.csv

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use yave_backtest::{
    run_backtest, AppConfig, DataLoader, IntegrityReport, ParameterSet, SignalSource,
    WalkForwardOutcome, WalkForwardValidator,
};

#[derive(Parser)]
#[command(name = "yave-backtest")]
#[command(about = "Deterministic candle backtester with walk-forward validation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest with the default parameters
    Run {
        /// Path to candle CSV (timestamp,open,high,low,close)
        #[arg(short, long)]
        data: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override a parameter, e.g. `--param ema_fast=8`
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run walk-forward validation over the parameter grid
    WalkForward {
        /// Path to candle CSV (timestamp,open,high,low,close)
        #[arg(short, long)]
        data: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the training window length in months
        #[arg(long)]
        train_months: Option<u32>,

        /// Override the test window length in months
        #[arg(long)]
        test_months: Option<u32>,

        /// Write windows and summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run integrity checks on a candle CSV
    Validate {
        /// Path to candle CSV (timestamp,open,high,low,close)
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yave_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            config,
            params,
            output,
        } => run(&data, config.as_deref(), &params, output.as_deref()),
        Commands::WalkForward {
            data,
            config,
            train_months,
            test_months,
            output,
        } => walk_forward(&data, config.as_deref(), train_months, test_months, output.as_deref()),
        Commands::Validate { data } => validate(&data),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_toml(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn parse_param_overrides(base: &ParameterSet, overrides: &[String]) -> Result<ParameterSet> {
    let mut params = base.clone();
    for item in overrides {
        let Some((name, raw)) = item.split_once('=') else {
            bail!("Invalid parameter '{}', expected NAME=VALUE", item);
        };
        let (name, raw) = (name.trim(), raw.trim());
        if let Ok(v) = raw.parse::<bool>() {
            params.set(name, v);
        } else if let Ok(v) = raw.parse::<i64>() {
            params.set(name, v);
        } else if let Ok(v) = raw.parse::<f64>() {
            params.set(name, v);
        } else {
            bail!("Invalid value '{}' for parameter '{}'", raw, name);
        }
    }
    Ok(params)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Results written to {}", path.display());
    Ok(())
}

fn run(data: &Path, config: Option<&Path>, overrides: &[String], output: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let params = parse_param_overrides(&config.default_params, overrides)?;

    let candles = DataLoader::load_csv(data)
        .with_context(|| format!("Failed to load candles from {}", data.display()))?;
    info!("Loaded {} candles from {}", candles.len(), data.display());

    let signals = config.signal_source().generate(&candles, &params);
    let result = run_backtest(&candles, &signals, &params, &config.backtest)
        .context("Backtest input rejected")?;

    println!("{}", result.summary());

    if let Some(path) = output {
        write_json(path, &result)?;
    }
    Ok(())
}

fn walk_forward(
    data: &Path,
    config: Option<&Path>,
    train_months: Option<u32>,
    test_months: Option<u32>,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(months) = train_months {
        config.walkforward.train_months = months;
    }
    if let Some(months) = test_months {
        config.walkforward.test_months = months;
    }

    let candles = DataLoader::load_csv(data)
        .with_context(|| format!("Failed to load candles from {}", data.display()))?;
    info!("Loaded {} candles from {}", candles.len(), data.display());

    let validator = WalkForwardValidator::new()
        .with_config(config.walkforward.clone())
        .with_backtest_config(config.backtest.clone())
        .with_param_grid(config.grid.clone())
        .with_default_params(config.default_params.clone());

    let outcome = validator
        .validate(&candles, &config.signal_source())
        .context("Walk-forward input rejected")?;

    match &outcome {
        WalkForwardOutcome::Completed { windows, summary } => {
            for window in windows {
                println!(
                    "Window {:>2}: {} -> {} | {} | IS PF {:.2} | OOS PF {:.2} | trades {} | net ${:.2}",
                    window.window_num,
                    window.test_start,
                    window.test_end,
                    window.params.key(),
                    window.in_sample_profit_factor,
                    window.result.profit_factor(),
                    window.result.total_trades(),
                    window.result.net_profit,
                );
            }
            println!("\n{}", summary.summary());
        }
        WalkForwardOutcome::InsufficientData { candles, reason } => {
            warn!("Insufficient data ({} candles): {}", candles, reason);
            println!("Insufficient data: {}", reason);
        }
    }

    if let Some(path) = output {
        write_json(path, &outcome)?;
    }
    Ok(())
}

fn validate(data: &Path) -> Result<()> {
    let candles = DataLoader::load_csv(data)
        .with_context(|| format!("Failed to load candles from {}", data.display()))?;

    let report = IntegrityReport::build(&candles);
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", status, check.name, check.message);
        if let Some(details) = &check.details {
            println!("       {}", details);
        }
    }
    println!("\n{}", report.summary());

    if !report.all_passed() {
        bail!("{} integrity checks failed", report.failed_checks().len());
    }
    Ok(())
}
