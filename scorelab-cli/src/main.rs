//! ScoreLab CLI — run and walk-forward commands.
//!
//! Commands:
//! - `run` — execute a single backtest over the configured range
//! - `walk-forward` — rolling train/test validation with threshold tuning
//!
//! Data comes from Yahoo Finance by default; pass `--csv-dir` to read
//! `SYMBOL.csv` files from disk instead (useful offline and in tests).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use scorelab_core::data::{CsvProvider, DataProvider, YahooProvider};
use scorelab_runner::{
    run_backtest, run_walk_forward, BacktestConfig, WalkForwardParams,
};

#[derive(Parser)]
#[command(name = "scorelab", about = "ScoreLab — conviction-score backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest from a TOML config file.
    Run {
        /// Path to a TOML config file. Omit to use the built-in defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read SYMBOL.csv files from this directory instead of Yahoo.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Write the full result as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Rolling walk-forward validation with per-window threshold tuning.
    WalkForward {
        /// Path to a TOML config file. Omit to use the built-in defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read SYMBOL.csv files from this directory instead of Yahoo.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Training span per window in trading days.
        #[arg(long, default_value_t = 252)]
        train_days: usize,

        /// Out-of-sample span per window in trading days.
        #[arg(long, default_value_t = 63)]
        test_days: usize,

        /// Days the window origin advances between windows.
        #[arg(long, default_value_t = 63)]
        step_days: usize,

        /// Candidate entry thresholds (comma-separated).
        #[arg(long, value_delimiter = ',', default_value = "55,60,65,70,75")]
        thresholds: Vec<f64>,

        /// Write the full result as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, csv_dir, json } => cmd_run(config, csv_dir, json),
        Commands::WalkForward {
            config,
            csv_dir,
            train_days,
            test_days,
            step_days,
            thresholds,
            json,
        } => {
            let wf = WalkForwardParams {
                train_days,
                test_days,
                step_days,
                threshold_grid: thresholds,
            };
            cmd_walk_forward(config, csv_dir, wf, json)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(p) => BacktestConfig::from_toml_file(&p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn make_provider(csv_dir: Option<PathBuf>) -> Box<dyn DataProvider> {
    match csv_dir {
        Some(dir) => Box::new(CsvProvider::new(dir)),
        None => Box::new(YahooProvider::new()),
    }
}

fn cmd_run(config: Option<PathBuf>, csv_dir: Option<PathBuf>, json: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let provider = make_provider(csv_dir);

    let result = run_backtest(&config, provider.as_ref())?;
    result.print_summary();

    if let Some(path) = json {
        fs::write(&path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Result saved to: {}", path.display());
    }

    Ok(())
}

fn cmd_walk_forward(
    config: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    wf: WalkForwardParams,
    json: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config)?;
    config.validate()?;
    let provider = make_provider(csv_dir);

    let universe = scorelab_core::data::load_universe(
        provider.as_ref(),
        &config.universe,
        &config.benchmark,
        config.start_date,
        config.end_date,
    )?;
    let tables = scorelab_core::sim::build_tables(&universe);

    let result = run_walk_forward(&universe, &tables, &config.params, &wf)?;
    result.print_summary();

    if let Some(path) = json {
        fs::write(&path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Result saved to: {}", path.display());
    }

    Ok(())
}
