//! Serializable backtest configuration.
//!
//! One immutable value carries everything a run needs: the symbol
//! universe, the benchmark, the date range and the simulator knobs. It is
//! passed by reference into the runner and orchestrator — no module-level
//! globals, so two configurations can coexist in one process.

use chrono::NaiveDate;
use scorelab_core::sim::SimParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for a backtest or walk-forward run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    /// Symbols to score and trade (the benchmark is excluded automatically).
    pub universe: Vec<String>,
    pub benchmark: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub params: SimParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            universe: [
                "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "AMD", "NFLX",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            benchmark: "SPY".to_string(),
            start_date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            params: SimParams::default(),
        }
    }
}

impl BacktestConfig {
    /// Load and validate a TOML config file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Deterministic content hash of this configuration, for artifact
    /// naming and reproducibility checks.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.is_empty() {
            return Err(ConfigError::Invalid("universe is empty".into()));
        }
        if self.end_date <= self.start_date {
            return Err(ConfigError::Invalid(format!(
                "end_date {} must be after start_date {}",
                self.end_date, self.start_date
            )));
        }
        let p = &self.params;
        if p.initial_capital <= 0.0 {
            return Err(ConfigError::Invalid("initial_capital must be positive".into()));
        }
        for (name, value) in [
            ("max_position_pct", p.max_position_pct),
            ("cash_buffer_pct", p.cash_buffer_pct),
            ("stop_loss_pct", p.stop_loss_pct),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if p.max_open_positions == 0 || p.max_new_trades_per_day == 0 {
            return Err(ConfigError::Invalid(
                "position and trade caps must be at least 1".into(),
            ));
        }
        if p.slippage_bps < 0.0 || p.fee_per_trade < 0.0 {
            return Err(ConfigError::Invalid("frictions must be non-negative".into()));
        }
        Ok(())
    }
}
