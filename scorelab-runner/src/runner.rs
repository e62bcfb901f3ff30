//! Backtest runner — wires together loader, tables, simulator and metrics.
//!
//! Two entry points:
//! - [`run_backtest`]: fetches data through a provider, then runs the full
//!   configured range. The CLI's single-run path.
//! - [`run_backtest_from_data`]: takes a pre-built calendar and score
//!   tables plus an index range — no I/O. The walk-forward orchestrator
//!   calls this once per threshold per window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use scorelab_core::data::{load_universe, DataProvider, LoadError, UniverseData};
use scorelab_core::domain::{EquitySnapshot, TradeRecord};
use scorelab_core::sim::{build_tables, simulate, SimError, SimParams, SymbolTable};

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::PerformanceSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Load(#[from] LoadError),

    #[error("simulation error: {0}")]
    Sim(#[from] SimError),
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub metrics: PerformanceSummary,
    /// Symbols that survived loading and were considered for entry.
    pub symbols: Vec<String>,
    pub params: SimParams,
    pub equity_curve: Vec<EquitySnapshot>,
    pub trades: Vec<TradeRecord>,
}

impl SimulationResult {
    /// Flat key→value summary for terminal output.
    pub fn print_summary(&self) {
        println!("start_date:        {}", self.start_date);
        println!("end_date:          {}", self.end_date);
        println!("symbols:           {}", self.symbols.join(","));
        println!("initial_equity:    {:.2}", self.initial_capital);
        println!("final_equity:      {:.2}", self.final_equity);
        println!("total_return_pct:  {:.2}", self.metrics.total_return * 100.0);
        println!(
            "benchmark_return_pct: {:.2}",
            self.metrics.benchmark_return * 100.0
        );
        println!("excess_return_pct: {:.2}", self.metrics.excess_return * 100.0);
        println!("sharpe:            {:.3}", self.metrics.sharpe);
        println!("information_ratio: {:.3}", self.metrics.information_ratio);
        println!("max_drawdown_pct:  {:.2}", self.metrics.max_drawdown * 100.0);
        println!("trades:            {}", self.metrics.trade_count);
        println!("entry_threshold:   {}", self.params.entry_threshold);
    }
}

/// Fetch data, build score tables and run the full configured range.
pub fn run_backtest(
    config: &BacktestConfig,
    provider: &dyn DataProvider,
) -> Result<SimulationResult, RunError> {
    config.validate()?;
    let universe = load_universe(
        provider,
        &config.universe,
        &config.benchmark,
        config.start_date,
        config.end_date,
    )?;
    let tables = build_tables(&universe);
    let range = 0..universe.calendar.len();
    info!(run_id = %config.run_id(), days = universe.calendar.len(), "running backtest");
    run_backtest_from_data(&universe, &tables, range, &config.params)
}

/// Run the simulator + evaluator over a pre-built range — no I/O.
///
/// Each call starts from fresh cash and an empty position set; nothing is
/// shared with previous invocations.
pub fn run_backtest_from_data(
    universe: &UniverseData,
    tables: &[SymbolTable],
    range: std::ops::Range<usize>,
    params: &SimParams,
) -> Result<SimulationResult, RunError> {
    let output = simulate(&universe.calendar, tables, range.clone(), params)?;
    let equity = output.equity_values();
    let benchmark = rescaled_benchmark(
        &universe.benchmark_closes[range],
        params.initial_capital,
    );
    let metrics = PerformanceSummary::compute(&equity, &benchmark, output.trades.len());

    Ok(SimulationResult {
        start_date: output.start_date,
        end_date: output.end_date,
        initial_capital: params.initial_capital,
        final_equity: *equity.last().unwrap_or(&params.initial_capital),
        metrics,
        symbols: tables.iter().map(|t| t.symbol.clone()).collect(),
        params: params.clone(),
        equity_curve: output.equity_curve,
        trades: output.trades,
    })
}

/// Rescale benchmark closes to the strategy's starting capital so the two
/// curves are directly comparable.
fn rescaled_benchmark(closes: &[f64], initial_capital: f64) -> Vec<f64> {
    match closes.first() {
        Some(&first) if first > 0.0 => closes
            .iter()
            .map(|&c| initial_capital * c / first)
            .collect(),
        _ => vec![initial_capital; closes.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benchmark_rescaled_to_capital() {
        let closes = vec![400.0, 440.0, 380.0];
        let curve = rescaled_benchmark(&closes, 10_000.0);
        assert!((curve[0] - 10_000.0).abs() < 1e-9);
        assert!((curve[1] - 11_000.0).abs() < 1e-9);
        assert!((curve[2] - 9_500.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_benchmark_flatlines() {
        let curve = rescaled_benchmark(&[0.0, 1.0], 10_000.0);
        assert_eq!(curve, vec![10_000.0, 10_000.0]);
    }
}
