//! Walk-forward validation — rolling train/test windows with per-window
//! threshold tuning.
//!
//! The calendar is partitioned into rolling windows: each window trains on
//! `train_days` sessions, then evaluates out-of-sample (OOS) on the next
//! `test_days` sessions. The window origin advances by `step_days`; a final
//! window that cannot fit a full train + test span is dropped.
//!
//! Tuning picks the entry threshold from a candidate grid by maximizing
//! `sharpe + excess_return` on the training span. Only the threshold is
//! tuned; all other parameters are held fixed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use scorelab_core::data::UniverseData;
use scorelab_core::sim::{SimParams, SymbolTable};

use crate::metrics::PerformanceSummary;
use crate::runner::{run_backtest_from_data, RunError};

// ─── Configuration ───────────────────────────────────────────────────

/// Minimum training span in trading days.
pub const MIN_TRAIN_DAYS: usize = 120;
/// Minimum test span in trading days.
pub const MIN_TEST_DAYS: usize = 20;
/// Minimum step between window origins in trading days.
pub const MIN_STEP_DAYS: usize = 10;

/// Configuration for walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardParams {
    /// Training span per window in trading days (default 252 = 1 year).
    pub train_days: usize,
    /// Out-of-sample span per window in trading days (default 63 = 1 quarter).
    pub test_days: usize,
    /// Days the window origin advances between windows (default 63).
    pub step_days: usize,
    /// Candidate entry thresholds tried on each training span.
    pub threshold_grid: Vec<f64>,
}

impl Default for WalkForwardParams {
    fn default() -> Self {
        Self {
            train_days: 252,
            test_days: 63,
            step_days: 63,
            threshold_grid: vec![55.0, 60.0, 65.0, 70.0, 75.0],
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Index ranges of a single walk-forward window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub window_index: usize,
    /// Training start index (inclusive).
    pub train_start: usize,
    /// Training end index (exclusive). Equals the test start.
    pub train_end: usize,
    /// Test end index (exclusive).
    pub test_end: usize,
}

/// Result of a single window: tuned threshold plus train and test metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowResult {
    pub window_index: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    /// Threshold selected on the training span.
    pub threshold: f64,
    pub train: PerformanceSummary,
    pub test: PerformanceSummary,
}

/// Complete result of a walk-forward run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    /// OOS returns compounded across windows.
    pub compound_oos_return: f64,
    pub mean_oos_sharpe: f64,
    pub mean_oos_information_ratio: f64,
    pub mean_oos_drawdown: f64,
    pub total_oos_trades: usize,
}

impl WalkForwardResult {
    /// Flat key→value summary for terminal output.
    pub fn print_summary(&self) {
        for w in &self.windows {
            println!(
                "window {}: train {}..{} test {}..{} threshold {:.0} oos_return_pct {:.2} oos_sharpe {:.3}",
                w.window_index,
                w.train_start,
                w.train_end,
                w.test_start,
                w.test_end,
                w.threshold,
                w.test.total_return * 100.0,
                w.test.sharpe,
            );
        }
        println!("windows:               {}", self.windows.len());
        println!("compound_oos_return_pct: {:.2}", self.compound_oos_return * 100.0);
        println!("mean_oos_sharpe:       {:.3}", self.mean_oos_sharpe);
        println!("mean_oos_ir:           {:.3}", self.mean_oos_information_ratio);
        println!("mean_oos_drawdown_pct: {:.2}", self.mean_oos_drawdown * 100.0);
        println!("total_oos_trades:      {}", self.total_oos_trades);
    }
}

/// Errors from walk-forward validation.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("threshold grid is empty")]
    EmptyGrid,
    #[error("train_days {train_days} below minimum {min}")]
    TrainTooShort { train_days: usize, min: usize },
    #[error("test_days {test_days} below minimum {min}")]
    TestTooShort { test_days: usize, min: usize },
    #[error("step_days {step_days} below minimum {min}")]
    StepTooShort { step_days: usize, min: usize },
    #[error("insufficient history: {total_days} days, need at least {needed} for one window")]
    InsufficientHistory { total_days: usize, needed: usize },
    #[error("backtest error on window {window}: {source}")]
    BacktestFailed {
        window: usize,
        #[source]
        source: RunError,
    },
}

// ─── Window creation ─────────────────────────────────────────────────

/// Partition a calendar of `total_days` sessions into rolling windows.
///
/// Windows advance by `step_days`; a trailing stub that cannot hold a full
/// train + test span is dropped. Consecutive test spans overlap when
/// `step_days < test_days` and leave gaps when `step_days > test_days`.
pub fn create_windows(
    total_days: usize,
    params: &WalkForwardParams,
) -> Result<Vec<WindowSpec>, WalkForwardError> {
    validate_params(params)?;

    let span = params.train_days + params.test_days;
    if total_days < span {
        return Err(WalkForwardError::InsufficientHistory {
            total_days,
            needed: span,
        });
    }

    let mut windows = Vec::new();
    let mut start = 0;
    while start + span <= total_days {
        windows.push(WindowSpec {
            window_index: windows.len(),
            train_start: start,
            train_end: start + params.train_days,
            test_end: start + span,
        });
        start += params.step_days;
    }

    Ok(windows)
}

fn validate_params(params: &WalkForwardParams) -> Result<(), WalkForwardError> {
    if params.threshold_grid.is_empty() {
        return Err(WalkForwardError::EmptyGrid);
    }
    if params.train_days < MIN_TRAIN_DAYS {
        return Err(WalkForwardError::TrainTooShort {
            train_days: params.train_days,
            min: MIN_TRAIN_DAYS,
        });
    }
    if params.test_days < MIN_TEST_DAYS {
        return Err(WalkForwardError::TestTooShort {
            test_days: params.test_days,
            min: MIN_TEST_DAYS,
        });
    }
    if params.step_days < MIN_STEP_DAYS {
        return Err(WalkForwardError::StepTooShort {
            step_days: params.step_days,
            min: MIN_STEP_DAYS,
        });
    }
    Ok(())
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Run walk-forward validation over pre-loaded data.
///
/// Features and scores are computed once over the full history; each window
/// only restricts the simulated index range, so warm-up never eats into a
/// window's tradable days.
pub fn run_walk_forward(
    universe: &UniverseData,
    tables: &[SymbolTable],
    base_params: &SimParams,
    wf_params: &WalkForwardParams,
) -> Result<WalkForwardResult, WalkForwardError> {
    let windows = create_windows(universe.calendar.len(), wf_params)?;

    // Ascending grid so the strict-improvement rule keeps the lowest
    // threshold among equally scored candidates.
    let mut grid = wf_params.threshold_grid.clone();
    grid.sort_by(|a, b| a.total_cmp(b));

    let mut results = Vec::with_capacity(windows.len());
    for window in &windows {
        let train_range = window.train_start..window.train_end;
        let test_range = window.train_end..window.test_end;

        let mut best: Option<(f64, f64, PerformanceSummary)> = None;
        for &threshold in &grid {
            let mut params = base_params.clone();
            params.entry_threshold = threshold;
            let train =
                run_backtest_from_data(universe, tables, train_range.clone(), &params).map_err(
                    |e| WalkForwardError::BacktestFailed {
                        window: window.window_index,
                        source: e,
                    },
                )?;
            let objective = train.metrics.sharpe + train.metrics.excess_return;
            let improved = match &best {
                Some((best_obj, _, _)) => objective > *best_obj,
                None => true,
            };
            if improved {
                best = Some((objective, threshold, train.metrics));
            }
        }

        // Grid is non-empty, so a best candidate always exists.
        let (_, threshold, train_metrics) = match best {
            Some(b) => b,
            None => return Err(WalkForwardError::EmptyGrid),
        };

        let mut params = base_params.clone();
        params.entry_threshold = threshold;
        let test = run_backtest_from_data(universe, tables, test_range, &params).map_err(|e| {
            WalkForwardError::BacktestFailed {
                window: window.window_index,
                source: e,
            }
        })?;

        info!(
            window = window.window_index,
            threshold,
            oos_return = test.metrics.total_return,
            "walk-forward window complete"
        );

        results.push(WindowResult {
            window_index: window.window_index,
            train_start: universe.calendar[window.train_start],
            train_end: universe.calendar[window.train_end - 1],
            test_start: universe.calendar[window.train_end],
            test_end: universe.calendar[window.test_end - 1],
            threshold,
            train: train_metrics,
            test: test.metrics,
        });
    }

    Ok(aggregate(results))
}

/// Aggregate per-window OOS results: compound returns, average the rest.
fn aggregate(windows: Vec<WindowResult>) -> WalkForwardResult {
    let n = windows.len() as f64;
    let compound_oos_return = windows
        .iter()
        .fold(1.0, |acc, w| acc * (1.0 + w.test.total_return))
        - 1.0;
    let mean_oos_sharpe = windows.iter().map(|w| w.test.sharpe).sum::<f64>() / n;
    let mean_oos_information_ratio =
        windows.iter().map(|w| w.test.information_ratio).sum::<f64>() / n;
    let mean_oos_drawdown = windows.iter().map(|w| w.test.max_drawdown).sum::<f64>() / n;
    let total_oos_trades = windows.iter().map(|w| w.test.trade_count).sum();

    WalkForwardResult {
        windows,
        compound_oos_return,
        mean_oos_sharpe,
        mean_oos_information_ratio,
        mean_oos_drawdown,
        total_oos_trades,
    }
}
