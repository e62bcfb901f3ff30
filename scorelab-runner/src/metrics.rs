//! Performance metrics — pure functions over equity and benchmark curves.
//!
//! Every metric is a pure function: curves in, scalar out. Division by zero
//! is always guarded with 0.0 so a degenerate run (constant equity, empty
//! curve) produces well-defined numbers instead of NaN or a panic.

use serde::{Deserialize, Serialize};

/// Trading days per year, used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance of one simulation run against its benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// (final - initial) / initial for the strategy.
    pub total_return: f64,
    /// Same, for the benchmark rescaled to starting capital.
    pub benchmark_return: f64,
    /// total_return - benchmark_return.
    pub excess_return: f64,
    pub sharpe: f64,
    pub information_ratio: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub trade_count: usize,
}

impl PerformanceSummary {
    /// Compute all metrics. `benchmark` must be date-aligned with `equity`
    /// (same calendar slice); the caller rescales it to starting capital.
    pub fn compute(equity: &[f64], benchmark: &[f64], trade_count: usize) -> Self {
        let total = total_return(equity);
        let bench = total_return(benchmark);
        Self {
            total_return: total,
            benchmark_return: bench,
            excess_return: total - bench,
            sharpe: sharpe_ratio(equity),
            information_ratio: information_ratio(equity, benchmark),
            max_drawdown: max_drawdown(equity),
            trade_count,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let initial = equity[0];
    let final_eq = *equity.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Annualized Sharpe ratio from daily returns.
///
/// sqrt(252) × mean(daily returns) / stdev(daily returns).
/// Returns 0.0 if the stdev is zero or fewer than 2 bars exist.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    annualized_ratio(&daily_returns(equity))
}

/// Annualized information ratio: the Sharpe formula applied to the daily
/// return differential between strategy and benchmark.
pub fn information_ratio(equity: &[f64], benchmark: &[f64]) -> f64 {
    let strat = daily_returns(equity);
    let bench = daily_returns(benchmark);
    let n = strat.len().min(bench.len());
    if n == 0 {
        return 0.0;
    }
    let diff: Vec<f64> = strat[..n]
        .iter()
        .zip(&bench[..n])
        .map(|(s, b)| s - b)
        .collect();
    annualized_ratio(&diff)
}

/// Maximum drawdown as a negative fraction (0.0 for monotone curves).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let mut peak = equity[0];
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Daily returns from an equity curve. Non-positive bases yield 0.0.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// sqrt(252) × mean/stdev of a daily return series, 0.0 when degenerate.
fn annualized_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(returns);
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * TRADING_DAYS_PER_YEAR.sqrt()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
