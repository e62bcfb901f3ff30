//! Conviction scoring — pure rule-based mapping of a feature row to [0,100].
//!
//! Four buckets: momentum (35), quality/structure (25),
//! catalyst/participation (20), regime proxy (20). The thresholds are part
//! of the contract, not runtime-tunable. A row with any missing input is
//! unscored (`None`) — partial scoring would silently treat missing data
//! as bearish.

use crate::features::FeatureRow;

pub const MAX_SCORE: f64 = 100.0;

/// Score one day's features. `None` if any required field is undefined.
///
/// Pure and idempotent: the same row always yields the same score.
pub fn score_row(row: &FeatureRow) -> Option<f64> {
    let ret_5d = row.ret_5d?;
    let ret_20d = row.ret_20d?;
    let dist_sma_50 = row.dist_sma_50?;
    let dist_sma_200 = row.dist_sma_200?;
    let rsi = row.rsi_14?;
    let atr_pct = row.atr_pct?;
    let rel_vol = row.rel_vol?;
    let vol_20d = row.vol_20d?;

    let mut score: f64 = 0.0;

    // ── Momentum (max 35) ──
    if dist_sma_50 > 0.0 {
        score += 10.0;
    }
    if rsi > 50.0 {
        score += 8.0;
    }
    if ret_5d > 0.0 {
        score += 7.0;
    }
    if ret_20d > 0.0 {
        score += 10.0;
    }

    // ── Quality / structure (max 25) ──
    if dist_sma_200 > 0.0 {
        score += 10.0;
    }
    if (45.0..=70.0).contains(&rsi) {
        score += 8.0;
    }
    if atr_pct < 0.04 {
        score += 7.0;
    }

    // ── Catalyst / participation (max 20) ──
    if rel_vol > 1.8 {
        score += 12.0;
    } else if rel_vol > 1.2 {
        score += 8.0;
    }
    if ret_5d > 0.0 && ret_20d > 0.0 {
        score += 8.0;
    }

    // ── Regime proxy (max 20) ──
    if vol_20d <= 0.25 && ret_20d > 0.0 {
        score += 20.0;
    } else if vol_20d <= 0.35 && ret_20d > 0.0 {
        score += 12.0;
    } else if vol_20d <= 0.45 {
        score += 6.0;
    }

    // The rules cannot exceed 100, but the clamp is a required invariant.
    Some(score.clamp(0.0, MAX_SCORE))
}
