//! Feature engine — rolling technical indicators per symbol.
//!
//! Each public field of [`FeatureRow`] is `Option<f64>`: a row that lacks
//! its full lookback of history is absent, never zero, so downstream
//! consumers (scoring, candidate filter) are forced to handle missing data
//! explicitly. Internally the columns are computed as NaN vectors and
//! converted at the end.
//!
//! Formulas:
//! - `ret_5d = close[t]/close[t-5] - 1`, `ret_20d` analogous
//! - `sma_50`, `sma_200`: simple rolling means; `dist_sma = (close-sma)/sma`
//! - RSI-14: Wilder smoothing (alpha = 1/14) of day-over-day gains/losses
//! - True Range = max(high-low, |high-prev_close|, |low-prev_close|);
//!   ATR-14 = 14-day rolling mean of TR; `atr_pct = ATR/close`
//! - `rel_vol = volume[t] / mean(volume[t-20..t-1])` — the baseline is
//!   shifted by one day so today's volume never feeds its own average
//! - `vol_20d`: 20-day stdev of daily returns, annualized by sqrt(252)

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const VOLUME_WINDOW: usize = 20;
pub const VOL_WINDOW: usize = 20;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Derived numeric fields for one symbol on one date.
///
/// `None` means "insufficient history" and must propagate as unscored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureRow {
    pub ret_5d: Option<f64>,
    pub ret_20d: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub dist_sma_50: Option<f64>,
    pub dist_sma_200: Option<f64>,
    pub rsi_14: Option<f64>,
    pub atr_14: Option<f64>,
    pub atr_pct: Option<f64>,
    pub avg_vol_20: Option<f64>,
    pub rel_vol: Option<f64>,
    pub vol_20d: Option<f64>,
}

/// Compute the full feature series for one symbol's aligned bar history.
///
/// The result has one row per input bar.
pub fn compute_features(bars: &[Bar]) -> Vec<FeatureRow> {
    let n = bars.len();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let ret_5d = pct_change(&closes, 5);
    let ret_20d = pct_change(&closes, 20);
    let sma_50 = rolling_mean(&closes, 50);
    let sma_200 = rolling_mean(&closes, 200);
    let dist_sma_50 = distance(&closes, &sma_50);
    let dist_sma_200 = distance(&closes, &sma_200);
    let rsi_14 = wilder_rsi(&closes, RSI_PERIOD);

    let tr = true_range(bars);
    let atr_14 = rolling_mean(&tr, ATR_PERIOD);
    let atr_pct = ratio(&atr_14, &closes);

    let avg_vol_20 = shift(&rolling_mean(&volumes, VOLUME_WINDOW), 1);
    let rel_vol = relative_volume(&volumes, &avg_vol_20);

    let ret_1d = pct_change(&closes, 1);
    let vol_20d: Vec<f64> = rolling_std(&ret_1d, VOL_WINDOW)
        .iter()
        .map(|v| v * TRADING_DAYS_PER_YEAR.sqrt())
        .collect();

    (0..n)
        .map(|i| FeatureRow {
            ret_5d: opt(ret_5d[i]),
            ret_20d: opt(ret_20d[i]),
            sma_50: opt(sma_50[i]),
            sma_200: opt(sma_200[i]),
            dist_sma_50: opt(dist_sma_50[i]),
            dist_sma_200: opt(dist_sma_200[i]),
            rsi_14: opt(rsi_14[i]),
            atr_14: opt(atr_14[i]),
            atr_pct: opt(atr_pct[i]),
            avg_vol_20: opt(avg_vol_20[i]),
            rel_vol: opt(rel_vol[i]),
            vol_20d: opt(vol_20d[i]),
        })
        .collect()
}

/// NaN/Inf → None.
fn opt(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

// ─── Rolling primitives ──────────────────────────────────────────────

/// Period-over-period return: out[t] = v[t]/v[t-period] - 1.
pub fn pct_change(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for t in period..n {
        let prev = values[t - period];
        let curr = values[t];
        if prev.is_nan() || curr.is_nan() || prev == 0.0 {
            continue;
        }
        out[t] = curr / prev - 1.0;
    }
    out
}

/// Simple rolling mean. NaN until the window is full; NaN whenever the
/// window contains a NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }
    for t in (window - 1)..n {
        let slice = &values[t + 1 - window..=t];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[t] = slice.iter().sum::<f64>() / window as f64;
    }
    out
}

/// Rolling sample standard deviation (ddof = 1), NaN on incomplete windows.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window {
        return out;
    }
    for t in (window - 1)..n {
        let slice = &values[t + 1 - window..=t];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var =
            slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        out[t] = var.sqrt();
    }
    out
}

/// Shift a series right by `k`, filling the head with NaN.
pub fn shift(values: &[f64], k: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for t in k..n {
        out[t] = values[t - k];
    }
    out
}

/// (close - sma) / sma, NaN where sma is NaN or zero.
fn distance(closes: &[f64], sma: &[f64]) -> Vec<f64> {
    closes
        .iter()
        .zip(sma)
        .map(|(&c, &m)| {
            if c.is_nan() || m.is_nan() || m == 0.0 {
                f64::NAN
            } else {
                (c - m) / m
            }
        })
        .collect()
}

/// Element-wise numerator/denominator with NaN propagation.
fn ratio(num: &[f64], den: &[f64]) -> Vec<f64> {
    num.iter()
        .zip(den)
        .map(|(&a, &b)| {
            if a.is_nan() || b.is_nan() || b == 0.0 {
                f64::NAN
            } else {
                a / b
            }
        })
        .collect()
}

/// Today's volume over the shifted 20-day baseline. A zero baseline yields
/// 0.0 rather than Inf (division guard, not a signal).
fn relative_volume(volumes: &[f64], baseline: &[f64]) -> Vec<f64> {
    volumes
        .iter()
        .zip(baseline)
        .map(|(&v, &base)| {
            if v.is_nan() || base.is_nan() {
                f64::NAN
            } else if base == 0.0 {
                0.0
            } else {
                v / base
            }
        })
        .collect()
}

/// True Range series. TR needs the previous close, so the first bar with
/// data (and anything before it) is NaN.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    for t in 1..n {
        let h = bars[t].high;
        let l = bars[t].low;
        let pc = bars[t - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[t] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// RSI with Wilder smoothing (alpha = 1/period) over day-over-day close
/// changes. Leading NaN closes (void bars before a symbol's first print)
/// push the seed window forward instead of poisoning the whole series.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    // First index with a real close.
    let first = match closes.iter().position(|v| !v.is_nan()) {
        Some(i) => i,
        None => return out,
    };
    if n - first < period + 1 {
        return out;
    }

    let mut changes = vec![f64::NAN; n];
    for t in (first + 1)..n {
        changes[t] = closes[t] - closes[t - 1];
    }

    // Seed: simple average of gains/losses over the first `period` changes.
    let seed_end = first + period;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[(first + 1)..=seed_end] {
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[seed_end] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for t in (seed_end + 1)..n {
        let ch = changes[t];
        let gain = if ch > 0.0 { ch } else { 0.0 };
        let loss = if ch < 0.0 { -ch } else { 0.0 };
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        out[t] = rsi_value(avg_gain, avg_loss);
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
