//! Portfolio simulator — the sequential day-by-day state machine.
//!
//! Per simulated day, in strict order:
//! 1. Mark open positions to today's close and run stop-loss exits.
//! 2. Select entry candidates on *yesterday's* score (the signal must be
//!    observable before the trade) and today's open.
//! 3. Open at most `max_new_trades_per_day` positions under the capital,
//!    position-count and cash-buffer constraints.
//! 4. Record the end-of-day equity snapshot.
//!
//! The ordering is a correctness invariant: moving candidate selection
//! before the exits, or scoring on today's row, introduces look-ahead bias.
//! The loop is inherently sequential across days and must not be
//! parallelized.

pub mod tables;

pub use tables::{build_tables, SymbolTable};

use crate::domain::{EquitySnapshot, Position, TradeRecord, TradeSide};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

/// Simulator knobs. Immutable for the duration of a run; a fresh run never
/// shares position or cash state with a previous one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimParams {
    pub initial_capital: f64,
    /// Minimum prior-day conviction score to consider entry.
    pub entry_threshold: f64,
    /// Max position notional as a fraction of current equity.
    pub max_position_pct: f64,
    pub max_open_positions: usize,
    pub max_new_trades_per_day: usize,
    /// Fraction of equity kept as untouchable cash when sizing entries.
    pub cash_buffer_pct: f64,
    pub stop_loss_pct: f64,
    /// Adverse execution cost in basis points, applied to entries and exits.
    pub slippage_bps: f64,
    pub fee_per_trade: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            entry_threshold: 70.0,
            max_position_pct: 0.15,
            max_open_positions: 5,
            max_new_trades_per_day: 1,
            cash_buffer_pct: 0.20,
            stop_loss_pct: 0.08,
            slippage_bps: 5.0,
            fee_per_trade: 1.0,
        }
    }
}

impl SimParams {
    /// Slippage as a fraction of price.
    pub fn slippage_frac(&self) -> f64 {
        self.slippage_bps / 10_000.0
    }
}

/// Errors that make a simulation impossible.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("need at least 2 trading dates, got {0}")]
    TooFewDates(usize),

    #[error("no usable symbol tables")]
    NoSymbols,

    #[error("range {start}..{end} out of bounds for calendar of {len} days")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Everything one simulation run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimOutput {
    pub equity_curve: Vec<EquitySnapshot>,
    pub trades: Vec<TradeRecord>,
    /// Positions still open at the last date (unrealized, not liquidated).
    pub open_positions: Vec<Position>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SimOutput {
    /// The equity curve as plain values, for the evaluator.
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|s| s.equity).collect()
    }
}

/// Run the simulator over `range` (indices into the shared calendar).
///
/// The equity history is seeded with a day-0 snapshot at initial capital;
/// trading begins on the second date so every entry decision has an
/// observable prior-day score inside the window. Positions still open at
/// the terminal date remain open.
pub fn simulate(
    calendar: &[NaiveDate],
    symbol_tables: &[SymbolTable],
    range: Range<usize>,
    params: &SimParams,
) -> Result<SimOutput, SimError> {
    if range.end > calendar.len() || range.start >= range.end {
        return Err(SimError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len: calendar.len(),
        });
    }
    if range.len() < 2 {
        return Err(SimError::TooFewDates(range.len()));
    }
    if symbol_tables.is_empty() {
        return Err(SimError::NoSymbols);
    }

    let table_index: HashMap<&str, usize> = symbol_tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.symbol.as_str(), i))
        .collect();

    let slip = params.slippage_frac();
    let mut cash = params.initial_capital;
    let mut positions: Vec<Position> = Vec::new();
    let mut trades: Vec<TradeRecord> = Vec::new();
    let mut equity_curve = vec![EquitySnapshot {
        date: calendar[range.start],
        equity: params.initial_capital,
        cash,
        open_positions: 0,
    }];

    for t in (range.start + 1)..range.end {
        let date = calendar[t];

        // ── 1. Mark to market and stop-loss exits ──
        let mut kept = Vec::with_capacity(positions.len());
        for pos in positions.drain(..) {
            let close = symbol_tables[table_index[pos.symbol.as_str()]].closes[t];
            if close.is_finite() && close <= pos.stop_level(params.stop_loss_pct) {
                let exit_price = close * (1.0 - slip);
                let proceeds = pos.quantity as f64 * exit_price - params.fee_per_trade;
                // Clamp: a fee exceeding the sale value cannot pull cash
                // below its pre-exit level.
                cash += proceeds.max(0.0);
                trades.push(TradeRecord::new(
                    date,
                    pos.symbol.clone(),
                    TradeSide::SellStop,
                    pos.quantity,
                    exit_price,
                ));
            } else {
                kept.push(pos);
            }
        }
        positions = kept;

        let mark = |positions: &[Position]| -> f64 {
            positions
                .iter()
                .map(|p| {
                    let close = symbol_tables[table_index[p.symbol.as_str()]].closes[t];
                    if close.is_finite() {
                        p.market_value(close)
                    } else {
                        p.market_value(p.entry_price)
                    }
                })
                .sum()
        };

        // ── 2. Candidate selection on yesterday's score ──
        let equity = cash + mark(&positions);
        let mut candidates: Vec<(usize, f64)> = Vec::new();
        if positions.len() < params.max_open_positions {
            for (idx, table) in symbol_tables.iter().enumerate() {
                if positions.iter().any(|p| p.symbol == table.symbol) {
                    continue;
                }
                let score = match table.scores[t - 1] {
                    Some(s) if s >= params.entry_threshold => s,
                    _ => continue,
                };
                let open = table.opens[t];
                if !open.is_finite() || open <= 0.0 {
                    continue;
                }
                candidates.push((idx, score));
            }
            // Stable sort: score ties fall back to symbol order.
            candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        }

        // ── 3. Entries under the cash buffer ──
        let reserved = equity * params.cash_buffer_pct;
        let mut spendable = cash - reserved;
        let mut opened = 0;
        for (idx, _score) in candidates {
            if opened >= params.max_new_trades_per_day
                || positions.len() >= params.max_open_positions
                || spendable <= 0.0
            {
                break;
            }
            let table = &symbol_tables[idx];
            let exec_price = table.opens[t] * (1.0 + slip);
            let target_notional = (equity * params.max_position_pct).min(spendable);
            let quantity = (target_notional / exec_price).floor() as u64;
            if quantity == 0 {
                continue;
            }
            let cost = quantity as f64 * exec_price + params.fee_per_trade;
            if cost > cash {
                continue;
            }
            cash -= cost;
            spendable -= cost;
            positions.push(Position {
                symbol: table.symbol.clone(),
                quantity,
                entry_price: exec_price,
                entry_date: date,
            });
            trades.push(TradeRecord::new(
                date,
                table.symbol.clone(),
                TradeSide::Buy,
                quantity,
                exec_price,
            ));
            opened += 1;
        }

        // ── 4. End-of-day snapshot ──
        equity_curve.push(EquitySnapshot {
            date,
            equity: cash + mark(&positions),
            cash,
            open_positions: positions.len(),
        });
    }

    Ok(SimOutput {
        equity_curve,
        trades,
        open_positions: positions,
        start_date: calendar[range.start],
        end_date: calendar[range.end - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
    }

    /// Table with constant price and a constant score on every date.
    fn flat_table(symbol: &str, n: usize, price: f64, score: Option<f64>) -> SymbolTable {
        SymbolTable {
            symbol: symbol.to_string(),
            opens: vec![price; n],
            closes: vec![price; n],
            features: vec![FeatureRow::default(); n],
            scores: vec![score; n],
        }
    }

    fn zero_friction() -> SimParams {
        SimParams {
            slippage_bps: 0.0,
            fee_per_trade: 0.0,
            ..SimParams::default()
        }
    }

    #[test]
    fn too_few_dates_is_an_error() {
        let cal = dates(1);
        let tables = vec![flat_table("A", 1, 100.0, None)];
        let err = simulate(&cal, &tables, 0..1, &SimParams::default()).unwrap_err();
        assert!(matches!(err, SimError::TooFewDates(1)));
    }

    #[test]
    fn no_tables_is_an_error() {
        let cal = dates(10);
        let err = simulate(&cal, &[], 0..10, &SimParams::default()).unwrap_err();
        assert!(matches!(err, SimError::NoSymbols));
    }

    #[test]
    fn seed_snapshot_is_initial_capital() {
        let cal = dates(10);
        let tables = vec![flat_table("A", 10, 100.0, None)];
        let out = simulate(&cal, &tables, 0..10, &SimParams::default()).unwrap();
        assert_eq!(out.equity_curve.len(), 10);
        assert_eq!(out.equity_curve[0].equity, 10_000.0);
        assert!(out.trades.is_empty());
    }

    #[test]
    fn entry_uses_prior_day_score() {
        let cal = dates(5);
        // Score appears only on day 2; the entry must land on day 3's open.
        let mut table = flat_table("A", 5, 100.0, None);
        table.scores[2] = Some(80.0);
        let out = simulate(&cal, &[table], 0..5, &zero_friction()).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].side, TradeSide::Buy);
        assert_eq!(out.trades[0].date, cal[3]);
    }

    #[test]
    fn entry_selection_ignores_todays_close() {
        let cal = dates(5);
        let mut a = flat_table("A", 5, 100.0, Some(80.0));
        let baseline = simulate(&cal, &[a.clone()], 0..5, &zero_friction()).unwrap();

        // Mutating the close on the entry day must not change the decision.
        a.closes[1] = 1.0;
        let mutated = simulate(&cal, &[a], 0..5, &zero_friction()).unwrap();

        let picked =
            |out: &SimOutput| -> Vec<(NaiveDate, String)> {
                out.trades
                    .iter()
                    .filter(|t| t.side == TradeSide::Buy && t.date == cal[1])
                    .map(|t| (t.date, t.symbol.clone()))
                    .collect()
            };
        assert_eq!(picked(&baseline), picked(&mutated));
    }

    #[test]
    fn below_threshold_never_enters() {
        let cal = dates(10);
        let tables = vec![flat_table("A", 10, 100.0, Some(69.9))];
        let out = simulate(&cal, &tables, 0..10, &zero_friction()).unwrap();
        assert!(out.trades.is_empty());
    }

    #[test]
    fn position_cap_respected() {
        let cal = dates(10);
        let tables = vec![
            flat_table("A", 10, 100.0, Some(90.0)),
            flat_table("B", 10, 100.0, Some(85.0)),
            flat_table("C", 10, 100.0, Some(80.0)),
        ];
        let params = SimParams {
            max_open_positions: 2,
            max_new_trades_per_day: 3,
            ..zero_friction()
        };
        let out = simulate(&cal, &tables, 0..10, &params).unwrap();
        for snap in &out.equity_curve {
            assert!(snap.open_positions <= 2);
        }
        assert_eq!(out.open_positions.len(), 2);
        // Best scores win: A then B, never C.
        assert!(out.trades.iter().all(|t| t.symbol != "C"));
    }

    #[test]
    fn one_new_trade_per_day_by_default() {
        let cal = dates(4);
        let tables = vec![
            flat_table("A", 4, 100.0, Some(90.0)),
            flat_table("B", 4, 100.0, Some(85.0)),
        ];
        let out = simulate(&cal, &tables, 0..4, &zero_friction()).unwrap();
        // Day 1: best candidate A only. Day 2: B.
        let day1: Vec<_> = out.trades.iter().filter(|t| t.date == cal[1]).collect();
        assert_eq!(day1.len(), 1);
        assert_eq!(day1[0].symbol, "A");
        let day2: Vec<_> = out.trades.iter().filter(|t| t.date == cal[2]).collect();
        assert_eq!(day2.len(), 1);
        assert_eq!(day2[0].symbol, "B");
    }

    #[test]
    fn score_tie_breaks_by_symbol_order() {
        let cal = dates(3);
        let tables = vec![
            flat_table("AAA", 3, 100.0, Some(90.0)),
            flat_table("BBB", 3, 100.0, Some(90.0)),
        ];
        let out = simulate(&cal, &tables, 0..3, &zero_friction()).unwrap();
        assert_eq!(out.trades[0].symbol, "AAA");
    }

    #[test]
    fn stop_triggers_at_exact_threshold_boundary() {
        // Entry at 100 (no slippage), stop 8% → boundary at 92.
        let run = |day2_close: f64| -> usize {
            let cal = dates(4);
            let mut table = flat_table("A", 4, 100.0, None);
            table.scores[0] = Some(80.0); // entry on day 1's open
            table.closes[2] = day2_close;
            table.closes[3] = day2_close;
            let out = simulate(&cal, &[table], 0..4, &zero_friction()).unwrap();
            out.trades
                .iter()
                .filter(|t| t.side == TradeSide::SellStop)
                .count()
        };

        assert_eq!(run(92.01), 0, "92.01 must not trigger the 8% stop");
        assert_eq!(run(91.99), 1, "91.99 must trigger the 8% stop");
        assert_eq!(run(92.0), 1, "the boundary itself triggers (<=)");
    }

    #[test]
    fn equity_accounts_for_fees_and_slippage() {
        let cal = dates(3);
        let mut table = flat_table("A", 3, 100.0, None);
        table.scores[0] = Some(80.0);
        let params = SimParams {
            slippage_bps: 100.0, // 1%
            fee_per_trade: 5.0,
            ..SimParams::default()
        };
        let out = simulate(&cal, &[table], 0..3, &params).unwrap();

        // Fill at 101, target notional = 1500 → 14 shares, cost = 1419.
        let buy = &out.trades[0];
        assert_eq!(buy.quantity, 14);
        assert!((buy.price - 101.0).abs() < 1e-10);

        let snap = &out.equity_curve[1];
        let expected_cash = 10_000.0 - 14.0 * 101.0 - 5.0;
        assert!((snap.cash - expected_cash).abs() < 1e-9);
        // Equity = cash + qty × close (close back at 100).
        assert!((snap.equity - (expected_cash + 14.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn equity_equals_cash_plus_marked_positions() {
        let cal = dates(20);
        let mut a = flat_table("A", 20, 100.0, Some(90.0));
        // Crash through the stop on day 10, then trade at the lower level.
        for t in 10..20 {
            a.closes[t] = 80.0;
            a.opens[t] = 80.0;
        }
        let params = SimParams::default();
        let out = simulate(&cal, &[a.clone()], 0..20, &params).unwrap();
        assert!(
            out.trades.iter().any(|t| t.side == TradeSide::SellStop),
            "the crash must trip the stop"
        );

        // Replay the trade ledger independently: at every snapshot,
        // equity == replayed cash + held quantity × that day's close.
        let mut cash = params.initial_capital;
        let mut held: u64 = 0;
        for (i, snap) in out.equity_curve.iter().enumerate() {
            for trade in out.trades.iter().filter(|t| t.date == snap.date) {
                match trade.side {
                    TradeSide::Buy => {
                        cash -= trade.notional + params.fee_per_trade;
                        held += trade.quantity;
                    }
                    TradeSide::SellStop => {
                        cash += (trade.notional - params.fee_per_trade).max(0.0);
                        held -= trade.quantity;
                    }
                }
            }
            assert!((snap.cash - cash).abs() < 1e-6, "cash diverged on day {i}");
            let expected = cash + held as f64 * a.closes[i];
            assert!(
                (snap.equity - expected).abs() < 1e-6,
                "equity diverged on day {i}: {} vs {expected}",
                snap.equity
            );
        }
    }

    #[test]
    fn cash_buffer_blocks_entries() {
        let cal = dates(5);
        let tables = vec![flat_table("A", 5, 100.0, Some(90.0))];
        let params = SimParams {
            cash_buffer_pct: 1.0,
            ..zero_friction()
        };
        let out = simulate(&cal, &tables, 0..5, &params).unwrap();
        assert!(out.trades.is_empty());
        assert_eq!(out.equity_curve.last().unwrap().equity, 10_000.0);
    }

    #[test]
    fn candidate_too_expensive_is_skipped() {
        let cal = dates(5);
        // One share already exceeds the 15% target notional.
        let tables = vec![flat_table("A", 5, 5_000.0, Some(90.0))];
        let out = simulate(&cal, &tables, 0..5, &zero_friction()).unwrap();
        assert!(out.trades.is_empty());
    }

    #[test]
    fn negative_stop_proceeds_clamped_to_zero() {
        let cal = dates(4);
        let mut table = flat_table("A", 4, 100.0, None);
        table.scores[0] = Some(80.0);
        // Collapse to a price where qty × exit < fee.
        table.closes[2] = 0.05;
        table.closes[3] = 0.05;
        let params = SimParams {
            slippage_bps: 0.0,
            fee_per_trade: 50.0,
            ..SimParams::default()
        };
        let out = simulate(&cal, &[table], 0..4, &params).unwrap();

        let stop = out
            .trades
            .iter()
            .find(|t| t.side == TradeSide::SellStop)
            .expect("stop must fire");
        // 15 shares × 0.05 = 0.75 < 50 fee → clamped, no negative cash inflow.
        assert!(stop.notional < params.fee_per_trade);
        let cash_after = out.equity_curve[2].cash;
        let cash_before = out.equity_curve[1].cash;
        assert!((cash_after - cash_before).abs() < 1e-9);
    }

    #[test]
    fn held_symbol_is_not_reentered() {
        let cal = dates(10);
        let tables = vec![flat_table("A", 10, 100.0, Some(90.0))];
        let out = simulate(&cal, &tables, 0..10, &zero_friction()).unwrap();
        let buys = out.trades.iter().filter(|t| t.side == TradeSide::Buy).count();
        assert_eq!(buys, 1);
    }

    #[test]
    fn terminal_positions_stay_open() {
        let cal = dates(5);
        let tables = vec![flat_table("A", 5, 100.0, Some(90.0))];
        let out = simulate(&cal, &tables, 0..5, &zero_friction()).unwrap();
        assert_eq!(out.open_positions.len(), 1);
        assert!(out.trades.iter().all(|t| t.side == TradeSide::Buy));
    }

    #[test]
    fn fresh_state_across_runs() {
        let cal = dates(10);
        let tables = vec![flat_table("A", 10, 100.0, Some(90.0))];
        let first = simulate(&cal, &tables, 0..10, &zero_friction()).unwrap();
        let second = simulate(&cal, &tables, 0..10, &zero_friction()).unwrap();
        assert_eq!(first.trades.len(), second.trades.len());
        assert_eq!(
            first.equity_curve.last().unwrap().equity,
            second.equity_curve.last().unwrap().equity
        );
    }
}
