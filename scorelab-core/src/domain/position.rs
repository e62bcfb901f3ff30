//! Open position tracking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An open holding inside one simulation run.
///
/// Owned exclusively by the simulator's mutable state; never shared across
/// runs. Quantity is a whole share count (fractional shares are truncated
/// at entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    /// Fill price including entry slippage.
    pub entry_price: f64,
    pub entry_date: NaiveDate,
}

impl Position {
    /// Mark-to-market value at a given close.
    pub fn market_value(&self, close: f64) -> f64 {
        self.quantity as f64 * close
    }

    /// The close at or below which the stop-loss fires.
    pub fn stop_level(&self, stop_loss_pct: f64) -> f64 {
        self.entry_price * (1.0 - stop_loss_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            symbol: "AAPL".into(),
            quantity: 10,
            entry_price: 100.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        }
    }

    #[test]
    fn market_value_at_close() {
        assert!((sample_position().market_value(103.5) - 1035.0).abs() < 1e-10);
    }

    #[test]
    fn stop_level_at_8_pct() {
        assert!((sample_position().stop_level(0.08) - 92.0).abs() < 1e-10);
    }
}
