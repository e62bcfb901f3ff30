//! TradeRecord — an immutable record of a simulated fill.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Side of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    /// Forced exit through the stop-loss check.
    SellStop,
}

/// One fill in the trade ledger. Append-only; never mutated after the
/// simulator records it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u64,
    /// Execution price including slippage (fee is accounted in cash, not here).
    pub price: f64,
    pub notional: f64,
}

impl TradeRecord {
    pub fn new(
        date: NaiveDate,
        symbol: impl Into<String>,
        side: TradeSide,
        quantity: u64,
        price: f64,
    ) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            side,
            quantity,
            price,
            notional: quantity as f64 * price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notional_is_qty_times_price() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let t = TradeRecord::new(date, "MSFT", TradeSide::Buy, 12, 250.0);
        assert!((t.notional - 3000.0).abs() < 1e-10);
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let t = TradeRecord::new(date, "MSFT", TradeSide::SellStop, 12, 250.0);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("SELL_STOP"));
        let back: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbol, "MSFT");
        assert_eq!(back.side, TradeSide::SellStop);
    }
}
