//! End-of-day portfolio snapshots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point on the equity curve: total equity after the day's exits and
/// entries, with cash and open-position count for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    /// Cash + mark-to-market value of all open positions at the close.
    pub equity: f64,
    pub cash: f64,
    pub open_positions: usize,
}
