//! Domain types for ScoreLab.

pub mod bar;
pub mod equity;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use equity::EquitySnapshot;
pub use position::Position;
pub use trade::{TradeRecord, TradeSide};
