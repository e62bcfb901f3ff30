//! Per-symbol daily score tables, precomputed before the day loop.
//!
//! Features and scores are pure per symbol, so table construction fans out
//! across symbols with rayon. The simulator only ever reads these tables.

use crate::data::UniverseData;
use crate::features::{compute_features, FeatureRow};
use crate::scoring::score_row;
use rayon::prelude::*;

/// One symbol's aligned daily series: opens and closes for execution and
/// marking, features and scores for the entry signal. All vectors share
/// the universe calendar's length.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    pub symbol: String,
    pub opens: Vec<f64>,
    pub closes: Vec<f64>,
    pub features: Vec<FeatureRow>,
    /// Conviction score per date; `None` where features are undefined.
    pub scores: Vec<Option<f64>>,
}

/// Build score tables for every usable symbol, sorted by symbol so that
/// candidate ordering is deterministic on score ties.
pub fn build_tables(universe: &UniverseData) -> Vec<SymbolTable> {
    let mut tables: Vec<SymbolTable> = universe
        .symbols
        .par_iter()
        .map(|symbol| {
            let bars = &universe.bars[symbol];
            let features = compute_features(bars);
            let scores = features.iter().map(score_row).collect();
            SymbolTable {
                symbol: symbol.clone(),
                opens: bars.iter().map(|b| b.open).collect(),
                closes: bars.iter().map(|b| b.close).collect(),
                features,
                scores,
            }
        })
        .collect();

    tables.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    tables
}
