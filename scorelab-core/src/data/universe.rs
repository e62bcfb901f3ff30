//! Universe loading and benchmark-calendar alignment.
//!
//! The benchmark's trading-date index is authoritative: every symbol is
//! reindexed onto it and forward-filled, so the simulator never special-cases
//! a symbol missing a date its peers traded. Dates before a symbol's first
//! print stay void (NaN) and propagate as undefined features downstream.

use super::provider::{DataError, DataProvider, RawBar};
use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// Minimum benchmark history for annualized risk metrics (one trading year).
pub const MIN_BENCHMARK_DAYS: usize = 252;

/// Errors that abort a load. Per-symbol failures are not here — they are
/// absorbed with a logged skip.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("benchmark fetch failed for '{symbol}': {source}")]
    BenchmarkFetch {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("benchmark '{symbol}' has {got} trading days, need at least {need}")]
    BenchmarkTooShort {
        symbol: String,
        got: usize,
        need: usize,
    },

    #[error("no usable symbols after loading (all {attempted} were skipped)")]
    NoUsableSymbols { attempted: usize },
}

/// All bars for one run, aligned to the benchmark calendar.
#[derive(Debug, Clone)]
pub struct UniverseData {
    /// The authoritative trading calendar (sorted ascending, deduped).
    pub calendar: Vec<NaiveDate>,
    /// Aligned bars per symbol; each inner Vec has `calendar.len()` entries.
    pub bars: HashMap<String, Vec<Bar>>,
    /// Usable symbols, sorted, excluding the benchmark.
    pub symbols: Vec<String>,
    pub benchmark_symbol: String,
    /// Benchmark closes on the calendar.
    pub benchmark_closes: Vec<f64>,
}

/// Fetch the benchmark plus the symbol universe and align everything to the
/// benchmark's calendar.
///
/// Fatal: benchmark unreachable/empty, benchmark shorter than
/// [`MIN_BENCHMARK_DAYS`], or zero usable symbols. A symbol whose fetch
/// fails or whose bars are malformed is dropped with a warning.
pub fn load_universe(
    provider: &dyn DataProvider,
    universe: &[String],
    benchmark: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<UniverseData, LoadError> {
    let bench = provider
        .fetch(benchmark, start, end)
        .map_err(|source| LoadError::BenchmarkFetch {
            symbol: benchmark.to_string(),
            source,
        })?;

    if bench.bars.len() < MIN_BENCHMARK_DAYS {
        return Err(LoadError::BenchmarkTooShort {
            symbol: benchmark.to_string(),
            got: bench.bars.len(),
            need: MIN_BENCHMARK_DAYS,
        });
    }

    let calendar: Vec<NaiveDate> = bench.bars.iter().map(|b| b.date).collect();
    let benchmark_closes: Vec<f64> = bench.bars.iter().map(|b| b.close).collect();

    let mut bars: HashMap<String, Vec<Bar>> = HashMap::new();
    let mut symbols: Vec<String> = Vec::new();

    for symbol in universe {
        if symbol == benchmark {
            continue;
        }
        match provider.fetch(symbol, start, end) {
            Ok(fetched) => match reindex(&fetched.bars, &calendar) {
                Ok(aligned) => {
                    bars.insert(symbol.clone(), aligned);
                    symbols.push(symbol.clone());
                }
                Err(reason) => {
                    warn!(symbol = %symbol, %reason, "skipping symbol: malformed history");
                }
            },
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol: fetch failed");
            }
        }
    }

    if symbols.is_empty() {
        return Err(LoadError::NoUsableSymbols {
            attempted: universe.len(),
        });
    }

    symbols.sort();
    info!(
        symbols = symbols.len(),
        days = calendar.len(),
        benchmark = %benchmark,
        "universe loaded"
    );

    Ok(UniverseData {
        calendar,
        bars,
        symbols,
        benchmark_symbol: benchmark.to_string(),
        benchmark_closes,
    })
}

/// Reindex one symbol's bars onto the calendar, forward-filling gaps.
///
/// Calendar dates before the symbol's first bar become void bars. A close
/// that is NaN on a real bar is treated as malformed.
fn reindex(raw: &[RawBar], calendar: &[NaiveDate]) -> Result<Vec<Bar>, String> {
    if raw.is_empty() {
        return Err("no rows".into());
    }

    let mut by_date: HashMap<NaiveDate, &RawBar> = HashMap::with_capacity(raw.len());
    for bar in raw {
        if bar.close.is_nan() || bar.close <= 0.0 {
            return Err(format!("non-positive or NaN close on {}", bar.date));
        }
        by_date.insert(bar.date, bar);
    }

    let mut aligned = Vec::with_capacity(calendar.len());
    let mut last: Option<Bar> = None;

    for &date in calendar {
        if let Some(raw_bar) = by_date.get(&date) {
            let bar = Bar {
                date,
                open: raw_bar.open,
                high: raw_bar.high,
                low: raw_bar.low,
                close: raw_bar.close,
                volume: raw_bar.volume,
            };
            last = Some(bar.clone());
            aligned.push(bar);
        } else if let Some(prev) = &last {
            // Forward-fill: carry the previous bar onto this date.
            let mut bar = prev.clone();
            bar.date = date;
            aligned.push(bar);
        } else {
            aligned.push(Bar::void(date));
        }
    }

    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{FetchResult, RawBar};
    use chrono::Duration;

    /// In-memory provider for tests.
    struct MapProvider {
        data: HashMap<String, Vec<RawBar>>,
    }

    impl DataProvider for MapProvider {
        fn name(&self) -> &str {
            "map"
        }
        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.data
                .get(symbol)
                .map(|bars| FetchResult {
                    symbol: symbol.to_string(),
                    bars: bars.clone(),
                })
                .ok_or_else(|| DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
        }
    }

    fn flat_bars(n: usize, close: f64) -> Vec<RawBar> {
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| RawBar {
                date: base + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[test]
    fn short_benchmark_is_fatal() {
        let mut data = HashMap::new();
        data.insert("SPY".to_string(), flat_bars(100, 400.0));
        data.insert("AAPL".to_string(), flat_bars(100, 150.0));
        let provider = MapProvider { data };
        let (start, end) = range();
        let err = load_universe(&provider, &["AAPL".to_string()], "SPY", start, end).unwrap_err();
        assert!(matches!(err, LoadError::BenchmarkTooShort { got: 100, .. }));
    }

    #[test]
    fn failed_symbol_is_skipped_not_fatal() {
        let mut data = HashMap::new();
        data.insert("SPY".to_string(), flat_bars(300, 400.0));
        data.insert("AAPL".to_string(), flat_bars(300, 150.0));
        let provider = MapProvider { data };
        let (start, end) = range();
        let universe = vec!["AAPL".to_string(), "GHOST".to_string()];
        let loaded = load_universe(&provider, &universe, "SPY", start, end).unwrap();
        assert_eq!(loaded.symbols, vec!["AAPL".to_string()]);
    }

    #[test]
    fn all_symbols_failing_is_fatal() {
        let mut data = HashMap::new();
        data.insert("SPY".to_string(), flat_bars(300, 400.0));
        let provider = MapProvider { data };
        let (start, end) = range();
        let universe = vec!["GHOST1".to_string(), "GHOST2".to_string()];
        let err = load_universe(&provider, &universe, "SPY", start, end).unwrap_err();
        assert!(matches!(err, LoadError::NoUsableSymbols { attempted: 2 }));
    }

    #[test]
    fn missing_dates_are_forward_filled() {
        let mut data = HashMap::new();
        data.insert("SPY".to_string(), flat_bars(300, 400.0));

        // AAPL missing the third calendar day.
        let mut aapl = flat_bars(300, 150.0);
        aapl.remove(2);
        data.insert("AAPL".to_string(), aapl);

        let provider = MapProvider { data };
        let (start, end) = range();
        let loaded =
            load_universe(&provider, &["AAPL".to_string()], "SPY", start, end).unwrap();

        let bars = &loaded.bars["AAPL"];
        assert_eq!(bars.len(), loaded.calendar.len());
        // Day 2 carries day 1's close forward onto the calendar date.
        assert_eq!(bars[2].close, 150.0);
        assert_eq!(bars[2].date, loaded.calendar[2]);
    }

    #[test]
    fn leading_gap_stays_void() {
        let mut data = HashMap::new();
        data.insert("SPY".to_string(), flat_bars(300, 400.0));

        // LATE starts trading 50 days into the calendar.
        let late: Vec<RawBar> = flat_bars(300, 80.0).split_off(50);
        data.insert("LATE".to_string(), late);

        let provider = MapProvider { data };
        let (start, end) = range();
        let loaded =
            load_universe(&provider, &["LATE".to_string()], "SPY", start, end).unwrap();

        let bars = &loaded.bars["LATE"];
        assert!(bars[0].is_void());
        assert!(bars[49].is_void());
        assert!(!bars[50].is_void());
    }
}
