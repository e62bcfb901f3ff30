//! CSV file data provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a `date,open,high,low,close,volume`
//! header, dates as `YYYY-MM-DD`. The offline counterpart to the Yahoo
//! provider; handy for tests and reproducible runs.

use super::provider::{normalize_bars, DataError, DataProvider, FetchResult, RawBar};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Directory-of-CSV-files data provider.
pub struct CsvProvider {
    base_dir: PathBuf,
}

impl CsvProvider {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_dir.join(format!("{symbol}.csv"))
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| DataError::MalformedData {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;
        let mut bars = Vec::new();

        for result in rdr.deserialize::<CsvRow>() {
            let row = result.map_err(|e| DataError::MalformedData {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                DataError::MalformedData {
                    symbol: symbol.to_string(),
                    reason: format!("invalid date '{}': {e}", row.date),
                }
            })?;

            if date < start || date > end {
                continue;
            }

            bars.push(RawBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: normalize_bars(bars),
        })
    }
}
