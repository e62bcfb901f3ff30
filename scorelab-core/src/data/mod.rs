//! Data loading: provider trait, concrete providers, universe alignment.

pub mod csv;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use csv::CsvProvider;
pub use provider::{DataError, DataProvider, FetchResult, RawBar};
pub use universe::{load_universe, LoadError, UniverseData, MIN_BENCHMARK_DAYS};
pub use yahoo::YahooProvider;
