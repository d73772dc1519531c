//! Market data: in-memory OHLCV series and the CSV loader.

pub mod loader;
pub mod series;

pub use loader::{load_csv, load_csv_reader, write_csv, DataError};
pub use series::MarketSeries;
