//! CSV loader for the canonical OHLCV shape.
//!
//! Header: `timestamp,open,high,low,close,volume`, dates in `YYYY-MM-DD`.
//! Rows that fail to parse or violate bar invariants are skipped with a
//! warning; the load succeeds as long as at least one bar parsed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::series::MarketSeries;
use crate::domain::Bar;
use crate::error::BacktestError;

const HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Load a series from a CSV file on disk.
pub fn load_csv(path: impl AsRef<Path>) -> Result<MarketSeries, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_csv_reader(file)
}

/// Load a series from any byte stream of the canonical CSV shape.
pub fn load_csv_reader(reader: impl Read) -> Result<MarketSeries, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for record in csv_reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "skipping unreadable CSV record");
                skipped += 1;
                continue;
            }
        };
        match parse_row(&record) {
            Ok(bar) => bars.push(bar),
            Err(reason) => {
                warn!(row = %record.iter().collect::<Vec<_>>().join(","), %reason, "skipping malformed CSV row");
                skipped += 1;
            }
        }
    }

    if bars.is_empty() {
        return Err(DataError::NoRows { skipped });
    }

    debug!(loaded = bars.len(), skipped, "market data loaded");
    Ok(MarketSeries::new(bars))
}

fn parse_row(record: &csv::StringRecord) -> Result<Bar, String> {
    if record.len() < 6 {
        return Err(format!("expected 6 fields, got {}", record.len()));
    }

    let timestamp = parse_timestamp(record[0].trim())?;
    let open = parse_price("open", record[1].trim())?;
    let high = parse_price("high", record[2].trim())?;
    let low = parse_price("low", record[3].trim())?;
    let close = parse_price("close", record[4].trim())?;
    let volume: u64 = record[5]
        .trim()
        .parse()
        .map_err(|_| format!("bad volume: {:?}", &record[5]))?;

    let bar = Bar::new(timestamp, open, high, low, close, volume);
    bar.validate().map_err(|e| e.to_string())?;
    Ok(bar)
}

fn parse_timestamp(field: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .map_err(|_| format!("bad timestamp: {field:?}"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn parse_price(name: &str, field: &str) -> Result<f64, String> {
    field.parse().map_err(|_| format!("bad {name}: {field:?}"))
}

/// Re-emit a series in the canonical CSV shape.
///
/// f64 Display produces the shortest round-trippable representation, so a
/// written series reloads to an equal one.
pub fn write_csv(series: &MarketSeries, writer: impl std::io::Write) -> Result<(), DataError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER).map_err(DataError::from)?;
    for bar in series.bars() {
        csv_writer
            .write_record([
                bar.timestamp.format("%Y-%m-%d").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(DataError::from)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("could not open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("no parseable rows in CSV input ({skipped} skipped)")]
    NoRows { skipped: usize },

    #[error("CSV write failed: {0}")]
    Write(#[from] csv::Error),
}

impl From<DataError> for BacktestError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Io { source, .. } => BacktestError::Io(source),
            other => BacktestError::Parse(other.to_string()),
        }
    }
}
