//! Reading raw order records from files the host has already fetched

use crate::error::{ForecastError, Result};
use crate::events::RawOrderRecord;
use std::fs::File;
use std::io::Read;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// CSV row with every field kept as its verbatim text
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    segment: Option<String>,
}

impl From<CsvRow> for RawOrderRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            order_id: row.order_id,
            date: row.date,
            price: row.price,
            quantity: row.quantity,
            customer: row.customer,
            segment: row.segment,
        }
    }
}

/// Loader for raw order records in CSV or JSON form
pub struct RecordLoader;

impl RecordLoader {
    /// Load records from a CSV file with a header row
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawOrderRecord>> {
        let file = File::open(path.as_ref())?;
        let records = Self::from_csv_reader(file)?;
        debug!(path = %path.as_ref().display(), records = records.len(), "loaded CSV records");
        Ok(records)
    }

    /// Load records from any CSV source with a header row
    ///
    /// Identifiers such as `007` keep their leading zeros.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Vec<RawOrderRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for row in csv_reader.deserialize::<CsvRow>() {
            records.push(RawOrderRecord::from(row?));
        }
        Ok(records)
    }

    /// Load records from a JSON file holding an array of objects
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawOrderRecord>> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let records = Self::from_json_str(&contents)?;
        debug!(path = %path.as_ref().display(), records = records.len(), "loaded JSON records");
        Ok(records)
    }

    pub fn from_json_str(json: &str) -> Result<Vec<RawOrderRecord>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pick the format from the file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawOrderRecord>> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Self::from_csv_path(path),
            Some("json") => Self::from_json_path(path),
            _ => Err(ForecastError::DataError(format!(
                "Unsupported record file: {}",
                path.as_ref().display()
            ))),
        }
    }
}
