//! Delimited dataset loading and exact-duplicate removal
//!
//! The FIPE export is not UTF-8, so the loader decodes the file with an
//! explicit encoding before handing it to the CSV reader. Rows are kept as
//! strings until the encoder asks for typed records, which means duplicate
//! detection compares every column, including the ones the model ignores.

use crate::errors::{PriceError, Result};
use crate::record::{self, RawRecord, REQUIRED_COLUMNS};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default encoding label of the FIPE export
pub const DEFAULT_ENCODING: &str = "latin1";

/// Reads a delimited table with an explicit character encoding
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    encoding: &'static Encoding,
    delimiter: u8,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::WINDOWS_1252,
            delimiter: b',',
        }
    }
}

impl DatasetLoader {
    /// Create a loader for a WHATWG encoding label (e.g. `latin1`, `utf-8`)
    pub fn new(encoding_label: &str, delimiter: u8) -> Result<Self> {
        let encoding = Encoding::for_label(encoding_label.trim().as_bytes()).ok_or_else(|| {
            PriceError::Dataset(format!("unknown character encoding: {encoding_label}"))
        })?;
        Ok(Self {
            encoding,
            delimiter,
        })
    }

    /// Name of the resolved encoding
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Load a dataset file and remove exact duplicate rows
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => PriceError::DatasetNotFound(path.to_path_buf()),
            _ => PriceError::Io(err),
        })?;

        let dataset = self.parse_bytes(&bytes)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            duplicates_removed = dataset.duplicates_removed(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Decode and parse raw file contents
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Dataset> {
        let (text, used, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            warn!(
                encoding = used.name(),
                "dataset contained byte sequences invalid for the configured encoding"
            );
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let columns = ColumnIndex::resolve(&headers)?;

        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            rows.push(row.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let mut dataset = Dataset {
            headers,
            rows,
            columns,
            duplicates_removed: 0,
            fingerprint: hex::encode(blake3::hash(bytes).as_bytes()),
            encoding: self.encoding.name(),
            delimiter: self.delimiter,
        };
        let rows_read = dataset.len();
        dataset.duplicates_removed = dataset.deduplicate();
        debug!(
            rows_read,
            duplicates_removed = dataset.duplicates_removed,
            "deduplicated dataset"
        );

        Ok(dataset)
    }
}

/// Positions of the required columns inside a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    year_of_reference: usize,
    brand: usize,
    model: usize,
    fuel: usize,
    gear: usize,
    engine_size: usize,
    year_model: usize,
    avg_price_brl: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| !headers.iter().any(|h| h == name))
            .collect();
        if !missing.is_empty() {
            return Err(PriceError::Dataset(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let find = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
        Ok(Self {
            year_of_reference: find(record::YEAR_OF_REFERENCE),
            brand: find(record::BRAND),
            model: find(record::MODEL),
            fuel: find(record::FUEL),
            gear: find(record::GEAR),
            engine_size: find(record::ENGINE_SIZE),
            year_model: find(record::YEAR_MODEL),
            avg_price_brl: find(record::AVG_PRICE_BRL),
        })
    }
}

/// Cleaned tabular dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: ColumnIndex,
    duplicates_removed: usize,
    fingerprint: String,
    encoding: &'static str,
    delimiter: u8,
}

impl Dataset {
    /// Remove exact duplicate rows, keeping the first occurrence in order.
    ///
    /// Returns the number of rows removed by this call.
    pub fn deduplicate(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Number of rows after deduplication
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row as read from the file
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Duplicates removed when the dataset was loaded
    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// BLAKE3 hex digest of the raw file bytes
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Name of the encoding the file was decoded with
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Typed view of every row; unparsable cells become `None`
    pub fn records(&self) -> Vec<RawRecord> {
        self.rows.iter().map(|row| self.record_at(row)).collect()
    }

    fn record_at(&self, row: &[String]) -> RawRecord {
        let c = &self.columns;
        let cell = |idx: usize| {
            row.get(idx)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
        };

        RawRecord {
            year_of_reference: cell(c.year_of_reference).and_then(parse_int),
            brand: cell(c.brand).map(str::to_string),
            model: cell(c.model).map(str::to_string),
            fuel: cell(c.fuel).map(str::to_string),
            gear: cell(c.gear).map(str::to_string),
            engine_size: cell(c.engine_size).and_then(parse_float),
            year_model: cell(c.year_model).and_then(parse_int),
            avg_price_brl: cell(c.avg_price_brl).and_then(parse_float),
        }
    }

    /// Values a caller can offer for each query field
    pub fn choice_lists(&self) -> ChoiceLists {
        let records = self.records();

        let year_range = records
            .iter()
            .filter_map(|r| r.year_model)
            .fold(None, |acc: Option<(i64, i64)>, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            });

        let engine_range = records
            .iter()
            .filter_map(|r| r.engine_size)
            .fold(None, |acc: Option<(f64, f64)>, e| match acc {
                None => Some((e, e)),
                Some((lo, hi)) => Some((lo.min(e), hi.max(e))),
            });

        ChoiceLists {
            brands: sorted_unique(records.iter().filter_map(|r| r.brand.as_ref())),
            fuels: sorted_unique(records.iter().filter_map(|r| r.fuel.as_ref())),
            gears: sorted_unique(records.iter().filter_map(|r| r.gear.as_ref())),
            year_range,
            engine_range,
        }
    }

    /// Sorted unique models sold under `brand`
    pub fn models_for_brand(&self, brand: &str) -> Vec<String> {
        let records = self.records();
        sorted_unique(
            records
                .iter()
                .filter(|r| r.brand.as_deref() == Some(brand))
                .filter_map(|r| r.model.as_ref()),
        )
    }
}

/// Choice lists offered to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceLists {
    pub brands: Vec<String>,
    pub fuels: Vec<String>,
    pub gears: Vec<String>,
    /// (min, max) of `year_model`
    pub year_range: Option<(i64, i64)>,
    /// (min, max) of `engine_size`
    pub engine_range: Option<(f64, f64)>,
}

fn sorted_unique<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

fn parse_int(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        // pandas exports whole-number columns with NaNs as floats ("2019.0")
        let f = s.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    })
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}
