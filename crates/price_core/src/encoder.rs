//! Feature encoding for training (fit) and inference (transform)
//!
//! Columns produced, in schema order:
//! 0. `year_of_reference` (whole years, fixed-point)
//! 1. `engine_size` (litres, fixed-point)
//! 2. `year_model` (whole years, fixed-point)
//! 3. `brand_encoded` (vocabulary index, fixed-point)
//! 4. `model_encoded` (vocabulary index, fixed-point)
//! 5. `fuel_<value>` indicators, one per fuel observed in training, sorted
//! 6. `gear_<value>` indicators, one per gear observed in training, sorted

use crate::errors::{PriceError, Result};
use crate::fixed::{self, ONE};
use crate::record::{CarQuery, RawRecord, ENGINE_SIZE, YEAR_MODEL, YEAR_OF_REFERENCE};
use crate::schema::{
    one_hot_column, FeatureSchema, NamedFeatures, BRAND_ENCODED, FUEL_PREFIX, GEAR_PREFIX,
    MODEL_ENCODED,
};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Numeric columns copied straight into the feature matrix
pub const NUMERIC_COLUMNS: [&str; 3] = [YEAR_OF_REFERENCE, ENGINE_SIZE, YEAR_MODEL];

/// Vocabularies and schema produced by a single fitting pass.
///
/// Immutable once built; every transform borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FittedEncoder {
    pub brands: Vocabulary,
    pub models: Vocabulary,
    pub schema: FeatureSchema,
}

/// Output of fit mode: encoded matrix, targets and the fitted encoder
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub encoder: FittedEncoder,
    /// Rows aligned to `encoder.schema`
    pub features: Vec<Vec<i64>>,
    /// `avg_price_brl` per row, fixed-point
    pub targets: Vec<i64>,
    /// Rows discarded for missing or unparsable values
    pub rows_dropped: usize,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Fit vocabularies and one-hot categories on `records`, then encode them.
pub fn fit(records: &[RawRecord]) -> Result<EncodedDataset> {
    let fuels: BTreeSet<&str> = records.iter().filter_map(|r| r.fuel.as_deref()).collect();
    let gears: BTreeSet<&str> = records.iter().filter_map(|r| r.gear.as_deref()).collect();
    let brands = Vocabulary::fit(records.iter().filter_map(|r| r.brand.as_deref()));
    let models = Vocabulary::fit(records.iter().filter_map(|r| r.model.as_deref()));

    let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push(BRAND_ENCODED.to_string());
    columns.push(MODEL_ENCODED.to_string());
    columns.extend(fuels.iter().map(|f| one_hot_column(FUEL_PREFIX, f)));
    columns.extend(gears.iter().map(|g| one_hot_column(GEAR_PREFIX, g)));

    let encoder = FittedEncoder {
        brands,
        models,
        schema: FeatureSchema::new(columns)?,
    };

    let mut features = Vec::with_capacity(records.len());
    let mut targets = Vec::with_capacity(records.len());
    let mut rows_dropped = 0usize;

    for record in records {
        let target = record.avg_price_brl.and_then(fixed::to_fixed);
        let (Some(fields), Some(target)) = (Fields::from_record(record), target) else {
            rows_dropped += 1;
            continue;
        };
        match encoder.named(&fields) {
            Ok(named) => {
                let row = encoder.schema.align(&named);
                features.push(row);
                targets.push(target);
            }
            Err(PriceError::InvalidInput(reason)) => {
                debug!(%reason, "dropping row");
                rows_dropped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    if rows_dropped > 0 {
        warn!(
            rows_dropped,
            rows_kept = features.len(),
            "dropped rows with missing values"
        );
    }

    if features.is_empty() {
        return Err(PriceError::Training(
            "no complete rows left after encoding".to_string(),
        ));
    }

    info!(
        rows = features.len(),
        columns = encoder.schema.len(),
        brands = encoder.brands.len(),
        models = encoder.models.len(),
        "fitted feature encoder"
    );

    Ok(EncodedDataset {
        encoder,
        features,
        targets,
        rows_dropped,
    })
}

/// Borrowed encoder inputs; an absent fuel or gear encodes as an all-zero group
struct Fields<'a> {
    year_of_reference: i64,
    brand: &'a str,
    model: &'a str,
    fuel: Option<&'a str>,
    gear: Option<&'a str>,
    engine_size: f64,
    year_model: i64,
}

impl<'a> Fields<'a> {
    fn from_query(query: &'a CarQuery) -> Self {
        Self {
            year_of_reference: query.year_of_reference,
            brand: &query.brand,
            model: &query.model,
            fuel: Some(query.fuel.as_str()),
            gear: Some(query.gear.as_str()),
            engine_size: query.engine_size,
            year_model: query.year_model,
        }
    }

    /// Fit-mode view of a record; `None` if a non-indicator field is missing
    fn from_record(record: &'a RawRecord) -> Option<Self> {
        Some(Self {
            year_of_reference: record.year_of_reference?,
            brand: record.brand.as_deref()?,
            model: record.model.as_deref()?,
            fuel: record.fuel.as_deref(),
            gear: record.gear.as_deref(),
            engine_size: record.engine_size?,
            year_model: record.year_model?,
        })
    }
}

fn whole(field: &str, value: i64) -> Result<i64> {
    fixed::from_integer(value)
        .ok_or_else(|| PriceError::InvalidInput(format!("{field} {value} is out of range")))
}

impl FittedEncoder {
    /// Encode one query into named columns using the fitted vocabularies.
    ///
    /// The one-hot groups contain only the query's own fuel and gear; the
    /// schema aligner supplies the remaining zeros.
    pub fn transform(&self, query: &CarQuery) -> Result<NamedFeatures> {
        self.named(&Fields::from_query(query))
    }

    fn named(&self, fields: &Fields<'_>) -> Result<NamedFeatures> {
        let brand = self.brands.encode("brand", fields.brand)?;
        let model = self.models.encode("model", fields.model)?;
        let engine_size = fixed::to_fixed(fields.engine_size).ok_or_else(|| {
            PriceError::InvalidInput(format!("engine_size {} is not finite", fields.engine_size))
        })?;

        let mut features = NamedFeatures::new();
        features.insert(
            YEAR_OF_REFERENCE.to_string(),
            whole(YEAR_OF_REFERENCE, fields.year_of_reference)?,
        );
        features.insert(ENGINE_SIZE.to_string(), engine_size);
        features.insert(YEAR_MODEL.to_string(), whole(YEAR_MODEL, fields.year_model)?);
        features.insert(BRAND_ENCODED.to_string(), whole(BRAND_ENCODED, brand as i64)?);
        features.insert(MODEL_ENCODED.to_string(), whole(MODEL_ENCODED, model as i64)?);
        if let Some(fuel) = fields.fuel {
            features.insert(one_hot_column(FUEL_PREFIX, fuel), ONE);
        }
        if let Some(gear) = fields.gear {
            features.insert(one_hot_column(GEAR_PREFIX, gear), ONE);
        }

        Ok(features)
    }

    /// Transform and align to the frozen schema
    pub fn encode(&self, query: &CarQuery) -> Result<Vec<i64>> {
        let named = self.transform(query)?;
        Ok(self.schema.align(&named))
    }

    /// Check the encoder is internally consistent
    pub fn validate(&self) -> std::result::Result<(), String> {
        for column in NUMERIC_COLUMNS
            .iter()
            .chain([BRAND_ENCODED, MODEL_ENCODED].iter())
        {
            if !self.schema.contains(column) {
                return Err(format!("schema is missing column {column}"));
            }
        }
        Ok(())
    }
}
