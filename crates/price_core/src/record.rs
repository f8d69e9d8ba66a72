//! Raw historical records and inference queries

use serde::{Deserialize, Serialize};

pub const YEAR_OF_REFERENCE: &str = "year_of_reference";
pub const BRAND: &str = "brand";
pub const MODEL: &str = "model";
pub const FUEL: &str = "fuel";
pub const GEAR: &str = "gear";
pub const ENGINE_SIZE: &str = "engine_size";
pub const YEAR_MODEL: &str = "year_model";
pub const AVG_PRICE_BRL: &str = "avg_price_brl";

/// Columns the loader requires in the dataset header.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    YEAR_OF_REFERENCE,
    BRAND,
    MODEL,
    FUEL,
    GEAR,
    ENGINE_SIZE,
    YEAR_MODEL,
    AVG_PRICE_BRL,
];

/// One historical FIPE transaction.
///
/// Every field is optional because source cells may be empty or unparsable;
/// the encoder drops incomplete rows after fitting its vocabularies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub year_of_reference: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub fuel: Option<String>,
    pub gear: Option<String>,
    pub engine_size: Option<f64>,
    pub year_model: Option<i64>,
    pub avg_price_brl: Option<f64>,
}

impl RawRecord {
    /// Inference-time view of this record, if all query fields are present.
    pub fn to_query(&self) -> Option<CarQuery> {
        Some(CarQuery {
            year_of_reference: self.year_of_reference?,
            brand: self.brand.clone()?,
            model: self.model.clone()?,
            fuel: self.fuel.clone()?,
            gear: self.gear.clone()?,
            engine_size: self.engine_size?,
            year_model: self.year_model?,
        })
    }
}

/// The attributes a caller supplies to obtain a price estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarQuery {
    pub year_of_reference: i64,
    pub brand: String,
    pub model: String,
    pub fuel: String,
    pub gear: String,
    pub engine_size: f64,
    pub year_model: i64,
}
