//! Label vocabularies for high-cardinality categorical fields
//!
//! A vocabulary is built once by [`Vocabulary::fit`] and never mutated
//! afterwards. Indices follow first-seen order during that single pass, and
//! the persisted form is just the ordered list of values, so indices survive
//! a save/load cycle unchanged.

use crate::errors::{PriceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered bijection between categorical values and dense indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    values: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary assigning indices by first appearance
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vocab = Self {
            values: Vec::new(),
            index: HashMap::new(),
        };
        for value in values {
            if !vocab.index.contains_key(value) {
                vocab.index.insert(value.to_string(), vocab.values.len());
                vocab.values.push(value.to_string());
            }
        }
        vocab
    }

    /// Index of `value`, if it was seen during fitting
    pub fn lookup(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Index of `value`, or `UnknownCategory` naming `field`
    pub fn encode(&self, field: &'static str, value: &str) -> Result<usize> {
        self.lookup(value).ok_or_else(|| PriceError::UnknownCategory {
            field,
            value: value.to_string(),
        })
    }

    /// Value stored at `index`
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in index order
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(values: Vec<String>) -> std::result::Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            if index.insert(value.clone(), i).is_some() {
                return Err(format!("duplicate vocabulary entry: {value:?}"));
            }
        }
        Ok(Self { values, index })
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.values
    }
}
