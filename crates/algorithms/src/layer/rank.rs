//! Categorical rank divisors

use heatgis_core::{AttributeValue, Error, Result};
use std::collections::BTreeMap;

/// Category -> rank. Each contribution is divided by its record's rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankTable {
    ranks: BTreeMap<String, f64>,
}

impl RankTable {
    /// Build a table. Ranks must be finite and positive.
    pub fn new(ranks: BTreeMap<String, f64>) -> Result<Self> {
        if let Some((category, rank)) = ranks.iter().find(|(_, r)| !(r.is_finite() && **r > 0.0)) {
            return Err(Error::invalid_parameter(
                "rank_table",
                format!("{category}={rank}"),
                "ranks must be finite and > 0",
            ));
        }
        Ok(Self { ranks })
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.ranks
    }

    /// Divisor for a category value; 1 when the value is missing or unlisted.
    pub fn divisor(&self, value: Option<&AttributeValue>) -> f64 {
        value
            .and_then(AttributeValue::category_key)
            .and_then(|key| self.ranks.get(&key).copied())
            .unwrap_or(1.0)
    }
}
