//! Typed property filters

use heatgis_core::{AttributeValue, Error, Feature, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Test applied to one property
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Property equals the literal
    Eq(AttributeValue),
    /// Property equals any of the literals
    In(Vec<AttributeValue>),
}

impl FilterClause {
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        match self {
            FilterClause::Eq(lit) => value.matches(lit),
            FilterClause::In(lits) => lits.iter().any(|lit| value.matches(lit)),
        }
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterClause::Eq(v) => write!(f, "== {v}"),
            FilterClause::In(vs) => {
                let items: Vec<String> = vs.iter().map(ToString::to_string).collect();
                write!(f, "in [{}]", items.join(", "))
            }
        }
    }
}

/// Conjunction of per-property clauses.
///
/// A clause whose property appears nowhere in the source is skipped. When
/// the property exists in the source, records lacking it do not match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    clauses: BTreeMap<String, FilterClause>,
}

impl PropertyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key == value`
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.clauses.insert(key.into(), FilterClause::Eq(value.into()));
        self
    }

    /// Require `key` to be one of `values`
    pub fn one_of<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses.insert(key.into(), FilterClause::In(values));
        self
    }

    /// Parse `{property: scalar}` or `{property: [scalar, ...]}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            Error::invalid_parameter("filter", value, "expected an object of property: value")
        })?;

        let mut filter = Self::new();
        for (key, literal) in obj {
            let clause = match literal {
                Value::Array(items) => FilterClause::In(
                    items
                        .iter()
                        .map(|item| scalar_literal(key, item))
                        .collect::<Result<_>>()?,
                ),
                other => FilterClause::Eq(scalar_literal(key, other)?),
            };
            filter.clauses.insert(key.clone(), clause);
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &FilterClause)> {
        self.clauses.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Per-record selection mask. `keys` is the source-wide property key set.
    pub fn select(&self, features: &[Feature], keys: &BTreeSet<String>) -> Vec<bool> {
        let active: Vec<(&str, &FilterClause)> = self
            .clauses()
            .filter(|(key, _)| keys.contains(*key))
            .collect();

        features
            .iter()
            .map(|feature| {
                active.iter().all(|(key, clause)| {
                    feature
                        .get_property(key)
                        .is_some_and(|value| clause.accepts(value))
                })
            })
            .collect()
    }
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|(k, c)| format!("{k} {c}"))
            .collect();
        f.write_str(&parts.join(" and "))
    }
}

fn scalar_literal(key: &str, value: &Value) -> Result<AttributeValue> {
    match value {
        Value::Null | Value::Object(_) | Value::Array(_) => Err(Error::invalid_parameter(
            "filter",
            format!("{key}={value}"),
            "filter literals must be strings, numbers or booleans",
        )),
        scalar => Ok(AttributeValue::from_json(scalar)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;
    use serde_json::json;

    fn features() -> Vec<Feature> {
        vec![
            Feature::new(point!(x: 0.0, y: 0.0)).with_property("kind", "substation").with_property("kv", 132i64),
            Feature::new(point!(x: 1.0, y: 0.0)).with_property("kind", "tower").with_property("kv", 66.0),
            Feature::new(point!(x: 2.0, y: 0.0)).with_property("kv", 132.0),
        ]
    }

    fn keys(features: &[Feature]) -> BTreeSet<String> {
        features.iter().flat_map(|f| f.properties.keys().cloned()).collect()
    }

    #[test]
    fn test_equality_and_membership() {
        let fs = features();
        let k = keys(&fs);

        let eq = PropertyFilter::new().eq("kind", "tower");
        assert_eq!(eq.select(&fs, &k), vec![false, true, false]);

        let member = PropertyFilter::new().one_of("kv", [132i64, 220]);
        assert_eq!(member.select(&fs, &k), vec![true, false, true]);
    }

    #[test]
    fn test_absent_key_is_noop() {
        let fs = features();
        let k = keys(&fs);
        let f = PropertyFilter::new().eq("operator", "acme").eq("kind", "substation");
        assert_eq!(f.select(&fs, &k), vec![true, false, false]);
    }

    #[test]
    fn test_from_json() {
        let f = PropertyFilter::from_json(&json!({"kind": ["tower", "pole"], "kv": 66})).unwrap();
        let fs = features();
        assert_eq!(f.select(&fs, &keys(&fs)), vec![false, true, false]);

        assert!(PropertyFilter::from_json(&json!({"kind": null})).is_err());
        assert!(PropertyFilter::from_json(&json!({"kind": {"a": 1}})).is_err());
        assert!(PropertyFilter::from_json(&json!(["kind"])).is_err());
    }
}
