//! Flat serde form of a layer, as found in job files and requests

use super::{AggregationMode, LayerSpec, PropertyFilter, RankTable};
use crate::decay::DecayParams;
use heatgis_core::{Error, GeometryFamily, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn one() -> f64 {
    1.0
}

fn default_decay() -> String {
    "exp".to_string()
}

fn default_k() -> usize {
    8
}

/// JSON layer declaration.
///
/// ```json
/// {"source_id": "power", "geometry_family": "point", "mode": "sum_k",
///  "filter": {"power": ["substation", "plant"]}, "weight_property": "voltage",
///  "dataset_weight": 0.5, "decay_kind": "exp", "decay_params": {"scale": 2000}, "k": 4}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub source_id: String,
    #[serde(alias = "geometry_type")]
    pub geometry_family: String,
    pub mode: String,
    #[serde(default, alias = "filter_property", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_property: Option<String>,
    #[serde(default = "one")]
    pub dataset_weight: f64,
    #[serde(default = "default_decay", alias = "decay")]
    pub decay_kind: String,
    #[serde(default)]
    pub decay_params: Option<DecayParams>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "one")]
    pub mask_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_table: Option<BTreeMap<String, f64>>,
}

impl LayerConfig {
    /// Parse a single layer from JSON text; a malformed declaration is a
    /// configuration error.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::invalid_parameter("layer", "<json>", e.to_string()))
    }
}

impl TryFrom<LayerConfig> for LayerSpec {
    type Error = Error;

    fn try_from(cfg: LayerConfig) -> Result<Self> {
        let family: GeometryFamily = cfg.geometry_family.parse()?;
        let mode: AggregationMode =
            cfg.mode
                .parse()
                .map_err(|_| Error::UnsupportedEvaluation {
                    family: family.to_string(),
                    mode: cfg.mode.clone(),
                })?;

        let mut builder = LayerSpec::builder(cfg.source_id, family, mode)
            .dataset_weight(cfg.dataset_weight)
            .decay(cfg.decay_kind, cfg.decay_params.unwrap_or_default())
            .k(cfg.k)
            .mask_value(cfg.mask_value);

        if let Some(filter) = cfg.filter.filter(|v| !v.is_null()) {
            builder = builder.filter(PropertyFilter::from_json(&filter)?);
        }
        if let Some(weight) = cfg.weight_property {
            builder = builder.weight_property(weight);
        }
        match (cfg.rank_property, cfg.rank_table) {
            (Some(property), Some(table)) => {
                builder = builder.rank(property, RankTable::new(table)?);
            }
            (None, None) => {}
            _ => {
                return Err(Error::invalid_parameter(
                    "rank_property",
                    "",
                    "rank_property and rank_table must be given together",
                ))
            }
        }

        builder.build()
    }
}

impl From<&LayerSpec> for LayerConfig {
    fn from(spec: &LayerSpec) -> Self {
        use crate::decay::DecayKernel;

        let decay_params: DecayParams = match *spec.decay() {
            DecayKernel::Inverse { eps, power } => {
                [("eps".to_string(), eps), ("power".to_string(), power)].into()
            }
            DecayKernel::Exponential { scale } => [("scale".to_string(), scale)].into(),
            DecayKernel::LinearCutoff { radius } => [("radius".to_string(), radius)].into(),
        };

        let filter = (!spec.filter().is_empty()).then(|| {
            let obj: serde_json::Map<String, Value> = spec
                .filter()
                .clauses()
                .map(|(key, clause)| {
                    let v = match clause {
                        super::FilterClause::Eq(lit) => literal_json(lit),
                        super::FilterClause::In(lits) => {
                            Value::Array(lits.iter().map(literal_json).collect())
                        }
                    };
                    (key.to_string(), v)
                })
                .collect();
            Value::Object(obj)
        });

        Self {
            source_id: spec.source_id().to_string(),
            geometry_family: spec.family().to_string(),
            mode: spec.mode().to_string(),
            filter,
            weight_property: spec.weight_property().map(str::to_string),
            dataset_weight: spec.dataset_weight(),
            decay_kind: spec.decay().name().to_string(),
            decay_params: Some(decay_params),
            k: spec.k(),
            mask_value: spec.mask_value(),
            rank_property: spec.rank().map(|r| r.property.clone()),
            rank_table: spec.rank().map(|r| r.table.as_map().clone()),
        }
    }
}

fn literal_json(value: &heatgis_core::AttributeValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::DecayKernel;
    use crate::layer::Evaluation;
    use heatgis_core::ErrorKind;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = LayerConfig::from_json(
            r#"{"source_id": "water", "geometry_family": "polygon", "mode": "mask"}"#,
        )
        .unwrap();
        let spec = LayerSpec::try_from(cfg).unwrap();
        assert_eq!(spec.evaluation(), Evaluation::PolygonMask { mask_value: 1.0 });
        assert_eq!(spec.dataset_weight(), 1.0);
        assert_eq!(spec.k(), 8);
        assert_eq!(*spec.decay(), DecayKernel::Exponential { scale: 1000.0 });
    }

    #[test]
    fn test_aliases() {
        let cfg = LayerConfig::from_json(
            r#"{"source_id": "power", "geometry_type": "point", "mode": "sum_k",
                "filter_property": {"power": ["substation", "plant"]},
                "weight_property": "voltage", "dataset_weight": -0.5,
                "decay": "inverse", "decay_params": {"eps": 10, "power": 2}, "k": 3}"#,
        )
        .unwrap();
        let spec = LayerSpec::try_from(cfg).unwrap();
        assert_eq!(spec.evaluation(), Evaluation::PointSumK { k: 3 });
        assert_eq!(spec.weight_property(), Some("voltage"));
        assert_eq!(spec.dataset_weight(), -0.5);
        assert_eq!(*spec.decay(), DecayKernel::Inverse { eps: 10.0, power: 2.0 });
        assert!(!spec.filter().is_empty());
    }

    #[test]
    fn test_config_errors_are_config_kind() {
        let cases = [
            r#"{"source_id": "a", "geometry_family": "line", "mode": "mask"}"#,
            r#"{"source_id": "a", "geometry_family": "point", "mode": "kriging"}"#,
            r#"{"source_id": "a", "geometry_family": "point", "mode": "sum_k", "k": 0}"#,
            r#"{"source_id": "a", "geometry_family": "point", "mode": "nearest", "filter": {"x": null}}"#,
            r#"{"source_id": "a", "geometry_family": "point", "mode": "nearest", "rank_property": "c"}"#,
            r#"{"source_id": "a", "geometry_family": "point", "mode": "nearest",
                "rank_property": "c", "rank_table": {"x": -1}}"#,
        ];
        for text in cases {
            let cfg = LayerConfig::from_json(text).unwrap();
            let err = LayerSpec::try_from(cfg).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{text}: {err}");
        }
    }

    #[test]
    fn test_malformed_layer_json_is_config_kind() {
        let cases = [
            r#"{"source_id": "a", "geometry_family": "point", "mode": "sum_k", "k": -1}"#,
            r#"{"geometry_family": "point", "mode": "nearest"}"#,
            r#"{"source_id": "a", "geometry_family": "point", "mode": "nearest", "dataset_weight": "x"}"#,
            "not json",
        ];
        for text in cases {
            let err = LayerConfig::from_json(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{text}: {err}");
            assert!(matches!(err, Error::InvalidParameter { name: "layer", .. }));
        }
    }

    #[test]
    fn test_spec_to_config_round_trip() {
        let cfg = LayerConfig::from_json(
            r#"{"source_id": "roads", "geometry_family": "line", "mode": "nearest",
                "filter": {"highway": "primary"}, "decay_kind": "linear",
                "decay_params": {"radius": 500}}"#,
        )
        .unwrap();
        let spec = LayerSpec::try_from(cfg).unwrap();
        let back = LayerSpec::try_from(LayerConfig::from(&spec)).unwrap();
        assert_eq!(spec, back);
    }
}
