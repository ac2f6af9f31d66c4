//! Declarative layer descriptions
//!
//! A [`LayerSpec`] names a source, a geometry family and an aggregation
//! mode, plus the filter, weighting and decay settings that shape its
//! per-cell values. The `(family, mode)` pair is resolved into a closed
//! [`Evaluation`] when a `LayerSpec` is built, so unsupported combinations never
//! reach the evaluators.

mod config;
mod filter;
mod rank;

pub use config::LayerConfig;
pub use filter::{FilterClause, PropertyFilter};
pub use rank::RankTable;

use crate::decay::{DecayKernel, DecayParams};
use heatgis_core::{Error, GeometryFamily, Result};
use std::fmt;
use std::str::FromStr;

/// Aggregation mode as declared by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationMode {
    Nearest,
    SumK,
    Density,
    Count,
    Mask,
    Centroid,
    Boundary,
}

impl AggregationMode {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationMode::Nearest => "nearest",
            AggregationMode::SumK => "sum_k",
            AggregationMode::Density => "density",
            AggregationMode::Count => "count",
            AggregationMode::Mask => "mask",
            AggregationMode::Centroid => "centroid",
            AggregationMode::Boundary => "boundary",
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(AggregationMode::Nearest),
            "sum_k" | "sumk" => Ok(AggregationMode::SumK),
            "density" => Ok(AggregationMode::Density),
            "count" => Ok(AggregationMode::Count),
            "mask" => Ok(AggregationMode::Mask),
            "centroid" => Ok(AggregationMode::Centroid),
            "boundary" => Ok(AggregationMode::Boundary),
            _ => Err(Error::invalid_parameter(
                "mode",
                s,
                "expected nearest, sum_k, density, count, mask, centroid or boundary",
            )),
        }
    }
}

/// Resolved evaluation strategy: one variant per supported `(family, mode)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    PointNearest,
    PointSumK { k: usize },
    PointDensity,
    PointCount,
    LineNearest,
    PolygonMask { mask_value: f64 },
    PolygonCentroid,
    PolygonBoundary,
}

impl Evaluation {
    /// Resolve `(family, mode)`, failing on unsupported pairs.
    pub fn resolve(
        family: GeometryFamily,
        mode: AggregationMode,
        k: usize,
        mask_value: f64,
    ) -> Result<Self> {
        use AggregationMode as M;
        use GeometryFamily as F;

        Ok(match (family, mode) {
            (F::Point, M::Nearest) => Evaluation::PointNearest,
            (F::Point, M::SumK) => Evaluation::PointSumK { k },
            (F::Point, M::Density) => Evaluation::PointDensity,
            (F::Point, M::Count) => Evaluation::PointCount,
            (F::Line, M::Nearest) => Evaluation::LineNearest,
            (F::Polygon, M::Mask) => Evaluation::PolygonMask { mask_value },
            (F::Polygon, M::Centroid) => Evaluation::PolygonCentroid,
            (F::Polygon, M::Boundary) => Evaluation::PolygonBoundary,
            (family, mode) => {
                return Err(Error::UnsupportedEvaluation {
                    family: family.to_string(),
                    mode: mode.to_string(),
                })
            }
        })
    }

    pub fn family(&self) -> GeometryFamily {
        match self {
            Evaluation::PointNearest
            | Evaluation::PointSumK { .. }
            | Evaluation::PointDensity
            | Evaluation::PointCount => GeometryFamily::Point,
            Evaluation::LineNearest => GeometryFamily::Line,
            Evaluation::PolygonMask { .. }
            | Evaluation::PolygonCentroid
            | Evaluation::PolygonBoundary => GeometryFamily::Polygon,
        }
    }

    /// Whether per-record weight and rank factors apply
    pub fn uses_factors(&self) -> bool {
        !matches!(self, Evaluation::PointCount | Evaluation::PolygonMask { .. })
    }
}

/// Rank property plus its category table
#[derive(Debug, Clone, PartialEq)]
pub struct RankSpec {
    pub property: String,
    pub table: RankTable,
}

/// Immutable description of one layer evaluation.
///
/// # Example
///
/// ```ignore
/// use heatgis_algorithms::layer::{AggregationMode, LayerSpec, PropertyFilter};
/// use heatgis_core::GeometryFamily;
///
/// let spec = LayerSpec::builder("power", GeometryFamily::Point, AggregationMode::SumK)
///     .filter(PropertyFilter::new().eq("power", "substation"))
///     .weight_property("voltage")
///     .decay("exp", [("scale", 2000.0)])
///     .k(4)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    source_id: String,
    family: GeometryFamily,
    mode: AggregationMode,
    evaluation: Evaluation,
    filter: PropertyFilter,
    weight_property: Option<String>,
    dataset_weight: f64,
    decay: DecayKernel,
    k: usize,
    mask_value: f64,
    rank: Option<RankSpec>,
}

impl LayerSpec {
    pub fn builder(
        source_id: impl Into<String>,
        family: GeometryFamily,
        mode: AggregationMode,
    ) -> LayerSpecBuilder {
        LayerSpecBuilder::new(source_id.into(), family, mode)
    }

    /// Default heatmap layer for a source's geometry family.
    ///
    /// Points and lines use `nearest`, polygons `mask`, all with an
    /// exponential kernel of scale 1000.
    pub fn default_for(source_id: impl Into<String>, family: GeometryFamily) -> Result<Self> {
        let mode = match family {
            GeometryFamily::Point | GeometryFamily::Line => AggregationMode::Nearest,
            GeometryFamily::Polygon => AggregationMode::Mask,
        };
        Self::builder(source_id, family, mode)
            .decay("exp", [("scale", 1000.0)])
            .build()
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn family(&self) -> GeometryFamily {
        self.family
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    pub fn evaluation(&self) -> Evaluation {
        self.evaluation
    }

    pub fn filter(&self) -> &PropertyFilter {
        &self.filter
    }

    pub fn weight_property(&self) -> Option<&str> {
        self.weight_property.as_deref()
    }

    pub fn dataset_weight(&self) -> f64 {
        self.dataset_weight
    }

    pub fn decay(&self) -> &DecayKernel {
        &self.decay
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn mask_value(&self) -> f64 {
        self.mask_value
    }

    pub fn rank(&self) -> Option<&RankSpec> {
        self.rank.as_ref()
    }
}

impl fmt::Display for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{} x{} {}",
            self.source_id, self.family, self.mode, self.dataset_weight, self.decay
        )
    }
}

/// Builder for [`LayerSpec`]; all validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct LayerSpecBuilder {
    source_id: String,
    family: GeometryFamily,
    mode: AggregationMode,
    filter: PropertyFilter,
    weight_property: Option<String>,
    dataset_weight: f64,
    decay_kind: String,
    decay_params: DecayParams,
    k: usize,
    mask_value: f64,
    rank_property: Option<String>,
    rank_table: Option<RankTable>,
}

impl LayerSpecBuilder {
    fn new(source_id: String, family: GeometryFamily, mode: AggregationMode) -> Self {
        Self {
            source_id,
            family,
            mode,
            filter: PropertyFilter::default(),
            weight_property: None,
            dataset_weight: 1.0,
            decay_kind: "exp".to_string(),
            decay_params: DecayParams::new(),
            k: 8,
            mask_value: 1.0,
            rank_property: None,
            rank_table: None,
        }
    }

    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn weight_property(mut self, property: impl Into<String>) -> Self {
        self.weight_property = Some(property.into());
        self
    }

    pub fn dataset_weight(mut self, weight: f64) -> Self {
        self.dataset_weight = weight;
        self
    }

    pub fn decay<I, K>(mut self, kind: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.decay_kind = kind.into();
        self.decay_params = params.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn mask_value(mut self, value: f64) -> Self {
        self.mask_value = value;
        self
    }

    pub fn rank(mut self, property: impl Into<String>, table: RankTable) -> Self {
        self.rank_property = Some(property.into());
        self.rank_table = Some(table);
        self
    }

    pub fn build(self) -> Result<LayerSpec> {
        if self.source_id.is_empty() {
            return Err(Error::invalid_parameter("source_id", "", "must not be empty"));
        }
        if self.k == 0 {
            return Err(Error::invalid_parameter("k", self.k, "must be at least 1"));
        }
        check_finite("dataset_weight", self.dataset_weight)?;
        check_finite("mask_value", self.mask_value)?;

        let evaluation = Evaluation::resolve(self.family, self.mode, self.k, self.mask_value)?;
        let decay = DecayKernel::from_name(&self.decay_kind, &self.decay_params)?;

        let rank = match (self.rank_property, self.rank_table) {
            (Some(property), Some(table)) => Some(RankSpec { property, table }),
            (None, None) => None,
            (Some(property), None) => {
                return Err(Error::invalid_parameter(
                    "rank_table",
                    property,
                    "rank_property requires a rank_table",
                ))
            }
            (None, Some(_)) => {
                return Err(Error::invalid_parameter(
                    "rank_property",
                    "",
                    "rank_table requires a rank_property",
                ))
            }
        };

        Ok(LayerSpec {
            source_id: self.source_id,
            family: self.family,
            mode: self.mode,
            evaluation,
            filter: self.filter,
            weight_property: self.weight_property,
            dataset_weight: self.dataset_weight,
            decay,
            k: self.k,
            mask_value: self.mask_value,
            rank,
        })
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, value, "must be finite"))
    }
}
