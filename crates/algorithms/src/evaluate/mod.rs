//! Layer evaluation
//!
//! Every evaluator returns one value per grid cell in the grid's flatten
//! order (latitude outer, longitude inner). Distances are measured in the
//! metric CRS shared by the grid and the source.

mod binning;
mod lines;
mod points;
mod polygons;

use crate::index::{KdTree, SegmentIndex};
use crate::layer::{Evaluation, LayerSpec};
use crate::maybe_rayon::*;
use crate::source::{GeoCatalog, GeoSource};
use heatgis_core::{Error, GeometryFamily, GridSpec, GridTable, Result};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Per-evaluation view of a source: the filter outcome and the
/// per-record weight/rank factors.
pub(crate) struct LayerContext<'a> {
    pub source: &'a GeoSource,
    pub spec: &'a LayerSpec,
    /// Record passes the filter
    pub selected: Vec<bool>,
    /// `weight / rank` per record
    pub factors: Vec<f64>,
    all_selected: bool,
}

impl<'a> LayerContext<'a> {
    pub fn new(source: &'a GeoSource, spec: &'a LayerSpec) -> Self {
        let features = source.features();
        let selected = spec.filter().select(features, source.keys());
        let all_selected = selected.iter().all(|&s| s);

        // weighting only applies when the property exists somewhere in the source
        let weight_key = spec.weight_property().filter(|k| source.has_key(k));
        let factors = if !spec.evaluation().uses_factors() {
            vec![1.0; features.len()]
        } else {
            features
                .iter()
                .map(|feature| {
                    let weight = weight_key.map_or(1.0, |key| {
                        feature.get_property(key).map_or(0.0, |v| v.to_weight())
                    });
                    let rank = spec
                        .rank()
                        .map_or(1.0, |r| r.table.divisor(feature.get_property(&r.property)));
                    weight / rank
                })
                .collect()
        };

        Self {
            source,
            spec,
            selected,
            factors,
            all_selected,
        }
    }

    /// Point tree holding only selected records; the shared tree when the
    /// filter keeps everything.
    pub fn point_tree<'i, R>(&self, shared: &'i KdTree, record: R) -> Cow<'i, KdTree>
    where
        R: Fn(usize) -> usize,
    {
        if self.all_selected {
            return Cow::Borrowed(shared);
        }
        let tree = shared.subset(|part| self.selected[record(part)]);
        debug!("Filtered point index: {} of {} parts", tree.len(), shared.len());
        Cow::Owned(tree)
    }

    /// Segment index holding only selected records; the shared index when
    /// the filter keeps everything.
    pub fn segment_index<'i, R>(&self, shared: &'i SegmentIndex, record: R) -> Cow<'i, SegmentIndex>
    where
        R: Fn(usize) -> usize,
    {
        if self.all_selected {
            return Cow::Borrowed(shared);
        }
        let index = shared.subset(|part| self.selected[record(part)]);
        debug!(
            "Filtered segment index: {} of {} paths",
            index.paths(),
            shared.paths()
        );
        Cow::Owned(index)
    }

    #[inline]
    pub fn decay(&self, d: f64) -> f64 {
        self.spec.decay().weight(d)
    }
}

/// Apply `f` to every metric sample, rows in parallel.
pub(crate) fn per_cell<F>(grid: &GridSpec, samples: &[[f64; 2]], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    let nx = grid.nx();
    (0..grid.ny())
        .into_par_iter()
        .flat_map(|row| {
            let start = row * nx;
            samples[start..start + nx]
                .iter()
                .map(|&[x, y]| f(x, y))
                .collect::<Vec<f64>>()
        })
        .collect()
}

/// Evaluate `spec` against `source` on `grid`, without the dataset weight.
///
/// Values are non-negative whenever feature weights are non-negative.
pub fn evaluate_source(source: &GeoSource, spec: &LayerSpec, grid: &GridSpec) -> Result<Vec<f64>> {
    if source.metric_crs() != grid.metric_crs() {
        return Err(Error::CrsMismatch(
            source.metric_crs().identifier(),
            grid.metric_crs().identifier(),
        ));
    }

    let ctx = LayerContext::new(source, spec);
    let family = spec.evaluation().family();
    let matching = family_matches(&ctx);
    debug!(
        "Evaluating {} on {}x{} grid: {} of {} {} parts selected",
        spec,
        grid.nx(),
        grid.ny(),
        matching,
        source.part_count(family),
        family
    );
    if matching == 0 {
        warn!("Layer {} selects no features; returning zeros", spec);
        return Ok(vec![0.0; grid.len()]);
    }

    let samples = grid.metric_samples()?;
    let values = match spec.evaluation() {
        Evaluation::PointNearest => points::nearest(&ctx, grid, &samples),
        Evaluation::PointSumK { k } => points::sum_k(&ctx, grid, &samples, k, matching),
        Evaluation::PointDensity => points::density(&ctx, grid)?,
        Evaluation::PointCount => points::count(&ctx, grid)?,
        Evaluation::LineNearest => lines::nearest(&ctx, grid, &samples),
        Evaluation::PolygonMask { mask_value } => polygons::mask(&ctx, grid, &samples, mask_value),
        Evaluation::PolygonCentroid => polygons::centroid(&ctx, grid, &samples),
        Evaluation::PolygonBoundary => polygons::boundary(&ctx, grid, &samples),
    };

    if values.len() != grid.len() {
        return Err(Error::Algorithm(format!(
            "evaluator produced {} values for {} cells",
            values.len(),
            grid.len()
        )));
    }
    Ok(values)
}

/// Selected parts in the family the evaluation reads
fn family_matches(ctx: &LayerContext<'_>) -> usize {
    let sel = &ctx.selected;
    match ctx.spec.evaluation().family() {
        GeometryFamily::Point => ctx.source.points().map_or(0, |p| {
            (0..p.len()).filter(|&i| sel[p.record(i)]).count()
        }),
        GeometryFamily::Line => ctx.source.lines().map_or(0, |l| {
            (0..l.len()).filter(|&i| sel[l.record(i)]).count()
        }),
        GeometryFamily::Polygon => ctx.source.polygons().map_or(0, |p| {
            (0..p.len()).filter(|&i| sel[p.record(i)]).count()
        }),
    }
}

/// Owns a frozen catalog and evaluates layers against it.
///
/// The catalog cannot change once it has been handed to an engine.
#[derive(Debug)]
pub struct Engine {
    catalog: GeoCatalog,
}

impl Engine {
    pub fn new(catalog: GeoCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &GeoCatalog {
        &self.catalog
    }

    /// Grid over the union of all sources' bounds
    pub fn default_grid(&self, nx: usize, ny: usize) -> Result<GridSpec> {
        let bounds = self.catalog.combined_bounds_wgs()?;
        GridSpec::new(bounds, nx, ny)?.with_metric_crs(self.catalog.metric_crs())
    }

    /// Evaluate one layer; values are scaled by its dataset weight.
    pub fn evaluate_layer(&self, grid: &GridSpec, spec: &LayerSpec) -> Result<GridTable> {
        let source = self.catalog.get(spec.source_id())?;
        let weight = spec.dataset_weight();
        let values = evaluate_source(source, spec, grid)?
            .into_iter()
            .map(|v| {
                let scaled = v * weight;
                // normalize -0.0
                if scaled == 0.0 {
                    0.0
                } else {
                    scaled
                }
            })
            .collect();
        GridTable::from_values(grid, values)
    }
}
