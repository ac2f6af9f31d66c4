//! Vector sources: loading, CRS normalization, partitioning and indexing
//!
//! A [`GeoSource`] keeps its records in WGS84 (for public bounds) and a
//! metric-projected copy of every single-part geometry (for all distance
//! math). Indexes are built once here and never mutated afterwards.

mod catalog;

pub use catalog::GeoCatalog;

use crate::index::{IndexedPoint, KdTree, SegmentIndex};
use geo::{BoundingRect, Centroid, MapCoords};
use geo_types::{Coord, Geometry, Polygon};
use heatgis_core::io::{read_vector, read_vector_from_str, VectorDataset};
use heatgis_core::vector::{explode, SinglePart};
use heatgis_core::{Bounds, Error, Feature, GeometryFamily, Projection, Result, CRS};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Point parts and their k-d tree
#[derive(Debug)]
pub struct PointPartition {
    tree: KdTree,
    records: Vec<usize>,
}

impl PointPartition {
    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    /// Record (feature) index owning `part`
    #[inline]
    pub fn record(&self, part: usize) -> usize {
        self.records[part]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Line parts, indexed segment-wise
#[derive(Debug)]
pub struct LinePartition {
    index: SegmentIndex,
    records: Vec<usize>,
}

impl LinePartition {
    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    #[inline]
    pub fn record(&self, part: usize) -> usize {
        self.records[part]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Polygon parts with centroid and outline indexes
#[derive(Debug)]
pub struct PolygonPartition {
    polygons: Vec<Polygon<f64>>,
    records: Vec<usize>,
    centroids: KdTree,
    outlines: SegmentIndex,
}

impl PolygonPartition {
    /// Metric-space polygons, one per part
    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polygons
    }

    pub fn centroids(&self) -> &KdTree {
        &self.centroids
    }

    pub fn outlines(&self) -> &SegmentIndex {
        &self.outlines
    }

    #[inline]
    pub fn record(&self, part: usize) -> usize {
        self.records[part]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Descriptive summary of a loaded source
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub origin: String,
    pub declared_crs: CRS,
    pub metric_crs: CRS,
    pub records: usize,
    pub points: usize,
    pub lines: usize,
    pub polygons: usize,
    pub bounds_wgs: Bounds,
    pub keys: Vec<String>,
}

impl fmt::Display for SourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {}", self.origin)?;
        writeln!(f, "  CRS: {} (metric {})", self.declared_crs, self.metric_crs)?;
        writeln!(f, "  Records: {}", self.records)?;
        writeln!(
            f,
            "  Parts: {} point, {} line, {} polygon",
            self.points, self.lines, self.polygons
        )?;
        let b = &self.bounds_wgs;
        writeln!(
            f,
            "  Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
            b.min_x, b.min_y, b.max_x, b.max_y
        )?;
        write!(f, "  Properties: {}", self.keys.join(", "))
    }
}

/// One loaded vector dataset.
#[derive(Debug)]
pub struct GeoSource {
    origin: String,
    declared_crs: CRS,
    metric_crs: CRS,
    features: Vec<Feature>,
    keys: BTreeSet<String>,
    bounds_wgs: Bounds,
    points: Option<PointPartition>,
    lines: Option<LinePartition>,
    polygons: Option<PolygonPartition>,
}

impl GeoSource {
    /// Load a GeoJSON file, projecting to Web Mercator.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_crs(path, CRS::web_mercator())
    }

    /// Load a GeoJSON file, projecting to `metric_crs`.
    pub fn load_with_crs<P: AsRef<Path>>(path: P, metric_crs: CRS) -> Result<Self> {
        let origin = path.as_ref().display().to_string();
        let dataset = read_vector(path)?;
        Self::from_dataset(dataset, &origin, metric_crs)
    }

    /// Build from a GeoJSON document held in memory.
    pub fn from_geojson_str(text: &str, origin: &str, metric_crs: CRS) -> Result<Self> {
        let dataset = read_vector_from_str(text, origin)?;
        Self::from_dataset(dataset, origin, metric_crs)
    }

    /// Build from already decoded records.
    ///
    /// Records without a declared CRS are taken as WGS84. A declared
    /// projected CRS is inverse-projected to WGS84 first.
    pub fn from_dataset(dataset: VectorDataset, origin: &str, metric_crs: CRS) -> Result<Self> {
        let declared_crs = dataset.crs.unwrap_or_default();
        if metric_crs.is_geographic() {
            return Err(Error::invalid_parameter(
                "metric_crs",
                metric_crs,
                "metric CRS must be projected",
            ));
        }
        let metric = metric_crs.projection()?;

        let mut features = dataset.features.features;
        if !declared_crs.is_geographic() {
            let source = declared_crs.projection().map_err(|_| {
                Error::data_load(origin, format!("unsupported CRS {declared_crs}"))
            })?;
            debug!("Reprojecting {} from {} to WGS84", origin, declared_crs);
            for feature in &mut features {
                if let Some(g) = feature.geometry.take() {
                    feature.geometry = Some(to_wgs84(&g, source));
                }
            }
        }

        let mut builder = PartitionBuilder::default();
        let mut bounds_wgs: Option<Bounds> = None;
        let mut keys = BTreeSet::new();

        for (record, feature) in features.iter().enumerate() {
            keys.extend(feature.properties.keys().cloned());

            let Some(geometry) = &feature.geometry else {
                continue;
            };
            if let Some(rect) = geometry.bounding_rect() {
                let b = Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
                bounds_wgs = Some(match bounds_wgs {
                    Some(acc) => acc.merge(&b),
                    None => b,
                });
            }
            for part in explode(geometry) {
                builder.push(record, part, metric);
            }
        }

        let bounds_wgs = match bounds_wgs {
            Some(b) if builder.total() > 0 => b,
            _ => return Err(Error::data_load(origin, "no decodable geometry")),
        };

        let (points, lines, polygons) = builder.finish();
        let source = Self {
            origin: origin.to_string(),
            declared_crs,
            metric_crs,
            features,
            keys,
            bounds_wgs,
            points,
            lines,
            polygons,
        };

        info!(
            "Loaded {}: {} records ({} point, {} line, {} polygon parts)",
            source.origin,
            source.features.len(),
            source.part_count(GeometryFamily::Point),
            source.part_count(GeometryFamily::Line),
            source.part_count(GeometryFamily::Polygon),
        );

        Ok(source)
    }

    // Accessors

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// CRS the input declared (WGS84 when it declared none)
    pub fn declared_crs(&self) -> CRS {
        self.declared_crs
    }

    pub fn metric_crs(&self) -> CRS {
        self.metric_crs
    }

    /// Records in WGS84, in input order
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn record_count(&self) -> usize {
        self.features.len()
    }

    /// Union of property keys over all records
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn bounds_wgs(&self) -> Bounds {
        self.bounds_wgs
    }

    pub fn points(&self) -> Option<&PointPartition> {
        self.points.as_ref()
    }

    pub fn lines(&self) -> Option<&LinePartition> {
        self.lines.as_ref()
    }

    pub fn polygons(&self) -> Option<&PolygonPartition> {
        self.polygons.as_ref()
    }

    /// Number of single parts in a family partition
    pub fn part_count(&self, family: GeometryFamily) -> usize {
        match family {
            GeometryFamily::Point => self.points.as_ref().map_or(0, PointPartition::len),
            GeometryFamily::Line => self.lines.as_ref().map_or(0, LinePartition::len),
            GeometryFamily::Polygon => self.polygons.as_ref().map_or(0, PolygonPartition::len),
        }
    }

    /// Most frequent geometry family (ties resolve point, line, polygon).
    pub fn dominant_family(&self) -> Option<GeometryFamily> {
        GeometryFamily::ALL
            .iter()
            .copied()
            .filter(|&f| self.part_count(f) > 0)
            .fold(None, |best: Option<GeometryFamily>, f| match best {
                Some(b) if self.part_count(b) >= self.part_count(f) => Some(b),
                _ => Some(f),
            })
    }

    pub fn summary(&self) -> SourceSummary {
        SourceSummary {
            origin: self.origin.clone(),
            declared_crs: self.declared_crs,
            metric_crs: self.metric_crs,
            records: self.features.len(),
            points: self.part_count(GeometryFamily::Point),
            lines: self.part_count(GeometryFamily::Line),
            polygons: self.part_count(GeometryFamily::Polygon),
            bounds_wgs: self.bounds_wgs,
            keys: self.keys.iter().cloned().collect(),
        }
    }
}

fn to_wgs84(geometry: &Geometry<f64>, projection: Projection) -> Geometry<f64> {
    geometry.map_coords(move |c: Coord<f64>| {
        let (x, y) = projection.inverse(c.x, c.y);
        Coord { x, y }
    })
}

/// Accumulates metric-space parts per family before the indexes are built.
#[derive(Default)]
struct PartitionBuilder {
    points: Vec<IndexedPoint>,
    point_records: Vec<usize>,
    lines: Vec<geo_types::LineString<f64>>,
    line_records: Vec<usize>,
    polygons: Vec<Polygon<f64>>,
    polygon_records: Vec<usize>,
}

impl PartitionBuilder {
    fn push(&mut self, record: usize, part: SinglePart, metric: Projection) {
        let forward = move |c: Coord<f64>| {
            let (x, y) = metric.forward(c.x, c.y);
            Coord { x, y }
        };
        match part {
            SinglePart::Point(p) => {
                let c = forward(p.0);
                self.points.push(IndexedPoint::new(c.x, c.y, self.points.len()));
                self.point_records.push(record);
            }
            SinglePart::Line(ls) => {
                self.lines.push(ls.map_coords(forward));
                self.line_records.push(record);
            }
            SinglePart::Polygon(poly) => {
                self.polygons.push(poly.map_coords(forward));
                self.polygon_records.push(record);
            }
        }
    }

    fn total(&self) -> usize {
        self.points.len() + self.lines.len() + self.polygons.len()
    }

    fn finish(self) -> (Option<PointPartition>, Option<LinePartition>, Option<PolygonPartition>) {
        let points = (!self.points.is_empty()).then(|| PointPartition {
            tree: KdTree::build(self.points),
            records: self.point_records,
        });

        let lines = (!self.lines.is_empty()).then(|| LinePartition {
            index: SegmentIndex::build(self.lines.iter().enumerate()),
            records: self.line_records,
        });

        let polygons = (!self.polygons.is_empty()).then(|| {
            let centroids = self
                .polygons
                .iter()
                .enumerate()
                .filter_map(|(part, poly)| {
                    poly.centroid().map(|c| IndexedPoint::new(c.x(), c.y(), part))
                })
                .collect();
            let outlines = SegmentIndex::build(self.polygons.iter().enumerate().flat_map(
                |(part, poly)| {
                    std::iter::once(poly.exterior())
                        .chain(poly.interiors())
                        .map(move |ring| (part, ring))
                },
            ));
            PolygonPartition {
                centroids: KdTree::build(centroids),
                outlines,
                polygons: self.polygons,
                records: self.polygon_records,
            }
        });

        (points, lines, polygons)
    }
}
