//! Polygon evaluators: mask, centroid, boundary

use super::{per_cell, LayerContext};
use geo::{BooleanOps, BoundingRect, Contains};
use geo_types::{MultiPolygon, Point, Polygon, Rect};
use heatgis_core::GridSpec;
use tracing::debug;

/// `mask_value` where the sample lies inside the union of selected
/// polygons, 0 elsewhere.
pub(crate) fn mask(
    ctx: &LayerContext<'_>,
    grid: &GridSpec,
    samples: &[[f64; 2]],
    mask_value: f64,
) -> Vec<f64> {
    let Some(polygons) = ctx.source.polygons() else {
        return vec![0.0; grid.len()];
    };

    let selected: Vec<&Polygon<f64>> = polygons
        .polygons()
        .iter()
        .enumerate()
        .filter(|(part, _)| ctx.selected[polygons.record(*part)])
        .map(|(_, p)| p)
        .collect();

    let union = union_all(&selected);
    debug!(
        "Mask union: {} polygons merged into {}",
        selected.len(),
        union.0.len()
    );

    let pieces: Vec<(Rect<f64>, &Polygon<f64>)> = union
        .0
        .iter()
        .filter_map(|p| p.bounding_rect().map(|r| (r, p)))
        .collect();

    per_cell(grid, samples, |x, y| {
        let pt = Point::new(x, y);
        let inside = pieces.iter().any(|(rect, poly)| {
            x >= rect.min().x
                && x <= rect.max().x
                && y >= rect.min().y
                && y <= rect.max().y
                && poly.contains(&pt)
        });
        if inside {
            mask_value
        } else {
            0.0
        }
    })
}

fn union_all(polygons: &[&Polygon<f64>]) -> MultiPolygon<f64> {
    let mut iter = polygons.iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(Vec::new());
    };
    iter.fold(MultiPolygon::new(vec![(*first).clone()]), |acc, p| {
        acc.union(&MultiPolygon::new(vec![(*p).clone()]))
    })
}

/// Decayed distance to the nearest selected polygon centroid.
pub(crate) fn centroid(ctx: &LayerContext<'_>, grid: &GridSpec, samples: &[[f64; 2]]) -> Vec<f64> {
    let Some(polygons) = ctx.source.polygons() else {
        return vec![0.0; grid.len()];
    };
    let tree = ctx.point_tree(polygons.centroids(), |part| polygons.record(part));

    per_cell(grid, samples, |x, y| {
        tree.nearest(x, y)
            .map_or(0.0, |hit| {
                ctx.decay(hit.distance()) * ctx.factors[polygons.record(hit.point.id)]
            })
    })
}

/// Decayed distance to the nearest selected polygon outline (holes included).
pub(crate) fn boundary(ctx: &LayerContext<'_>, grid: &GridSpec, samples: &[[f64; 2]]) -> Vec<f64> {
    let Some(polygons) = ctx.source.polygons() else {
        return vec![0.0; grid.len()];
    };
    let index = ctx.segment_index(polygons.outlines(), |part| polygons.record(part));

    per_cell(grid, samples, |x, y| {
        index
            .nearest(x, y)
            .map_or(0.0, |(part, d)| ctx.decay(d) * ctx.factors[polygons.record(part)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{AggregationMode, LayerSpec, PropertyFilter};
    use crate::source::GeoSource;
    use heatgis_core::{Bounds, GeometryFamily, CRS};

    // two adjacent 1000 m squares sharing the x = 1000 edge, plus a far one
    const PARCELS: &str = r#"{"type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:3857"}},
        "features": [
            {"type": "Feature", "properties": {"zone": "A", "w": 2},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1000,0],[1000,1000],[0,1000],[0,0]]]}},
            {"type": "Feature", "properties": {"zone": "A", "w": 3},
             "geometry": {"type": "Polygon", "coordinates": [[[1000,0],[2000,0],[2000,1000],[1000,1000],[1000,0]]]}},
            {"type": "Feature", "properties": {"zone": "B", "w": 5},
             "geometry": {"type": "Polygon", "coordinates": [[[5000,5000],[6000,5000],[6000,6000],[5000,6000],[5000,5000]]]}}
        ]}"#;

    fn source() -> GeoSource {
        GeoSource::from_geojson_str(PARCELS, "parcels", CRS::web_mercator()).unwrap()
    }

    fn metric_grid(samples: &[(f64, f64)]) -> (GridSpec, Vec<[f64; 2]>) {
        // evaluators only read the samples; the grid supplies the layout
        let grid = GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), samples.len(), 1).unwrap();
        (grid, samples.iter().map(|&(x, y)| [x, y]).collect())
    }

    #[test]
    fn test_mask_union_and_filter() {
        let src = source();
        let (grid, samples) = metric_grid(&[(500.0, 500.0), (1000.0, 500.0), (1500.0, 500.0), (3000.0, 500.0), (5500.0, 5500.0)]);

        let zone_a = LayerSpec::builder("p", GeometryFamily::Polygon, AggregationMode::Mask)
            .filter(PropertyFilter::new().eq("zone", "A"))
            .mask_value(2.5)
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &zone_a);
        let values = mask(&ctx, &grid, &samples, 2.5);
        // the shared edge at x = 1000 is interior to the union
        assert_eq!(values, vec![2.5, 2.5, 2.5, 0.0, 0.0]);
    }

    #[test]
    fn test_centroid_weighted() {
        let src = source();
        let (grid, samples) = metric_grid(&[(500.0, 500.0), (1500.0, 800.0)]);
        let spec = LayerSpec::builder("p", GeometryFamily::Polygon, AggregationMode::Centroid)
            .weight_property("w")
            .decay("inverse", [("eps", 1.0), ("power", 1.0)])
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &spec);
        let values = centroid(&ctx, &grid, &samples);
        assert!((values[0] - 2.0).abs() < 1e-6);
        assert!((values[1] - 3.0 / 301.0).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_distance() {
        let src = source();
        let (grid, samples) = metric_grid(&[(500.0, 500.0), (500.0, 900.0), (3500.0, 500.0)]);
        let spec = LayerSpec::builder("p", GeometryFamily::Polygon, AggregationMode::Boundary)
            .decay("linear", [("radius", 1000.0)])
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &spec);
        let values = boundary(&ctx, &grid, &samples);
        assert!((values[0] - 0.5).abs() < 1e-6);
        assert!((values[1] - 0.9).abs() < 1e-6);
        assert_eq!(values[2], 0.0);
    }
}
