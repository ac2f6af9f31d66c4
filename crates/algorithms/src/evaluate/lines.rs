//! Line evaluator: decayed distance to the nearest selected line part

use super::{per_cell, LayerContext};
use heatgis_core::GridSpec;

pub(crate) fn nearest(ctx: &LayerContext<'_>, grid: &GridSpec, samples: &[[f64; 2]]) -> Vec<f64> {
    let Some(lines) = ctx.source.lines() else {
        return vec![0.0; grid.len()];
    };
    let index = ctx.segment_index(lines.index(), |part| lines.record(part));

    per_cell(grid, samples, |x, y| {
        index
            .nearest(x, y)
            .map_or(0.0, |(part, d)| ctx.decay(d) * ctx.factors[lines.record(part)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{AggregationMode, LayerSpec, PropertyFilter};
    use crate::source::GeoSource;
    use heatgis_core::{Bounds, GeometryFamily, CRS};

    // two east-west lines north and south of the equator, in metres
    const ROADS: &str = r#"{"type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:3857"}},
        "features": [
            {"type": "Feature", "properties": {"highway": "primary", "lanes": 4},
             "geometry": {"type": "LineString", "coordinates": [[-5000, 1000], [5000, 1000]]}},
            {"type": "Feature", "properties": {"highway": "track"},
             "geometry": {"type": "MultiLineString", "coordinates": [[[-5000, -300], [5000, -300]]]}}
        ]}"#;

    #[test]
    fn test_distance_to_nearest_line() {
        let src = GeoSource::from_geojson_str(ROADS, "roads", CRS::web_mercator()).unwrap();
        let grid = GridSpec::new(Bounds::new(-0.001, 0.0, 0.001, 0.0001), 3, 1).unwrap();
        let samples = grid.metric_samples().unwrap();

        let all = LayerSpec::builder("roads", GeometryFamily::Line, AggregationMode::Nearest)
            .decay("linear", [("radius", 2000.0)])
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &all);
        let values = nearest(&ctx, &grid, &samples);
        // sample y is 0, so the track at 300 m is nearest
        for v in &values {
            assert!((v - 0.85).abs() < 1e-9, "got {v}");
        }

        let primary = LayerSpec::builder("roads", GeometryFamily::Line, AggregationMode::Nearest)
            .filter(PropertyFilter::new().eq("highway", "primary"))
            .decay("linear", [("radius", 2000.0)])
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &primary);
        let values = nearest(&ctx, &grid, &samples);
        for v in &values {
            assert!((v - 0.5).abs() < 1e-9, "got {v}");
        }
    }

    #[test]
    fn test_weight_property_on_lines() {
        let src = GeoSource::from_geojson_str(ROADS, "roads", CRS::web_mercator()).unwrap();
        let grid = GridSpec::new(Bounds::new(-0.001, 0.0, 0.001, 0.0001), 3, 1).unwrap();
        let samples = grid.metric_samples().unwrap();

        // the track has no lanes, so the nearest line contributes 0
        let all = LayerSpec::builder("roads", GeometryFamily::Line, AggregationMode::Nearest)
            .weight_property("lanes")
            .decay("linear", [("radius", 2000.0)])
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &all);
        assert_eq!(nearest(&ctx, &grid, &samples), vec![0.0; 3]);

        let primary = LayerSpec::builder("roads", GeometryFamily::Line, AggregationMode::Nearest)
            .filter(PropertyFilter::new().eq("highway", "primary"))
            .weight_property("lanes")
            .decay("linear", [("radius", 2000.0)])
            .build()
            .unwrap();
        let ctx = LayerContext::new(&src, &primary);
        let index = ctx.segment_index(src.lines().unwrap().index(), |part| {
            src.lines().unwrap().record(part)
        });
        assert_eq!(index.paths(), 1);
        for v in nearest(&ctx, &grid, &samples) {
            assert!((v - 2.0).abs() < 1e-9, "got {v}");
        }
    }
}
