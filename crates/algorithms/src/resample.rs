//! Zero-order-hold resampling of scattered values onto a grid
//!
//! Each grid sample takes the value of the closest scattered point, measured
//! in plain longitude/latitude degrees.

use crate::index::{IndexedPoint, KdTree};
use crate::maybe_rayon::*;
use heatgis_core::{Error, GridSpec, GridTable, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A value observed at a geographic location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatteredValue {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

impl ScatteredValue {
    pub fn new(lat: f64, lon: f64, value: f64) -> Self {
        Self { lat, lon, value }
    }
}

/// Copy the nearest point's value into every cell of `grid`.
///
/// Points with a non-finite coordinate or value are skipped. Ties between
/// equidistant points resolve to the one found first by the index.
pub fn resample(points: &[ScatteredValue], grid: &GridSpec) -> Result<GridTable> {
    let usable: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.lat.is_finite() && p.lon.is_finite() && p.value.is_finite())
        .map(|(i, p)| IndexedPoint::new(p.lon, p.lat, i))
        .collect();

    if usable.is_empty() {
        return Err(Error::Algorithm("No sample points provided".into()));
    }
    if usable.len() < points.len() {
        warn!(
            "Skipped {} non-finite sample points",
            points.len() - usable.len()
        );
    }
    debug!(
        "Resampling {} points onto {}x{} grid",
        usable.len(),
        grid.nx(),
        grid.ny()
    );

    let tree = KdTree::build(usable);
    let samples = grid.samples();
    let nx = grid.nx();

    let values: Vec<f64> = (0..grid.ny())
        .into_par_iter()
        .flat_map(|row| {
            samples[row * nx..(row + 1) * nx]
                .iter()
                .map(|&(lon, lat)| {
                    tree.nearest(lon, lat)
                        .map_or(0.0, |hit| points[hit.point.id].value)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    GridTable::from_values(grid, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatgis_core::Bounds;

    fn corners() -> Vec<ScatteredValue> {
        vec![
            ScatteredValue::new(0.0, 0.0, 1.0),
            ScatteredValue::new(0.0, 1.0, 2.0),
            ScatteredValue::new(1.0, 0.0, 3.0),
            ScatteredValue::new(1.0, 1.0, 4.0),
        ]
    }

    #[test]
    fn test_corner_values() {
        let grid = GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), 4, 4).unwrap();
        let table = resample(&corners(), &grid).unwrap();

        assert_eq!(table.len(), 16);
        for cell in table.iter() {
            assert!([1.0, 2.0, 3.0, 4.0].contains(&cell.value), "got {}", cell.value);
        }
        // flatten order: row 0 is the southern edge, column 0 the western edge
        assert_eq!(table.rows()[0].value, 1.0);
        assert_eq!(table.rows()[3].value, 2.0);
        assert_eq!(table.rows()[12].value, 3.0);
        assert_eq!(table.rows()[15].value, 4.0);
    }

    #[test]
    fn test_single_point_fills_grid() {
        let grid = GridSpec::new(Bounds::new(-10.0, -10.0, 10.0, 10.0), 3, 2).unwrap();
        let table = resample(&[ScatteredValue::new(50.0, 50.0, 7.5)], &grid).unwrap();
        assert!(table.values().iter().all(|&v| v == 7.5));
    }

    #[test]
    fn test_non_finite_points_skipped() {
        let grid = GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), 2, 2).unwrap();
        let points = vec![
            ScatteredValue::new(0.0, 0.0, f64::NAN),
            ScatteredValue::new(1.0, 1.0, 9.0),
        ];
        let table = resample(&points, &grid).unwrap();
        assert!(table.values().iter().all(|&v| v == 9.0));
    }

    #[test]
    fn test_empty_points() {
        let grid = GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), 2, 2).unwrap();
        assert!(resample(&[], &grid).is_err());
        let nan = [ScatteredValue::new(f64::NAN, 0.0, 1.0)];
        assert!(resample(&nan, &grid).is_err());
    }
}
