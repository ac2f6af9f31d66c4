//! Evaluation lattice over a WGS84 bounding box

mod table;

pub use table::{GridTable, GridValue};

use crate::crs::CRS;
use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box `(min_x, min_y, max_x, max_y)`.
///
/// For WGS84 boxes `x` is longitude and `y` latitude, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Envelope of a set of `(x, y)` coordinates, `None` when empty.
    pub fn from_coords(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        coords.into_iter().fold(None, |acc: Option<Bounds>, (x, y)| {
            let b = Bounds::new(x, y, x, y);
            Some(match acc {
                Some(a) => a.merge(&b),
                None => b,
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Union of two boxes
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<(f64, f64, f64, f64)> for Bounds {
    fn from((min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// A rectangular lat/lon lattice on which layers are evaluated.
///
/// Samples are linearly spaced and include both ends of each axis. Every
/// flat output array is row-major with latitude as the outer dimension, so
/// index `row * nx + col` maps to `(lat = ys[row], lon = xs[col])` for all
/// evaluators.
///
/// # Example
///
/// ```ignore
/// use heatgis_core::grid::{Bounds, GridSpec};
///
/// let grid = GridSpec::new(Bounds::new(138.5, -35.0, 138.7, -34.8), 50, 40)?;
/// let (lon_grid, lat_grid) = grid.mesh();
/// assert_eq!(lon_grid.dim(), (40, 50));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    bounds: Bounds,
    nx: usize,
    ny: usize,
    geographic_crs: CRS,
    metric_crs: CRS,
}

impl GridSpec {
    /// Create a grid over WGS84 `bounds` with Web Mercator as the metric CRS.
    pub fn new(bounds: Bounds, nx: usize, ny: usize) -> Result<Self> {
        let finite = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || bounds.min_x >= bounds.max_x {
            return Err(Error::invalid_parameter(
                "bounds",
                format!("{:?}", bounds.as_tuple()),
                "min_x must be strictly less than max_x",
            ));
        }
        if bounds.min_y >= bounds.max_y {
            return Err(Error::invalid_parameter(
                "bounds",
                format!("{:?}", bounds.as_tuple()),
                "min_y must be strictly less than max_y",
            ));
        }
        if nx == 0 {
            return Err(Error::invalid_parameter("nx", nx, "must be at least 1"));
        }
        if ny == 0 {
            return Err(Error::invalid_parameter("ny", ny, "must be at least 1"));
        }

        Ok(Self {
            bounds,
            nx,
            ny,
            geographic_crs: CRS::wgs84(),
            metric_crs: CRS::web_mercator(),
        })
    }

    /// Square grid with `size` samples per axis
    pub fn square(bounds: Bounds, size: usize) -> Result<Self> {
        Self::new(bounds, size, size)
    }

    /// Replace the metric CRS used for distance arithmetic.
    pub fn with_metric_crs(mut self, crs: CRS) -> Result<Self> {
        if crs.is_geographic() {
            return Err(Error::invalid_parameter(
                "metric_crs",
                crs,
                "metric CRS must be projected",
            ));
        }
        crs.projection()?;
        self.metric_crs = crs;
        Ok(self)
    }

    // Dimensions

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Samples along longitude
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Samples along latitude
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Total number of cells (`nx * ny`)
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn geographic_crs(&self) -> CRS {
        self.geographic_crs
    }

    pub fn metric_crs(&self) -> CRS {
        self.metric_crs
    }

    /// Flat index of `(row, col)` in the shared flatten order
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.nx + col
    }

    // Coordinates

    /// Longitude and latitude axes.
    pub fn axes(&self) -> (Array1<f64>, Array1<f64>) {
        (
            linspace(self.bounds.min_x, self.bounds.max_x, self.nx),
            linspace(self.bounds.min_y, self.bounds.max_y, self.ny),
        )
    }

    /// `(lon_grid, lat_grid)`, both of shape `(ny, nx)`.
    pub fn mesh(&self) -> (Array2<f64>, Array2<f64>) {
        let (xs, ys) = self.axes();
        let lon_grid = Array2::from_shape_fn((self.ny, self.nx), |(_, col)| xs[col]);
        let lat_grid = Array2::from_shape_fn((self.ny, self.nx), |(row, _)| ys[row]);
        (lon_grid, lat_grid)
    }

    /// Sample points as `(lon, lat)` in flatten order.
    pub fn samples(&self) -> Vec<(f64, f64)> {
        let (xs, ys) = self.axes();
        ys.iter()
            .flat_map(|&lat| xs.iter().map(move |&lon| (lon, lat)))
            .collect()
    }

    /// Sample points projected into the metric CRS, in flatten order.
    pub fn metric_samples(&self) -> Result<Vec<[f64; 2]>> {
        let projection = self.metric_crs.projection()?;
        Ok(self
            .samples()
            .into_iter()
            .map(|(lon, lat)| {
                let (x, y) = projection.forward(lon, lat);
                [x, y]
            })
            .collect())
    }

    /// Grid extent in the metric CRS (envelope of the projected corners).
    pub fn metric_extent(&self) -> Result<Bounds> {
        let projection = self.metric_crs.projection()?;
        Ok(projection.forward_bounds(self.bounds.as_tuple()).into())
    }
}

/// Evenly spaced samples over `[start, end]`; the last sample is exactly `end`.
fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    if n == 1 {
        return Array1::from_elem(1, start);
    }
    let step = (end - start) / (n - 1) as f64;
    Array1::from_shape_fn(n, |i| if i == n - 1 { end } else { start + step * i as f64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> GridSpec {
        GridSpec::new(Bounds::new(0.0, 10.0, 4.0, 12.0), 5, 3).unwrap()
    }

    #[test]
    fn test_axes_inclusive() {
        let (xs, ys) = grid().axes();
        assert_eq!(xs.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ys.to_vec(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_single_sample_sits_at_minimum() {
        let g = GridSpec::new(Bounds::new(1.0, 2.0, 3.0, 4.0), 1, 1).unwrap();
        assert_eq!(g.samples(), vec![(1.0, 2.0)]);
    }

    #[test]
    fn test_mesh_shape_and_order() {
        let g = grid();
        let (lon_grid, lat_grid) = g.mesh();
        assert_eq!(lon_grid.dim(), (3, 5));
        assert_eq!(lat_grid.dim(), (3, 5));

        let samples = g.samples();
        let flat_lon: Vec<f64> = lon_grid.iter().copied().collect();
        let flat_lat: Vec<f64> = lat_grid.iter().copied().collect();
        for (i, &(lon, lat)) in samples.iter().enumerate() {
            assert_eq!(lon, flat_lon[i]);
            assert_eq!(lat, flat_lat[i]);
        }
        // latitude is the outer dimension
        assert_eq!(samples[g.index(1, 0)], (0.0, 11.0));
        assert_eq!(samples[g.index(0, 4)], (4.0, 10.0));
    }

    #[test]
    fn test_invalid_grids() {
        assert!(GridSpec::new(Bounds::new(1.0, 0.0, 1.0, 1.0), 2, 2).is_err());
        assert!(GridSpec::new(Bounds::new(0.0, 1.0, 1.0, 0.5), 2, 2).is_err());
        assert!(GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), 0, 2).is_err());
        assert!(GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), 2, 0).is_err());
        assert!(GridSpec::new(Bounds::new(f64::NAN, 0.0, 1.0, 1.0), 2, 2).is_err());
    }

    #[test]
    fn test_metric_crs_must_be_projected() {
        assert!(grid().with_metric_crs(CRS::wgs84()).is_err());
        assert!(grid().with_metric_crs(CRS::from_epsg(2193)).is_err());
        let g = grid().with_metric_crs(CRS::utm(31, true)).unwrap();
        assert_eq!(g.metric_crs(), CRS::utm(31, true));
    }

    #[test]
    fn test_metric_extent_matches_corners() {
        let g = grid();
        let extent = g.metric_extent().unwrap();
        let samples = g.metric_samples().unwrap();
        assert_relative_eq!(extent.min_x, samples[0][0], epsilon = 1e-6);
        assert_relative_eq!(extent.min_y, samples[0][1], epsilon = 1e-6);
        let last = samples[samples.len() - 1];
        assert_relative_eq!(extent.max_x, last[0], epsilon = 1e-6);
        assert_relative_eq!(extent.max_y, last[1], epsilon = 1e-6);
    }

    #[test]
    fn test_bounds_merge() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let b = Bounds::new(-1.0, 0.5, 0.5, 3.0);
        assert_eq!(a.merge(&b), Bounds::new(-1.0, 0.0, 1.0, 3.0));
        assert_eq!(
            Bounds::from_coords(vec![(1.0, 2.0), (-1.0, 5.0)]),
            Some(Bounds::new(-1.0, 2.0, 1.0, 5.0))
        );
        assert_eq!(Bounds::from_coords(Vec::new()), None);
    }
}
