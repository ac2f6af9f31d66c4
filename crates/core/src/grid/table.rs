//! Tabular layer output: one `(lat, lon, value)` row per grid cell

use super::GridSpec;
use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single evaluated grid cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridValue {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

/// Result of evaluating a layer (or a combination) on a [`GridSpec`].
///
/// Rows follow the grid flatten order: latitude outer, longitude inner.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTable {
    nx: usize,
    ny: usize,
    rows: Vec<GridValue>,
}

impl GridTable {
    /// Pair flat `values` with the grid's sample coordinates.
    pub fn from_values(grid: &GridSpec, values: Vec<f64>) -> Result<Self> {
        if values.len() != grid.len() {
            return Err(Error::Algorithm(format!(
                "value count {} does not match grid size {}x{}",
                values.len(),
                grid.nx(),
                grid.ny()
            )));
        }

        let rows = grid
            .samples()
            .into_iter()
            .zip(values)
            .map(|((lon, lat), value)| GridValue { lat, lon, value })
            .collect();

        Ok(Self {
            nx: grid.nx(),
            ny: grid.ny(),
            rows,
        })
    }

    /// All-zero table over `grid`
    pub fn zeros(grid: &GridSpec) -> Self {
        let rows = grid
            .samples()
            .into_iter()
            .map(|(lon, lat)| GridValue { lat, lon, value: 0.0 })
            .collect();
        Self {
            nx: grid.nx(),
            ny: grid.ny(),
            rows,
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[GridValue] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridValue> {
        self.rows.iter()
    }

    pub fn get(&self, index: usize) -> Option<&GridValue> {
        self.rows.get(index)
    }

    /// Flat value column
    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }

    /// Multiply every value by `factor`
    pub fn scale(&mut self, factor: f64) {
        for row in &mut self.rows {
            row.value *= factor;
        }
    }

    /// Add `other` cell-by-cell. Both tables must come from the same grid.
    pub fn accumulate(&mut self, other: &GridTable) -> Result<()> {
        if self.nx != other.nx || self.ny != other.ny {
            return Err(Error::Algorithm(format!(
                "cannot add {}x{} table to {}x{} table",
                other.nx, other.ny, self.nx, self.ny
            )));
        }
        for (a, b) in self.rows.iter_mut().zip(&other.rows) {
            a.value += b.value;
        }
        Ok(())
    }

    /// Values reshaped to `(ny, nx)`
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.ny, self.nx), |(row, col)| {
            self.rows[row * self.nx + col].value
        })
    }

    /// `(min, max)` over finite values, `None` if there are none
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .map(|r| r.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl<'a> IntoIterator for &'a GridTable {
    type Item = &'a GridValue;
    type IntoIter = std::slice::Iter<'a, GridValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Bounds;

    fn grid() -> GridSpec {
        GridSpec::new(Bounds::new(0.0, 0.0, 2.0, 1.0), 3, 2).unwrap()
    }

    #[test]
    fn test_from_values_pairs_coordinates() {
        let table = GridTable::from_values(&grid(), (0..6).map(f64::from).collect()).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.rows()[0], GridValue { lat: 0.0, lon: 0.0, value: 0.0 });
        assert_eq!(table.rows()[4], GridValue { lat: 1.0, lon: 1.0, value: 4.0 });
    }

    #[test]
    fn test_length_mismatch() {
        assert!(GridTable::from_values(&grid(), vec![1.0; 5]).is_err());
    }

    #[test]
    fn test_to_array_layout() {
        let table = GridTable::from_values(&grid(), (0..6).map(f64::from).collect()).unwrap();
        let arr = table.to_array();
        assert_eq!(arr.dim(), (2, 3));
        assert_eq!(arr[[1, 2]], 5.0);
        assert_eq!(arr[[0, 1]], 1.0);
    }

    #[test]
    fn test_scale_and_accumulate() {
        let g = grid();
        let mut a = GridTable::from_values(&g, vec![1.0; 6]).unwrap();
        let b = GridTable::from_values(&g, vec![2.0; 6]).unwrap();
        a.scale(3.0);
        a.accumulate(&b).unwrap();
        assert!(a.values().iter().all(|&v| v == 5.0));

        let other = GridTable::zeros(&GridSpec::new(Bounds::new(0.0, 0.0, 1.0, 1.0), 2, 2).unwrap());
        assert!(a.accumulate(&other).is_err());
    }

    #[test]
    fn test_value_range() {
        let table =
            GridTable::from_values(&grid(), vec![3.0, -1.0, f64::NAN, 7.0, 0.0, 2.0]).unwrap();
        assert_eq!(table.value_range(), Some((-1.0, 7.0)));
    }
}
