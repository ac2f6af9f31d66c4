//! Equal-width binning of metric coordinates onto the grid layout

use heatgis_core::{Bounds, GridSpec, Result};

/// `nx x ny` half-open bins spanning the grid's metric extent.
///
/// Bin `(row, col)` covers `[x0 + col*w, x0 + (col+1)*w) x [y0 + row*h, ...)`
/// and maps to flat index `row * nx + col`. Coordinates outside the extent
/// are clamped into the edge bins.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bins {
    extent: Bounds,
    nx: usize,
    ny: usize,
}

impl Bins {
    pub fn for_grid(grid: &GridSpec) -> Result<Self> {
        Ok(Self {
            extent: grid.metric_extent()?,
            nx: grid.nx(),
            ny: grid.ny(),
        })
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Flat index of the bin containing `(x, y)`
    pub fn index(&self, x: f64, y: f64) -> usize {
        let col = axis_bin(x, self.extent.min_x, self.extent.width(), self.nx);
        let row = axis_bin(y, self.extent.min_y, self.extent.height(), self.ny);
        row * self.nx + col
    }
}

fn axis_bin(v: f64, origin: f64, span: f64, n: usize) -> usize {
    if span <= 0.0 || !v.is_finite() {
        return 0;
    }
    let raw = ((v - origin) / (span / n as f64)).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins() -> Bins {
        Bins {
            extent: Bounds::new(0.0, 0.0, 100.0, 50.0),
            nx: 4,
            ny: 2,
        }
    }

    #[test]
    fn test_half_open_edges() {
        let b = bins();
        assert_eq!(b.index(0.0, 0.0), 0);
        assert_eq!(b.index(24.999, 0.0), 0);
        assert_eq!(b.index(25.0, 0.0), 1);
        assert_eq!(b.index(99.0, 24.0), 3);
        assert_eq!(b.index(0.0, 25.0), 4);
    }

    #[test]
    fn test_clamps_outside_points() {
        let b = bins();
        assert_eq!(b.index(-10.0, -10.0), 0);
        assert_eq!(b.index(100.0, 50.0), 7);
        assert_eq!(b.index(1e9, -1e9), 3);
        assert_eq!(b.len(), 8);
    }
}
