//! Weighted combination of several layers
//!
//! Each layer is evaluated on its own (sources may differ), scaled by its
//! dataset weight and summed cell by cell. The sum is not renormalized.

use crate::evaluate::Engine;
use crate::layer::LayerSpec;
use heatgis_core::{GridSpec, GridTable, Result};
use tracing::debug;

impl Engine {
    /// Sum of the dataset-weighted layers over `grid`.
    ///
    /// An empty layer list yields an all-zero table. The first failing layer
    /// aborts the combination.
    pub fn evaluate_combination(&self, grid: &GridSpec, specs: &[LayerSpec]) -> Result<GridTable> {
        let mut total = GridTable::zeros(grid);
        for (i, spec) in specs.iter().enumerate() {
            let layer = self.evaluate_layer(grid, spec)?;
            total.accumulate(&layer)?;
            debug!("Combined layer {}/{}: {}", i + 1, specs.len(), spec);
        }
        Ok(total)
    }
}
