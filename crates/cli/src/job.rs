//! JSON job files for `heatgis eval`

use anyhow::{Context, Result};
use heatgis_algorithms::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Grid section of a job. Without bounds the catalog's combined bounds are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
    pub nx: usize,
    pub ny: usize,
}

/// Sources to register, the grid to evaluate on and the layers to combine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub metric_crs: Option<CRS>,
    pub sources: BTreeMap<String, PathBuf>,
    pub grid: GridConfig,
    pub layers: Vec<LayerConfig>,
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        let mut job = Self::from_json(&text)?;
        // source paths are relative to the job file
        if let Some(dir) = path.parent() {
            for source in job.sources.values_mut() {
                if source.is_relative() {
                    *source = dir.join(&*source);
                }
            }
        }
        Ok(job)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid job file")
    }

    pub fn metric_crs(&self) -> CRS {
        self.metric_crs.unwrap_or_else(CRS::web_mercator)
    }

    /// Validate every layer before any source is loaded.
    pub fn layer_specs(&self) -> Result<Vec<LayerSpec>> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, cfg)| {
                LayerSpec::try_from(cfg.clone())
                    .with_context(|| format!("Invalid layer #{} ({})", i + 1, cfg.source_id))
            })
            .collect()
    }

    /// Load every source into a catalog and hand it to an engine.
    pub fn build_engine(&self) -> Result<Engine> {
        let mut catalog = GeoCatalog::new(self.metric_crs());
        for (id, path) in &self.sources {
            catalog
                .load(id.as_str(), path)
                .with_context(|| format!("Failed to load source '{}'", id))?;
        }
        info!("Catalog ready: {} sources", catalog.len());
        Ok(Engine::new(catalog))
    }

    pub fn grid(&self, engine: &Engine) -> Result<GridSpec> {
        let grid = match self.grid.bounds {
            Some(bounds) => GridSpec::new(bounds.into(), self.grid.nx, self.grid.ny)?
                .with_metric_crs(self.metric_crs())?,
            None => engine.default_grid(self.grid.nx, self.grid.ny)?,
        };
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"{
        "metric_crs": "EPSG:32633",
        "sources": {"stops": "stops.geojson", "parks": "/data/parks.geojson"},
        "grid": {"bounds": [14.0, 50.0, 14.1, 50.1], "nx": 20, "ny": 10},
        "layers": [
            {"source_id": "stops", "geometry_type": "point", "mode": "sum_k", "k": 4},
            {"source_id": "parks", "geometry_family": "polygon", "mode": "mask",
             "dataset_weight": -0.5}
        ]
    }"#;

    #[test]
    fn test_parse_job() {
        let job = JobConfig::from_json(JOB).unwrap();
        assert_eq!(job.metric_crs(), CRS::utm(33, true));
        assert_eq!(job.sources.len(), 2);
        assert_eq!(job.grid.nx, 20);

        let specs = job.layer_specs().unwrap();
        assert_eq!(specs[0].evaluation(), Evaluation::PointSumK { k: 4 });
        assert_eq!(specs[1].dataset_weight(), -0.5);
    }

    #[test]
    fn test_defaults() {
        let job = JobConfig::from_json(
            r#"{"sources": {}, "grid": {"nx": 5, "ny": 5}, "layers": []}"#,
        )
        .unwrap();
        assert_eq!(job.metric_crs(), CRS::web_mercator());
        assert!(job.grid.bounds.is_none());
    }

    #[test]
    fn test_invalid_layer_is_reported() {
        let job = JobConfig::from_json(
            r#"{"sources": {}, "grid": {"nx": 5, "ny": 5},
                "layers": [{"source_id": "a", "geometry_family": "line", "mode": "mask"}]}"#,
        )
        .unwrap();
        let err = job.layer_specs().unwrap_err();
        assert!(err.to_string().contains("layer #1"));
    }
}
