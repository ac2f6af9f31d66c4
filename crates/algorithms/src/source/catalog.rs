//! Named registry of loaded sources

use super::GeoSource;
use heatgis_core::{Bounds, Error, Result, CRS};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Map of source id to [`GeoSource`], all sharing one metric CRS.
#[derive(Debug)]
pub struct GeoCatalog {
    metric_crs: CRS,
    sources: BTreeMap<String, GeoSource>,
}

impl Default for GeoCatalog {
    fn default() -> Self {
        Self::new(CRS::web_mercator())
    }
}

impl GeoCatalog {
    pub fn new(metric_crs: CRS) -> Self {
        Self {
            metric_crs,
            sources: BTreeMap::new(),
        }
    }

    pub fn metric_crs(&self) -> CRS {
        self.metric_crs
    }

    /// Register `source` under `id`, replacing any previous entry.
    pub fn add(&mut self, id: impl Into<String>, source: GeoSource) -> Result<()> {
        if source.metric_crs() != self.metric_crs {
            return Err(Error::CrsMismatch(
                source.metric_crs().identifier(),
                self.metric_crs.identifier(),
            ));
        }
        let id = id.into();
        if self.sources.insert(id.clone(), source).is_some() {
            warn!("Source '{}' replaced", id);
        }
        Ok(())
    }

    /// Load a file and register it under `id`.
    ///
    /// A failed load leaves the catalog unchanged.
    pub fn load<P: AsRef<Path>>(&mut self, id: impl Into<String>, path: P) -> Result<()> {
        let id = id.into();
        let source = GeoSource::load_with_crs(path, self.metric_crs)?;
        info!("Registered source '{}'", id);
        self.add(id, source)
    }

    pub fn get(&self, id: &str) -> Result<&GeoSource> {
        self.sources
            .get(id)
            .ok_or_else(|| Error::UnknownSource(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Union of every source's WGS84 bounds.
    pub fn combined_bounds_wgs(&self) -> Result<Bounds> {
        self.sources
            .values()
            .map(GeoSource::bounds_wgs)
            .reduce(|a, b| a.merge(&b))
            .ok_or(Error::EmptyCatalog)
    }
}
