//! I/O operations for reading vector datasets

mod geojson;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::FeatureCollection;
use std::path::Path;
use tracing::debug;

/// Decoded vector records plus the CRS the file declares, if any.
#[derive(Debug, Clone, Default)]
pub struct VectorDataset {
    pub features: FeatureCollection,
    pub crs: Option<CRS>,
}

/// Read a GeoJSON file
pub fn read_vector<P: AsRef<Path>>(path: P) -> Result<VectorDataset> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| Error::data_load(&origin, e.to_string()))?;
    let dataset = geojson::parse_document(&text, &origin)?;
    debug!(
        "Read {} features from {} (crs: {})",
        dataset.features.len(),
        origin,
        dataset.crs.map_or_else(|| "undeclared".to_string(), |c| c.identifier())
    );
    Ok(dataset)
}

/// Read a GeoJSON document held in memory
///
/// `origin` names the document in error messages.
pub fn read_vector_from_str(text: &str, origin: &str) -> Result<VectorDataset> {
    geojson::parse_document(text, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_missing_file_is_data_load() {
        let err = read_vector("/nonexistent/heatgis/none.geojson").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
        assert!(err.to_string().contains("none.geojson"));
    }
}
