//! # heatgis Core
//!
//! Core types and I/O for the heatgis influence-surface engine.
//!
//! This crate provides:
//! - `GridSpec` / `GridTable`: evaluation lattice and per-cell results
//! - `CRS` / `Projection`: coordinate reference systems and pure-Rust projections
//! - `Feature` / `AttributeValue`: attributed vector records
//! - GeoJSON reading

pub mod crs;
pub mod error;
pub mod grid;
pub mod io;
pub mod vector;

pub use crs::{Projection, CRS};
pub use error::{Error, ErrorKind, Result};
pub use grid::{Bounds, GridSpec, GridTable, GridValue};
pub use vector::{AttributeValue, Feature, FeatureCollection, GeometryFamily};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{Projection, CRS};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::grid::{Bounds, GridSpec, GridTable, GridValue};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection, GeometryFamily};
}
