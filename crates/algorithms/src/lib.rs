//! # heatgis Algorithms
//!
//! Spatial aggregation engine for heatgis.
//!
//! ## Components
//!
//! - **source**: `GeoSource` loading and the `GeoCatalog` registry
//! - **index**: KD-tree over points and R-tree over line segments
//! - **decay**: distance decay kernels
//! - **layer**: `LayerSpec`, filters, rank tables and the flat JSON config
//! - **evaluate**: per-family evaluators and the `Engine`
//! - **combine**: weighted sum of several layers
//! - **resample**: zero-order-hold resampling of scattered values

mod maybe_rayon;

pub mod combine;
pub mod decay;
pub mod evaluate;
pub mod index;
pub mod layer;
pub mod resample;
pub mod source;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::decay::{DecayKernel, DecayParams};
    pub use crate::evaluate::{evaluate_source, Engine};
    pub use crate::layer::{
        AggregationMode, Evaluation, LayerConfig, LayerSpec, PropertyFilter, RankTable,
    };
    pub use crate::resample::{resample, ScatteredValue};
    pub use crate::source::{GeoCatalog, GeoSource};
    pub use heatgis_core::prelude::*;
}
