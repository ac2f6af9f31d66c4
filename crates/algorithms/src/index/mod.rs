//! Spatial indexes built once per source at load time
//!
//! - [`KdTree`]: point records and polygon centroids
//! - [`SegmentIndex`]: line parts and polygon outlines (rstar R-tree)

pub mod kdtree;
mod segments;

pub use kdtree::{IndexedPoint, KdTree, NearestResult};
pub use segments::SegmentIndex;
