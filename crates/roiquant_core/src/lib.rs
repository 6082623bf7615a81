//! ROI Geometry & Measurement Core Library
//!
//! Pure Rust engine for quantitative fluorescence-image analysis: seeded
//! region-growing segmentation, mask ↔ vector polygon conversion, polygon
//! set algebra with overlap metrics, background-corrected intensity
//! measurement, and colocalization statistics. This crate contains all
//! algorithm logic without any UI or host-binding code.

pub mod channel;
pub mod clip;
pub mod codec;
pub mod coloc;
pub mod collection;
pub mod float_trait;
pub mod measure;
pub mod overlap;
pub mod roi;
pub mod segmentation;

// Re-export commonly used types at the crate root
pub use channel::{BitDepth, Channel, ChannelData, ComponentMap};
pub use clip::{
    clip_rings, difference_paths, intersect_paths, path_area, path_centroid, union_paths, BoolOp,
    Point2, Ring,
};
pub use codec::{adaptive_tolerance, rasterize, vectorize};
pub use coloc::{manders, manders_channels, pcc, pcc_channels};
pub use collection::{RoiCollection, RoiGeometry};
pub use float_trait::QuantFloat;
pub use measure::{measure, measure_batch, BackgroundMethod, MeasureOptions, RoiMeasurement};
pub use overlap::{matrix, multi, pairwise, pairwise_with_intensity, OverlapMatrix, PairwiseOverlap};
pub use roi::{Roi, RoiKind, RoiRecord};
pub use segmentation::{
    largest_component, region_grow, region_grow_channel, split_components, ToleranceMode,
    WandConfig,
};
