//! # Verdant Core
//!
//! Core types and traits shared by every Verdant crate.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced grid for raw band data
//! - `SampleGrid`: derived grids with an explicit per-pixel no-data channel
//! - `LossMask`: boolean per-pixel loss classification
//! - `BoundingBox` / `DateWindow`: the spatial and temporal request model
//! - `Granule` / `Band` / `QualityBand`: raw acquisitions from a raster provider
//! - `RasterSource`: the async seam to the external imagery provider
//! - `MetricsRecord`: the region-level result of one analysis run

pub mod bands;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod raster;
pub mod source;

pub use bands::{Band, Granule, QualityBand};
pub use error::{Error, Result};
pub use geometry::{BoundingBox, DateWindow};
pub use metrics::MetricsRecord;
pub use raster::{
    GeoTransform, LossMask, PixelWindow, Raster, RasterElement, Sample, SampleGrid, DIVISION_EPSILON,
};
pub use source::{GranuleQuery, RasterSource, RenderHandle, RenderKind, RenderRequest};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bands::{Band, Granule, QualityBand};
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{BoundingBox, DateWindow};
    pub use crate::metrics::MetricsRecord;
    pub use crate::raster::{
        GeoTransform, LossMask, PixelWindow, Raster, RasterElement, Sample, SampleGrid,
        DIVISION_EPSILON,
    };
    pub use crate::source::{GranuleQuery, RasterSource, RenderHandle, RenderKind, RenderRequest};
}
