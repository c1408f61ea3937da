//! Raster data structures and region reductions

mod element;
mod geotransform;
mod grid;
mod mask;
mod sample;

pub use element::RasterElement;
pub use geotransform::{GeoTransform, PixelWindow};
pub use grid::Raster;
pub use mask::LossMask;
pub use sample::{GridStatistics, Sample, SampleGrid, DIVISION_EPSILON};
