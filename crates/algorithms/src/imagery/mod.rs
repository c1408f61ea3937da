//! Imagery analysis algorithms
//!
//! - Masking: SCL/QA60 cloud and shadow removal, DN to reflectance
//! - Compositing: per-pixel median over a date window
//! - Spectral indices: NDVI, EVI, NDMI, NDBI, NBR
//! - Change detection: index differences and the pixel loss mask

mod change_detection;
mod composite;
mod indices;
mod masking;

pub use change_detection::{index_delta, index_deltas, loss_mask, IndexDelta, LossMaskParams};
pub use composite::{admissible, build_composite, median, CompositeParams, RasterComposite};
pub use indices::{
    compute_all, compute_index, evi, nbr, ndbi, ndmi, ndvi, normalized_difference, EviParams,
    IndexRaster, IndexSet, ReflectanceSource, SpectralIndex,
};
pub use masking::{
    mask_granule, scl, usable_pixels, MaskParams, MaskedGranule, QA60_CIRRUS, QA60_OPAQUE_CLOUD,
    REFLECTANCE_SCALE,
};
