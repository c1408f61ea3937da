//! # Verdant Algorithms
//!
//! Pure raster analytics behind vegetation-loss detection.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Cloud masking, median compositing, spectral indices, change detection
//! - **statistics**: Historical baseline, z-score anomaly, loss area
//! - **decision**: Weighted and hard-rule loss policies
//!
//! Per-pixel loops run row-parallel on rayon when the `parallel` feature
//! is enabled (the default).

pub mod decision;
pub mod imagery;
pub mod statistics;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::decision::{
        DecisionPolicy, DecisionSignals, HardRuleParams, LossDecision, LossModel, PolicyKind,
        WeightedParams,
    };
    pub use crate::imagery::{
        build_composite, compute_all, compute_index, evi, index_deltas, loss_mask, mask_granule,
        nbr, ndbi, ndmi, ndvi, normalized_difference, CompositeParams, IndexDelta, IndexRaster,
        IndexSet, LossMaskParams, MaskParams, RasterComposite, SpectralIndex,
    };
    pub use crate::statistics::{
        estimate_baseline, historical_windows, loss_area_m2, z_scores, AnomalyRaster, AreaParams,
        BaselineParams, BaselineStats,
    };
    pub use verdant_core::prelude::*;
}
