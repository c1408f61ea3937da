//! Statistical analysis over index rasters
//!
//! - **baseline**: per-pixel historical mean and standard deviation
//! - **anomaly**: z-scores of the after image against the baseline
//! - **area**: ground area of the loss mask

pub mod anomaly;
pub mod area;
pub mod baseline;

pub use anomaly::{z_scores, AnomalyRaster};
pub use area::{loss_area_m2, metres_per_degree, pixel_area_m2, AreaParams, EARTH_MEAN_RADIUS_M};
pub use baseline::{estimate_baseline, historical_windows, BaselineParams, BaselineStats};
