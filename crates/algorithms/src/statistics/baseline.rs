//! Per-pixel historical baseline
//!
//! For each of the previous `L` years, the caller composites the same
//! calendar window and computes the baseline index. This module turns
//! that per-year stack into a per-pixel mean and population standard
//! deviation, plus the region means reported in the metrics record.

use ndarray::Array2;
use verdant_core::{DateWindow, Error, GeoTransform, Result, Sample, SampleGrid, DIVISION_EPSILON};

use crate::imagery::{IndexRaster, SpectralIndex};
use crate::maybe_rayon::map_pixels;

/// Parameters for the historical baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineParams {
    /// Number of previous years to composite (`L`)
    pub lookback_years: u32,
    pub index: SpectralIndex,
    /// Minimum defined yearly samples for a pixel to get a sigma
    pub min_samples: usize,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            lookback_years: 2,
            index: SpectralIndex::Evi,
            min_samples: 2,
        }
    }
}

impl BaselineParams {
    pub fn validate(&self) -> Result<()> {
        if self.lookback_years == 0 {
            return Err(Error::InvalidParameter {
                name: "lookback_years",
                value: "0".into(),
                reason: "a baseline needs at least one historical year".into(),
            });
        }
        if self.min_samples < 2 {
            return Err(Error::InvalidParameter {
                name: "min_samples",
                value: self.min_samples.to_string(),
                reason: "a standard deviation needs at least two samples".into(),
            });
        }
        Ok(())
    }
}

/// The same calendar window in each of the previous `lookback_years` years,
/// nearest year first.
pub fn historical_windows(window: &DateWindow, lookback_years: u32) -> Result<Vec<DateWindow>> {
    (1..=lookback_years).map(|k| window.shifted_years(k)).collect()
}

/// Per-pixel historical statistics for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineStats {
    pub index: SpectralIndex,
    /// Mean over defined yearly samples; `NoData` with no samples
    pub mu: SampleGrid,
    /// Population standard deviation; `NoData` below `min_samples` or when zero
    pub sigma: SampleGrid,
    /// Defined yearly samples per pixel
    pub sample_counts: Array2<u32>,
    /// Historical years that contributed a composite
    pub years_used: u32,
}

impl BaselineStats {
    /// Statistics when no historical year was available.
    pub fn empty(index: SpectralIndex, rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            index,
            mu: SampleGrid::nodata(rows, cols, transform),
            sigma: SampleGrid::nodata(rows, cols, transform),
            sample_counts: Array2::zeros((rows, cols)),
            years_used: 0,
        }
    }

    /// Region mean of `mu` (`historical_baseline_mu`).
    pub fn mean_mu(&self) -> Option<f64> {
        self.mu.mean()
    }

    /// Region mean of `sigma` (`historical_variability_sigma`).
    pub fn mean_sigma(&self) -> Option<f64> {
        self.sigma.mean()
    }
}

/// Reduce a stack of yearly index rasters to per-pixel mean and sigma.
///
/// `template` fixes the output grid; every yearly raster must share its
/// shape. Years are reduced in the order given, which the caller keeps
/// stable so results are reproducible bit for bit.
pub fn estimate_baseline(
    yearly: &[IndexRaster],
    template: &SampleGrid,
    params: &BaselineParams,
) -> Result<BaselineStats> {
    params.validate()?;
    let (rows, cols) = template.shape();
    let transform = *template.transform();

    for year in yearly {
        if year.index != params.index {
            return Err(Error::InvalidParameter {
                name: "index",
                value: year.index.to_string(),
                reason: format!("baseline is configured for {}", params.index),
            });
        }
        template.check_same_shape(&year.grid)?;
    }

    if yearly.is_empty() {
        return Ok(BaselineStats::empty(params.index, rows, cols, transform));
    }

    let samples_at = |row: usize, col: usize| -> Vec<f64> {
        yearly
            .iter()
            .filter_map(|y| y.grid.data()[(row, col)].value())
            .collect()
    };

    let mu = map_pixels(rows, cols, transform, |row, col| {
        let values = samples_at(row, col);
        if values.is_empty() {
            Sample::NoData
        } else {
            Sample::new(values.iter().sum::<f64>() / values.len() as f64)
        }
    })?;

    let sigma = map_pixels(rows, cols, transform, |row, col| {
        let values = samples_at(row, col);
        if values.len() < params.min_samples {
            return Sample::NoData;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let sd = variance.sqrt();
        if sd < DIVISION_EPSILON {
            Sample::NoData
        } else {
            Sample::new(sd)
        }
    })?;

    let sample_counts = Array2::from_shape_fn((rows, cols), |(row, col)| {
        yearly
            .iter()
            .filter(|y| y.grid.data()[(row, col)].is_defined())
            .count() as u32
    });

    Ok(BaselineStats {
        index: params.index,
        mu,
        sigma,
        sample_counts,
        years_used: yearly.len() as u32,
    })
}
