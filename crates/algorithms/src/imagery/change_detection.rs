//! Change detection between two composites
//!
//! - Per-index difference rasters `after - before` and their region means
//! - Pixel loss mask combining an index drop with a historical anomaly

use std::collections::BTreeMap;

use ndarray::Zip;
use verdant_core::{Error, LossMask, Result, Sample, SampleGrid};

use super::indices::{IndexRaster, IndexSet, SpectralIndex};
use crate::statistics::AnomalyRaster;

/// Parameters for the pixel loss mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossMaskParams {
    /// Index drop below which a pixel counts as a loss candidate
    pub drop_threshold: f64,
    /// Z-score below which a pixel is anomalous
    pub z_threshold: f64,
    /// Index whose difference drives the mask
    pub index: SpectralIndex,
}

impl Default for LossMaskParams {
    fn default() -> Self {
        Self {
            drop_threshold: -0.15,
            z_threshold: -2.0,
            index: SpectralIndex::Evi,
        }
    }
}

/// `after - before` for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDelta {
    pub index: SpectralIndex,
    pub grid: SampleGrid,
    /// Region mean over defined pixels
    pub mean: Option<f64>,
}

/// Difference of one index between two dates.
///
/// # Errors
/// `InvalidParameter` when the two rasters hold different indices,
/// `SizeMismatch` when their grids differ.
pub fn index_delta(before: &IndexRaster, after: &IndexRaster) -> Result<IndexDelta> {
    if before.index != after.index {
        return Err(Error::InvalidParameter {
            name: "index",
            value: after.index.to_string(),
            reason: format!("cannot difference against {}", before.index),
        });
    }
    let grid = after.grid.zip_with(&before.grid, |a, b| a - b)?;
    let mean = grid.mean();
    Ok(IndexDelta {
        index: after.index,
        grid,
        mean,
    })
}

/// Differences for every index present in both sets.
pub fn index_deltas(before: &IndexSet, after: &IndexSet) -> Result<BTreeMap<SpectralIndex, IndexDelta>> {
    before
        .iter()
        .filter_map(|(index, b)| after.get(index).map(|a| (index, b, a)))
        .map(|(&index, b, a)| index_delta(b, a).map(|delta| (index, delta)))
        .collect()
}

/// Pixels that both dropped by more than the threshold and are anomalous
/// relative to their history.
///
/// A `NoData` difference or z-score makes the pixel not lost.
pub fn loss_mask(delta: &IndexDelta, anomaly: &AnomalyRaster, params: &LossMaskParams) -> Result<LossMask> {
    if delta.index != params.index {
        return Err(Error::InvalidParameter {
            name: "index",
            value: delta.index.to_string(),
            reason: format!("loss mask is configured for {}", params.index),
        });
    }
    delta.grid.check_same_shape(&anomaly.grid)?;

    let data = Zip::from(delta.grid.data())
        .and(anomaly.grid.data())
        .map_collect(|d, z| match (*d, *z) {
            (Sample::Defined(d), Sample::Defined(z)) => {
                d < params.drop_threshold && z < params.z_threshold
            }
            _ => false,
        });
    Ok(LossMask::from_array(data, *delta.grid.transform()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use verdant_core::GeoTransform;

    fn raster(index: SpectralIndex, values: Vec<f64>) -> IndexRaster {
        let n = values.len();
        IndexRaster {
            index,
            source: "test".into(),
            grid: SampleGrid::from_values(values, 1, n, GeoTransform::default()).unwrap(),
        }
    }

    fn anomaly(values: Vec<f64>) -> AnomalyRaster {
        let n = values.len();
        AnomalyRaster {
            index: SpectralIndex::Evi,
            grid: SampleGrid::from_values(values, 1, n, GeoTransform::default()).unwrap(),
        }
    }

    #[test]
    fn test_delta_and_mean() {
        let before = raster(SpectralIndex::Ndvi, vec![0.8, 0.6, f64::NAN]);
        let after = raster(SpectralIndex::Ndvi, vec![0.3, 0.7, 0.5]);

        let delta = index_delta(&before, &after).unwrap();
        assert_relative_eq!(delta.grid.get(0, 0).unwrap().value().unwrap(), -0.5, epsilon = 1e-12);
        assert_eq!(delta.grid.get(0, 2).unwrap(), Sample::NoData);
        assert_relative_eq!(delta.mean.unwrap(), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_rejects_mixed_indices() {
        let before = raster(SpectralIndex::Ndvi, vec![0.5]);
        let after = raster(SpectralIndex::Evi, vec![0.5]);
        assert!(index_delta(&before, &after).is_err());
    }

    #[test]
    fn test_loss_mask_requires_both_conditions() {
        let delta = index_delta(
            &raster(SpectralIndex::Evi, vec![0.6, 0.6, 0.6, 0.6]),
            &raster(SpectralIndex::Evi, vec![0.3, 0.3, 0.55, 0.3]),
        )
        .unwrap();
        let z = anomaly(vec![-3.0, -1.0, -3.0, f64::NAN]);

        let mask = loss_mask(&delta, &z, &LossMaskParams::default()).unwrap();
        assert!(mask.is_lost(0, 0).unwrap());
        assert!(!mask.is_lost(0, 1).unwrap());
        assert!(!mask.is_lost(0, 2).unwrap());
        assert!(!mask.is_lost(0, 3).unwrap());
        assert_eq!(mask.lost_count(), 1);
    }

    #[test]
    fn test_loss_mask_thresholds_are_strict() {
        let delta = IndexDelta {
            index: SpectralIndex::Evi,
            grid: SampleGrid::from_values(vec![-0.15, -0.16], 1, 2, GeoTransform::default()).unwrap(),
            mean: None,
        };
        let z = anomaly(vec![-2.5, -2.0]);
        let mask = loss_mask(&delta, &z, &LossMaskParams::default()).unwrap();
        assert_eq!(mask.lost_count(), 0);
    }

    #[test]
    fn test_index_deltas_cover_shared_indices() {
        let mut before = IndexSet::new();
        let mut after = IndexSet::new();
        for index in SpectralIndex::ALL {
            before.insert(*index, raster(*index, vec![0.4, 0.4]));
            after.insert(*index, raster(*index, vec![0.1, 0.2]));
        }
        after.remove(&SpectralIndex::Nbr);

        let deltas = index_deltas(&before, &after).unwrap();
        assert_eq!(deltas.len(), 4);
        assert_relative_eq!(deltas[&SpectralIndex::Ndvi].mean.unwrap(), -0.25, epsilon = 1e-12);
    }
}
