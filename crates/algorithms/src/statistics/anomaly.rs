//! Standard-score anomaly of the after image against its baseline

use verdant_core::{Error, Result, Sample, SampleGrid};

use super::baseline::BaselineStats;
use crate::imagery::{IndexRaster, SpectralIndex};
use crate::maybe_rayon::map_pixels;

/// Per-pixel z-scores for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRaster {
    pub index: SpectralIndex,
    pub grid: SampleGrid,
}

impl AnomalyRaster {
    /// Region mean over defined pixels (`mean_z_score`).
    pub fn mean(&self) -> Option<f64> {
        self.grid.mean()
    }
}

/// `Z = (after - mu) / sigma`
///
/// `NoData` wherever the after value, mu or sigma is `NoData`.
pub fn z_scores(after: &IndexRaster, baseline: &BaselineStats) -> Result<AnomalyRaster> {
    if after.index != baseline.index {
        return Err(Error::InvalidParameter {
            name: "index",
            value: after.index.to_string(),
            reason: format!("baseline was computed for {}", baseline.index),
        });
    }
    after.grid.check_same_shape(&baseline.mu)?;
    after.grid.check_same_shape(&baseline.sigma)?;

    let (rows, cols) = after.grid.shape();
    let grid = map_pixels(rows, cols, *after.grid.transform(), |row, col| {
        match (
            after.grid.data()[(row, col)],
            baseline.mu.data()[(row, col)],
            baseline.sigma.data()[(row, col)],
        ) {
            (Sample::Defined(x), Sample::Defined(mu), Sample::Defined(sigma)) => {
                Sample::ratio(x - mu, sigma)
            }
            _ => Sample::NoData,
        }
    })?;

    Ok(AnomalyRaster {
        index: after.index,
        grid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{estimate_baseline, BaselineParams};
    use approx::assert_relative_eq;
    use verdant_core::GeoTransform;

    fn evi(values: Vec<f64>) -> IndexRaster {
        let n = values.len();
        IndexRaster {
            index: SpectralIndex::Evi,
            source: "t".into(),
            grid: SampleGrid::from_values(values, 1, n, GeoTransform::default()).unwrap(),
        }
    }

    #[test]
    fn test_z_score_value() {
        let history = vec![evi(vec![0.4, 0.5, 0.5]), evi(vec![0.6, 0.5, f64::NAN])];
        let after = evi(vec![0.2, 0.1, 0.3]);
        let baseline = estimate_baseline(&history, &after.grid, &BaselineParams::default()).unwrap();

        let z = z_scores(&after, &baseline).unwrap();
        // (0.2 - 0.5) / 0.1
        assert_relative_eq!(z.grid.get(0, 0).unwrap().value().unwrap(), -3.0, epsilon = 1e-9);
        // zero sigma and single sample are both undefined
        assert_eq!(z.grid.get(0, 1).unwrap(), Sample::NoData);
        assert_eq!(z.grid.get(0, 2).unwrap(), Sample::NoData);
        assert_relative_eq!(z.mean().unwrap(), -3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_history_gives_no_mean() {
        let after = evi(vec![0.2, 0.1]);
        let baseline = estimate_baseline(&[], &after.grid, &BaselineParams::default()).unwrap();
        let z = z_scores(&after, &baseline).unwrap();
        assert_eq!(z.mean(), None);
    }
}
