//! Ground area of the loss mask
//!
//! Pixel area on a geographic grid shrinks with the cosine of latitude.
//! Each pixel covers `|dlon| * k * cos(lat) x |dlat| * k` square metres,
//! with `k` the length of one degree on the mean-radius sphere.

use std::f64::consts::PI;

use ndarray::s;
use verdant_core::{Error, GeoTransform, LossMask, Result};

use crate::maybe_rayon::*;

/// IUGG mean Earth radius in metres
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Metres per degree of arc on the mean-radius sphere.
pub fn metres_per_degree() -> f64 {
    2.0 * PI * EARTH_MEAN_RADIUS_M / 360.0
}

/// Parameters for [`loss_area_m2`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaParams {
    /// Reduce `f x f` native pixel blocks to one cell before summing
    pub coarsening: usize,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self { coarsening: 1 }
    }
}

/// Ground area in m² of one native pixel centred on `lat` degrees.
fn pixel_area_at(transform: &GeoTransform, lat: f64) -> f64 {
    let k = metres_per_degree();
    (transform.pixel_width.abs() * k * lat.to_radians().cos()).abs() * transform.pixel_height.abs() * k
}

/// Ground area in m² of one native pixel in `row`.
pub fn pixel_area_m2(transform: &GeoTransform, row: usize) -> f64 {
    pixel_area_at(transform, transform.row_center_lat(row))
}

/// Native pixel area for each band of `f` rows, taken at the band's centre
/// latitude. One latitude evaluation per band.
fn block_row_areas(transform: &GeoTransform, rows: usize, f: usize) -> Vec<f64> {
    (0..rows.div_ceil(f))
        .map(|br| {
            let r0 = br * f;
            let r1 = (r0 + f).min(rows);
            let centre = (r0 + r1) as f64 / 2.0;
            pixel_area_at(transform, transform.origin_y + centre * transform.pixel_height)
        })
        .collect()
}

/// Total ground area of lost pixels, in square metres.
///
/// With coarsening `f > 1` the mask is reduced to `f x f` blocks and every
/// block's lost pixels are weighted by the pixel area at the block-row centre,
/// so latitude is evaluated `rows / f` times instead of `rows`. `f = 1` is
/// the exact per-row sum. Edge blocks cover only the pixels that exist.
pub fn loss_area_m2(mask: &LossMask, params: &AreaParams) -> Result<f64> {
    if params.coarsening == 0 {
        return Err(Error::InvalidParameter {
            name: "coarsening",
            value: "0".into(),
            reason: "must be at least 1".into(),
        });
    }
    let f = params.coarsening;
    let (rows, cols) = mask.shape();
    let data = mask.data();
    let areas = block_row_areas(mask.transform(), rows, f);

    let per_block_row: Vec<f64> = (0..areas.len())
        .into_par_iter()
        .map(|br| {
            let band = data.slice(s![br * f..((br + 1) * f).min(rows), ..]);
            let lost: usize = (0..cols.div_ceil(f))
                .map(|bc| {
                    band.slice(s![.., bc * f..((bc + 1) * f).min(cols)])
                        .iter()
                        .filter(|&&lost| lost)
                        .count()
                })
                .sum();
            lost as f64 * areas[br]
        })
        .collect();

    // Sequential sum keeps the result independent of thread scheduling.
    Ok(per_block_row.iter().sum())
}
