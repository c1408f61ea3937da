//! Per-pixel median compositing over a date window
//!
//! Admissible granules (acquired inside the window, scene cloud cover
//! strictly below the limit) are masked and reduced band by band to the
//! median of their defined samples. Pixels with no clear observation stay
//! `NoData`.

use std::collections::BTreeMap;

use verdant_core::{Band, BoundingBox, DateWindow, Error, GeoTransform, Granule, Result, Sample, SampleGrid};

use super::masking::{mask_granule, MaskParams, MaskedGranule};
use crate::maybe_rayon::map_pixels;

/// Parameters for [`build_composite`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeParams {
    /// Symmetric month offset around the requested date
    pub offset_months: u32,
    /// Scenes must be strictly below this cloudy-pixel percentage
    pub max_cloud_cover: f64,
    pub mask: MaskParams,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            offset_months: 1,
            max_cloud_cover: 50.0,
            mask: MaskParams::default(),
        }
    }
}

/// A cloud-reduced median reflectance image for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterComposite {
    pub geometry: BoundingBox,
    pub window: DateWindow,
    /// Granules that passed admission and contributed to the median
    pub granule_count: usize,
    pub transform: GeoTransform,
    pub bands: BTreeMap<Band, SampleGrid>,
}

impl RasterComposite {
    pub fn band(&self, band: Band) -> Option<&SampleGrid> {
        self.bands.get(&band)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.bands
            .values()
            .next()
            .map_or((0, 0), SampleGrid::shape)
    }

    /// Whether no band has a single defined pixel.
    pub fn is_empty(&self) -> bool {
        self.bands.values().all(SampleGrid::is_all_nodata)
    }
}

/// Granules admissible for `window`: acquired inside it and with scene
/// cloud cover strictly below `max_cloud_cover`.
///
/// Returned in acquisition order (ties broken by id) so downstream
/// reductions see a stable sequence regardless of provider ordering.
pub fn admissible<'a>(
    granules: &'a [Granule],
    window: &DateWindow,
    max_cloud_cover: f64,
) -> Vec<&'a Granule> {
    let mut admitted: Vec<&Granule> = granules
        .iter()
        .filter(|g| window.contains(g.acquired) && g.cloud_cover < max_cloud_cover)
        .collect();
    admitted.sort_by(|a, b| a.acquired.cmp(&b.acquired).then_with(|| a.id.cmp(&b.id)));
    admitted
}

/// Median of a sample set; even counts average the two middle values.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Build the median composite of `granules` over `window`.
///
/// # Errors
/// - `NoDataAvailable` when no granule is admissible or every admitted
///   pixel is masked
/// - `MissingQualityBand` / `MalformedGranule` from masking
/// - `MalformedGranule` when admitted granules are not on one grid
pub fn build_composite(
    granules: &[Granule],
    geometry: BoundingBox,
    window: DateWindow,
    params: &CompositeParams,
) -> Result<RasterComposite> {
    let no_data = || Error::NoDataAvailable { window, geometry };

    let admitted = admissible(granules, &window, params.max_cloud_cover);
    if admitted.is_empty() {
        return Err(no_data());
    }

    let masked = admitted
        .iter()
        .map(|g| mask_granule(g, &params.mask))
        .collect::<Result<Vec<_>>>()?;

    let (transform, rows, cols) = common_grid(&masked)?;

    let mut bands = BTreeMap::new();
    for &band in &params.mask.bands {
        let layers: Vec<&SampleGrid> = masked.iter().filter_map(|m| m.band(band)).collect();
        let grid = map_pixels(rows, cols, transform, |row, col| {
            let mut values: Vec<f64> = layers
                .iter()
                .filter_map(|layer| layer.data()[(row, col)].value())
                .collect();
            median(&mut values).map_or(Sample::NoData, Sample::new)
        })?;
        bands.insert(band, grid);
    }

    let composite = RasterComposite {
        geometry,
        window,
        granule_count: masked.len(),
        transform,
        bands,
    };
    if composite.is_empty() {
        return Err(no_data());
    }
    Ok(composite)
}

fn common_grid(masked: &[MaskedGranule]) -> Result<(GeoTransform, usize, usize)> {
    let first = masked.first().ok_or_else(|| Error::Other("no granules to composite".into()))?;
    let shape = first
        .bands
        .values()
        .next()
        .map(SampleGrid::shape)
        .ok_or_else(|| Error::MalformedGranule {
            granule: first.id.clone(),
            reason: "granule has no bands".into(),
        })?;

    for other in &masked[1..] {
        let other_shape = other.bands.values().next().map(SampleGrid::shape);
        if other_shape != Some(shape) || !other.transform.aligned_with(&first.transform) {
            return Err(Error::MalformedGranule {
                granule: other.id.clone(),
                reason: format!("not aligned with the grid of '{}'", first.id),
            });
        }
    }
    Ok((first.transform, shape.0, shape.1))
}
