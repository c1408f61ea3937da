//! Cloud and shadow masking with reflectance scaling
//!
//! Pixels flagged unusable by the granule's quality band become `NoData`
//! in every reflectance band. Usable pixels are scaled from digital
//! numbers to surface reflectance (`DN / 10000`).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::Array2;
use verdant_core::{Band, Error, GeoTransform, Granule, QualityBand, Result, Sample, SampleGrid};

use crate::maybe_rayon::map_pixels;

/// Sentinel-2 L2A digital-number to reflectance divisor.
pub const REFLECTANCE_SCALE: f64 = 10_000.0;

/// Sentinel-2 Scene Classification Layer codes.
pub mod scl {
    pub const NO_DATA: u8 = 0;
    pub const SATURATED_OR_DEFECTIVE: u8 = 1;
    pub const DARK_AREA: u8 = 2;
    pub const CLOUD_SHADOW: u8 = 3;
    pub const VEGETATION: u8 = 4;
    pub const NOT_VEGETATED: u8 = 5;
    pub const WATER: u8 = 6;
    pub const UNCLASSIFIED: u8 = 7;
    pub const CLOUD_MEDIUM_PROBABILITY: u8 = 8;
    pub const CLOUD_HIGH_PROBABILITY: u8 = 9;
    pub const THIN_CIRRUS: u8 = 10;
    pub const SNOW_ICE: u8 = 11;
}

/// QA60 opaque-cloud bit
pub const QA60_OPAQUE_CLOUD: u16 = 1 << 10;
/// QA60 cirrus bit
pub const QA60_CIRRUS: u16 = 1 << 11;

/// Parameters for [`mask_granule`]
#[derive(Debug, Clone, PartialEq)]
pub struct MaskParams {
    /// SCL classes whose pixels are kept
    pub retained_classes: Vec<u8>,
    /// Bands to scale into the masked output
    pub bands: Vec<Band>,
    /// Divisor applied to raw digital numbers
    pub scale: f64,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            retained_classes: vec![
                scl::VEGETATION,
                scl::NOT_VEGETATED,
                scl::WATER,
                scl::UNCLASSIFIED,
                scl::SNOW_ICE,
            ],
            bands: Band::ALL.to_vec(),
            scale: REFLECTANCE_SCALE,
        }
    }
}

/// A granule after masking: reflectance grids with explicit no-data.
#[derive(Debug, Clone)]
pub struct MaskedGranule {
    pub id: String,
    pub acquired: NaiveDate,
    pub transform: GeoTransform,
    pub bands: BTreeMap<Band, SampleGrid>,
}

impl MaskedGranule {
    pub fn band(&self, band: Band) -> Option<&SampleGrid> {
        self.bands.get(&band)
    }

    /// Number of pixels kept by the quality mask (in the first band).
    pub fn usable_count(&self) -> usize {
        self.bands.values().next().map_or(0, SampleGrid::valid_count)
    }
}

/// Per-pixel usability derived from a quality band.
pub fn usable_pixels(quality: &QualityBand, params: &MaskParams) -> Array2<bool> {
    match quality {
        QualityBand::SceneClassification(scl) => scl
            .data()
            .mapv(|class| params.retained_classes.contains(&class)),
        QualityBand::Qa60(qa) => qa
            .data()
            .mapv(|bits| bits & (QA60_OPAQUE_CLOUD | QA60_CIRRUS) == 0),
    }
}

/// Mask a raw granule and scale its bands to reflectance.
///
/// A digital number of 0 is the Sentinel-2 fill value and is treated as
/// no-data even on usable pixels.
///
/// # Errors
/// - `MissingQualityBand` when the granule carries no SCL/QA60 layer
/// - `MalformedGranule` when bands or quality layer disagree in shape,
///   or a requested band is missing
pub fn mask_granule(granule: &Granule, params: &MaskParams) -> Result<MaskedGranule> {
    let quality = granule
        .quality
        .as_ref()
        .ok_or_else(|| Error::MissingQualityBand {
            granule: granule.id.clone(),
        })?;

    let (rows, cols) = granule.shape()?;
    if quality.shape() != (rows, cols) {
        return Err(Error::MalformedGranule {
            granule: granule.id.clone(),
            reason: format!(
                "{} layer is {:?}, bands are {:?}",
                quality.name(),
                quality.shape(),
                (rows, cols)
            ),
        });
    }
    if params.scale <= 0.0 || !params.scale.is_finite() {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: params.scale.to_string(),
            reason: "reflectance divisor must be positive".into(),
        });
    }

    let keep = usable_pixels(quality, params);
    let mut bands = BTreeMap::new();

    for &band in &params.bands {
        let raw = granule.band(band)?;
        let grid = map_pixels(rows, cols, granule.transform, |row, col| {
            let dn = raw.data()[(row, col)];
            if !keep[(row, col)] || dn == 0 || raw.is_nodata(dn) {
                Sample::NoData
            } else {
                Sample::new(dn as f64 / params.scale)
            }
        })?;
        bands.insert(band, grid);
    }

    Ok(MaskedGranule {
        id: granule.id.clone(),
        acquired: granule.acquired,
        transform: granule.transform,
        bands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use verdant_core::Raster;

    fn granule(quality: Option<QualityBand>) -> Granule {
        let mut bands = BTreeMap::new();
        for band in Band::ALL {
            bands.insert(*band, Raster::filled(2, 2, 2500u16));
        }
        Granule {
            id: "S2A_TEST".into(),
            acquired: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            cloud_cover: 5.0,
            transform: GeoTransform::default(),
            bands,
            quality,
        }
    }

    #[test]
    fn test_scl_retains_clear_classes() {
        let scl = Raster::from_vec(
            vec![
                scl::VEGETATION,
                scl::CLOUD_SHADOW,
                scl::CLOUD_HIGH_PROBABILITY,
                scl::SNOW_ICE,
            ],
            2,
            2,
        )
        .unwrap();
        let masked =
            mask_granule(&granule(Some(QualityBand::SceneClassification(scl))), &MaskParams::default())
                .unwrap();
        let red = masked.band(Band::Red).unwrap();

        assert_relative_eq!(red.get(0, 0).unwrap().value().unwrap(), 0.25, epsilon = 1e-12);
        assert_eq!(red.get(0, 1).unwrap(), Sample::NoData);
        assert_eq!(red.get(1, 0).unwrap(), Sample::NoData);
        assert!(red.get(1, 1).unwrap().is_defined());
        assert_eq!(masked.usable_count(), 2);
    }

    #[test]
    fn test_every_cloud_class_is_masked() {
        for class in [
            scl::NO_DATA,
            scl::SATURATED_OR_DEFECTIVE,
            scl::DARK_AREA,
            scl::CLOUD_SHADOW,
            scl::CLOUD_MEDIUM_PROBABILITY,
            scl::CLOUD_HIGH_PROBABILITY,
            scl::THIN_CIRRUS,
        ] {
            let quality = QualityBand::SceneClassification(Raster::filled(2, 2, class));
            let masked = mask_granule(&granule(Some(quality)), &MaskParams::default()).unwrap();
            assert_eq!(masked.usable_count(), 0, "class {class} should be masked");
        }
    }

    #[test]
    fn test_qa60_bits() {
        let qa = Raster::from_vec(vec![0u16, QA60_OPAQUE_CLOUD, QA60_CIRRUS, 1], 2, 2).unwrap();
        let masked = mask_granule(&granule(Some(QualityBand::Qa60(qa))), &MaskParams::default()).unwrap();
        let nir = masked.band(Band::Nir).unwrap();

        assert!(nir.get(0, 0).unwrap().is_defined());
        assert!(!nir.get(0, 1).unwrap().is_defined());
        assert!(!nir.get(1, 0).unwrap().is_defined());
        assert!(nir.get(1, 1).unwrap().is_defined());
    }

    #[test]
    fn test_fill_value_is_nodata() {
        let mut g = granule(Some(QualityBand::SceneClassification(Raster::filled(
            2,
            2,
            scl::VEGETATION,
        ))));
        g.bands.get_mut(&Band::Blue).unwrap().set(1, 1, 0).unwrap();
        let masked = mask_granule(&g, &MaskParams::default()).unwrap();

        assert_eq!(masked.band(Band::Blue).unwrap().get(1, 1).unwrap(), Sample::NoData);
        assert!(masked.band(Band::Red).unwrap().get(1, 1).unwrap().is_defined());
    }

    #[test]
    fn test_missing_quality_band() {
        let result = mask_granule(&granule(None), &MaskParams::default());
        assert!(matches!(result, Err(Error::MissingQualityBand { .. })));
    }

    #[test]
    fn test_quality_shape_mismatch() {
        let quality = QualityBand::SceneClassification(Raster::filled(3, 3, scl::VEGETATION));
        let result = mask_granule(&granule(Some(quality)), &MaskParams::default());
        assert!(matches!(result, Err(Error::MalformedGranule { .. })));
    }

    #[test]
    fn test_masking_is_deterministic() {
        let quality = QualityBand::SceneClassification(Raster::filled(2, 2, scl::WATER));
        let g = granule(Some(quality));
        let a = mask_granule(&g, &MaskParams::default()).unwrap();
        let b = mask_granule(&g, &MaskParams::default()).unwrap();
        assert_eq!(a.bands, b.bands);
    }
}
