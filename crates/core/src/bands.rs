//! Spectral bands, quality bands and raw granules

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelWindow, Raster};

/// Reflectance bands used by the change-detection engine (Sentinel-2 layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// B02, 490 nm
    Blue,
    /// B03, 560 nm
    Green,
    /// B04, 665 nm
    Red,
    /// B08, 842 nm
    Nir,
    /// B8A, 865 nm
    NarrowNir,
    /// B11, 1610 nm
    Swir1,
    /// B12, 2190 nm
    Swir2,
}

impl Band {
    pub const ALL: &'static [Band] = &[
        Band::Blue,
        Band::Green,
        Band::Red,
        Band::Nir,
        Band::NarrowNir,
        Band::Swir1,
        Band::Swir2,
    ];

    /// Sentinel-2 band identifier.
    pub fn sentinel2_name(&self) -> &'static str {
        match self {
            Band::Blue => "B02",
            Band::Green => "B03",
            Band::Red => "B04",
            Band::Nir => "B08",
            Band::NarrowNir => "B8A",
            Band::Swir1 => "B11",
            Band::Swir2 => "B12",
        }
    }

    pub fn from_sentinel2_name(name: &str) -> Option<Band> {
        Band::ALL
            .iter()
            .copied()
            .find(|b| b.sentinel2_name().eq_ignore_ascii_case(name))
    }
}

/// The per-pixel quality layer delivered with a granule.
#[derive(Debug, Clone)]
pub enum QualityBand {
    /// Sentinel-2 L2A Scene Classification Layer (class codes 0-11)
    SceneClassification(Raster<u8>),
    /// Legacy L1C/L2A QA60 bitmask (bit 10 opaque cloud, bit 11 cirrus)
    Qa60(Raster<u16>),
}

impl QualityBand {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            QualityBand::SceneClassification(r) => r.shape(),
            QualityBand::Qa60(r) => r.shape(),
        }
    }

    pub fn crop(&self, window: &PixelWindow) -> Result<Self> {
        Ok(match self {
            QualityBand::SceneClassification(r) => QualityBand::SceneClassification(r.crop(window)?),
            QualityBand::Qa60(r) => QualityBand::Qa60(r.crop(window)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityBand::SceneClassification(_) => "SCL",
            QualityBand::Qa60(_) => "QA60",
        }
    }
}

/// One raw acquisition, already clipped to the request geometry by the provider.
#[derive(Debug, Clone)]
pub struct Granule {
    pub id: String,
    pub acquired: NaiveDate,
    /// Scene-level cloudy pixel percentage (0-100)
    pub cloud_cover: f64,
    pub transform: GeoTransform,
    /// Raw digital numbers per band
    pub bands: BTreeMap<Band, Raster<u16>>,
    pub quality: Option<QualityBand>,
}

impl Granule {
    /// Look up a raw band, failing with `MalformedGranule` if absent.
    pub fn band(&self, band: Band) -> Result<&Raster<u16>> {
        self.bands.get(&band).ok_or_else(|| Error::MalformedGranule {
            granule: self.id.clone(),
            reason: format!("missing band {}", band.sentinel2_name()),
        })
    }

    /// The same acquisition restricted to the pixels inside `window`.
    pub fn crop(&self, window: &PixelWindow) -> Result<Granule> {
        let bands = self
            .bands
            .iter()
            .map(|(band, raster)| raster.crop(window).map(|r| (*band, r)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let quality = self.quality.as_ref().map(|q| q.crop(window)).transpose()?;
        Ok(Granule {
            id: self.id.clone(),
            acquired: self.acquired,
            cloud_cover: self.cloud_cover,
            transform: self.transform.window(window),
            bands,
            quality,
        })
    }

    /// Grid shape shared by every band, checked for consistency.
    pub fn shape(&self) -> Result<(usize, usize)> {
        let mut shape = None;
        for (band, raster) in &self.bands {
            match shape {
                None => shape = Some(raster.shape()),
                Some(s) if s != raster.shape() => {
                    return Err(Error::MalformedGranule {
                        granule: self.id.clone(),
                        reason: format!(
                            "band {} is {:?}, expected {:?}",
                            band.sentinel2_name(),
                            raster.shape(),
                            s
                        ),
                    })
                }
                Some(_) => {}
            }
        }
        shape.ok_or_else(|| Error::MalformedGranule {
            granule: self.id.clone(),
            reason: "granule has no bands".into(),
        })
    }
}
