//! Spectral vegetation, moisture, built-up and burn indices
//!
//! Indices are computed per pixel from reflectance grids. A pixel whose
//! inputs include `NoData`, or whose denominator vanishes, is `NoData`
//! in the output.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use verdant_core::{Band, Error, Result, Sample, SampleGrid};

use super::composite::RasterComposite;
use super::masking::MaskedGranule;
use crate::maybe_rayon::map_pixels;

/// Enumeration of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Enhanced Vegetation Index
    Evi,
    /// Normalized Difference Moisture Index
    Ndmi,
    /// Normalized Difference Built-up Index
    Ndbi,
    /// Normalized Burn Ratio
    Nbr,
}

impl SpectralIndex {
    pub const ALL: &'static [SpectralIndex] = &[
        SpectralIndex::Ndvi,
        SpectralIndex::Evi,
        SpectralIndex::Ndmi,
        SpectralIndex::Ndbi,
        SpectralIndex::Nbr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Evi => "EVI",
            SpectralIndex::Ndmi => "NDMI",
            SpectralIndex::Ndbi => "NDBI",
            SpectralIndex::Nbr => "NBR",
        }
    }

    /// Human-readable formula, recorded alongside every computed raster.
    pub fn formula(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "(NIR - Red) / (NIR + Red)",
            SpectralIndex::Evi => "2.5 * (NIR - Red) / (NIR + 6 * Red - 7.5 * Blue + 1)",
            SpectralIndex::Ndmi => "(NIR - SWIR1) / (NIR + SWIR1)",
            SpectralIndex::Ndbi => "(SWIR1 - NIR) / (SWIR1 + NIR)",
            SpectralIndex::Nbr => "(NIR_narrow - SWIR2) / (NIR_narrow + SWIR2)",
        }
    }

    /// Bands the index reads, in formula order.
    pub fn required_bands(&self) -> &'static [Band] {
        match self {
            SpectralIndex::Ndvi => &[Band::Nir, Band::Red],
            SpectralIndex::Evi => &[Band::Nir, Band::Red, Band::Blue],
            SpectralIndex::Ndmi => &[Band::Nir, Band::Swir1],
            SpectralIndex::Ndbi => &[Band::Swir1, Band::Nir],
            SpectralIndex::Nbr => &[Band::NarrowNir, Band::Swir2],
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SpectralIndex::ALL
            .iter()
            .copied()
            .find(|i| i.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidParameter {
                name: "index",
                value: s.to_string(),
                reason: "expected one of ndvi, evi, ndmi, ndbi, nbr".into(),
            })
    }
}

/// Anything that can hand out reflectance grids by band.
pub trait ReflectanceSource {
    fn reflectance(&self, band: Band) -> Option<&SampleGrid>;

    /// Label recorded as the provenance of derived rasters.
    fn label(&self) -> String;
}

impl ReflectanceSource for RasterComposite {
    fn reflectance(&self, band: Band) -> Option<&SampleGrid> {
        self.band(band)
    }

    fn label(&self) -> String {
        format!("composite {}", self.window)
    }
}

impl ReflectanceSource for MaskedGranule {
    fn reflectance(&self, band: Band) -> Option<&SampleGrid> {
        self.band(band)
    }

    fn label(&self) -> String {
        format!("granule {}", self.id)
    }
}

/// One index computed over one source image.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRaster {
    pub index: SpectralIndex,
    pub source: String,
    pub grid: SampleGrid,
}

impl IndexRaster {
    pub fn formula(&self) -> &'static str {
        self.index.formula()
    }

    /// Region mean over defined pixels.
    pub fn mean(&self) -> Option<f64> {
        self.grid.mean()
    }
}

/// Every supported index over one source image.
pub type IndexSet = BTreeMap<SpectralIndex, IndexRaster>;

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs.
pub fn normalized_difference(band_a: &SampleGrid, band_b: &SampleGrid) -> Result<SampleGrid> {
    band_a.check_same_shape(band_b)?;
    let (rows, cols) = band_a.shape();

    map_pixels(rows, cols, *band_a.transform(), |row, col| {
        match (band_a.data()[(row, col)], band_b.data()[(row, col)]) {
            (Sample::Defined(a), Sample::Defined(b)) => Sample::ratio(a - b, a + b),
            _ => Sample::NoData,
        }
    })
}

/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &SampleGrid, red: &SampleGrid) -> Result<SampleGrid> {
    normalized_difference(nir, red)
}

/// `NDMI = (NIR - SWIR1) / (NIR + SWIR1)`
pub fn ndmi(nir: &SampleGrid, swir1: &SampleGrid) -> Result<SampleGrid> {
    normalized_difference(nir, swir1)
}

/// `NDBI = (SWIR1 - NIR) / (SWIR1 + NIR)`
pub fn ndbi(swir1: &SampleGrid, nir: &SampleGrid) -> Result<SampleGrid> {
    normalized_difference(swir1, nir)
}

/// `NBR = (NIR_narrow - SWIR2) / (NIR_narrow + SWIR2)`
pub fn nbr(narrow_nir: &SampleGrid, swir2: &SampleGrid) -> Result<SampleGrid> {
    normalized_difference(narrow_nir, swir2)
}

// ---------------------------------------------------------------------------
// EVI
// ---------------------------------------------------------------------------

/// Parameters for EVI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EviParams {
    /// Gain factor (default: 2.5)
    pub g: f64,
    /// Aerosol coefficient for red band (default: 6.0)
    pub c1: f64,
    /// Aerosol coefficient for blue band (default: 7.5)
    pub c2: f64,
    /// Canopy background adjustment (default: 1.0)
    pub l: f64,
}

impl Default for EviParams {
    fn default() -> Self {
        Self {
            g: 2.5,
            c1: 6.0,
            c2: 7.5,
            l: 1.0,
        }
    }
}

/// Enhanced Vegetation Index (Huete et al., 2002)
///
/// `EVI = G * (NIR - Red) / (NIR + C1 * Red - C2 * Blue + L)`
///
/// Not bounded to [-1, 1]; values outside it are kept, not clamped.
pub fn evi(
    nir: &SampleGrid,
    red: &SampleGrid,
    blue: &SampleGrid,
    params: EviParams,
) -> Result<SampleGrid> {
    nir.check_same_shape(red)?;
    nir.check_same_shape(blue)?;
    let (rows, cols) = nir.shape();

    map_pixels(rows, cols, *nir.transform(), |row, col| {
        match (
            nir.data()[(row, col)],
            red.data()[(row, col)],
            blue.data()[(row, col)],
        ) {
            (Sample::Defined(n), Sample::Defined(r), Sample::Defined(b)) => {
                let denom = n + params.c1 * r - params.c2 * b + params.l;
                Sample::ratio(params.g * (n - r), denom)
            }
            _ => Sample::NoData,
        }
    })
}

// ---------------------------------------------------------------------------
// Source-level dispatch
// ---------------------------------------------------------------------------

fn required<'a, S: ReflectanceSource>(source: &'a S, band: Band) -> Result<&'a SampleGrid> {
    source.reflectance(band).ok_or_else(|| Error::MalformedGranule {
        granule: source.label(),
        reason: format!("missing band {}", band.sentinel2_name()),
    })
}

/// Compute one index over a masked granule or composite.
pub fn compute_index<S: ReflectanceSource>(source: &S, index: SpectralIndex) -> Result<IndexRaster> {
    let grid = match index {
        SpectralIndex::Ndvi => ndvi(required(source, Band::Nir)?, required(source, Band::Red)?)?,
        SpectralIndex::Evi => evi(
            required(source, Band::Nir)?,
            required(source, Band::Red)?,
            required(source, Band::Blue)?,
            EviParams::default(),
        )?,
        SpectralIndex::Ndmi => ndmi(required(source, Band::Nir)?, required(source, Band::Swir1)?)?,
        SpectralIndex::Ndbi => ndbi(required(source, Band::Swir1)?, required(source, Band::Nir)?)?,
        SpectralIndex::Nbr => nbr(
            required(source, Band::NarrowNir)?,
            required(source, Band::Swir2)?,
        )?,
    };
    Ok(IndexRaster {
        index,
        source: source.label(),
        grid,
    })
}

/// Compute every supported index over one source.
pub fn compute_all<S: ReflectanceSource>(source: &S) -> Result<IndexSet> {
    SpectralIndex::ALL
        .iter()
        .map(|&index| compute_index(source, index).map(|raster| (index, raster)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
