//! Sample-grid rendering: single-band colormaps and stretched true colour.

use verdant_core::{Result, Sample, SampleGrid};

use crate::image::RgbaImage;
use crate::scheme::{evaluate, ColorScheme, Rgb};

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme to use.
    pub scheme: ColorScheme,
    /// Minimum value for normalization. Values below this are clamped.
    pub min: f64,
    /// Maximum value for normalization. Values above this are clamped.
    pub max: f64,
    /// Color for nodata pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    /// Create params with explicit min/max range.
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }

    /// Index-change ramp: -0.5 red through white to +0.5 green.
    pub fn index_change() -> Self {
        Self::with_range(ColorScheme::RedWhiteGreen, -0.5, 0.5)
    }
}

/// Auto-detect min/max from the defined pixels of a grid.
pub fn auto_params(grid: &SampleGrid, scheme: ColorScheme) -> ColormapParams {
    let stats = grid.statistics();
    match (stats.min, stats.max) {
        (Some(min), Some(max)) if (max - min).abs() < f64::EPSILON => {
            ColormapParams::with_range(scheme, min, min + 1.0)
        }
        (Some(min), Some(max)) => ColormapParams::with_range(scheme, min, max),
        _ => ColormapParams::with_range(scheme, 0.0, 1.0),
    }
}

fn normalize(v: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.abs() > f64::EPSILON {
        (v - min) / range
    } else {
        0.0
    }
}

/// Convert a grid to an RGBA image through a colormap.
///
/// `NoData` pixels are rendered with `params.nodata_color`.
pub fn grid_to_rgba(grid: &SampleGrid, params: &ColormapParams) -> RgbaImage {
    let (rows, cols) = grid.shape();
    let mut rgba = Vec::with_capacity(rows * cols * 4);

    for sample in grid.data().iter() {
        match sample {
            Sample::Defined(v) => {
                let Rgb { r, g, b } = evaluate(params.scheme, normalize(*v, params.min, params.max));
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
            Sample::NoData => rgba.extend_from_slice(&params.nodata_color),
        }
    }

    RgbaImage::from_raw(cols, rows, rgba)
}

/// Linear stretch with gamma for reflectance true-colour renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbStretch {
    pub min: f64,
    pub max: f64,
    /// Output is `t^(1/gamma)` of the stretched value `t`
    pub gamma: f64,
}

impl Default for RgbStretch {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.3,
            gamma: 1.4,
        }
    }
}

impl RgbStretch {
    fn channel(&self, v: f64) -> u8 {
        let t = normalize(v, self.min, self.max).clamp(0.0, 1.0);
        let gamma = if self.gamma > 0.0 { self.gamma } else { 1.0 };
        (t.powf(1.0 / gamma) * 255.0).round() as u8
    }
}

/// Compose three reflectance grids into a stretched true-colour image.
///
/// A pixel is transparent when any of its three channels is `NoData`.
pub fn rgb_composite(
    red: &SampleGrid,
    green: &SampleGrid,
    blue: &SampleGrid,
    stretch: &RgbStretch,
) -> Result<RgbaImage> {
    red.check_same_shape(green)?;
    red.check_same_shape(blue)?;
    let (rows, cols) = red.shape();
    let mut rgba = Vec::with_capacity(rows * cols * 4);

    for ((r, g), b) in red.data().iter().zip(green.data().iter()).zip(blue.data().iter()) {
        match (r, g, b) {
            (Sample::Defined(r), Sample::Defined(g), Sample::Defined(b)) => rgba.extend_from_slice(&[
                stretch.channel(*r),
                stretch.channel(*g),
                stretch.channel(*b),
                255,
            ]),
            _ => rgba.extend_from_slice(&[0, 0, 0, 0]),
        }
    }

    Ok(RgbaImage::from_raw(cols, rows, rgba))
}
