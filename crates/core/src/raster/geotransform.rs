//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// Granules delivered by a [`RasterSource`](crate::RasterSource) are clipped
/// to the request geometry in EPSG:4326, so x is longitude and y latitude,
/// both in degrees. `pixel_height` is negative for north-up grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Longitude of the upper-left corner
    pub origin_x: f64,
    /// Latitude of the upper-left corner
    pub origin_y: f64,
    /// Pixel width in degrees
    pub pixel_width: f64,
    /// Pixel height in degrees (negative for north-up)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a new north-up GeoTransform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Transform that tiles `bbox` with a `rows` x `cols` north-up grid.
    pub fn from_bounds(bbox: &BoundingBox, rows: usize, cols: usize) -> Self {
        let cols = cols.max(1) as f64;
        let rows = rows.max(1) as f64;
        Self::new(
            bbox.west(),
            bbox.north(),
            bbox.width_deg() / cols,
            -bbox.height_deg() / rows,
        )
    }

    /// Geographic coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Latitude of the center of `row`.
    pub fn row_center_lat(&self, row: usize) -> f64 {
        self.origin_y + (row as f64 + 0.5) * self.pixel_height
    }

    /// Transform for a grid whose cells are `factor` x `factor` blocks of this one.
    pub fn coarsened(&self, factor: usize) -> Self {
        let f = factor.max(1) as f64;
        Self::new(
            self.origin_x,
            self.origin_y,
            self.pixel_width * f,
            self.pixel_height * f,
        )
    }

    /// Whether this is a north-up image
    pub fn is_north_up(&self) -> bool {
        self.pixel_width > 0.0 && self.pixel_height < 0.0
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of a grid of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + width as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + height as f64 * self.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Whether two transforms describe the same grid lattice.
    pub fn aligned_with(&self, other: &GeoTransform) -> bool {
        const TOL: f64 = 1e-9;
        (self.origin_x - other.origin_x).abs() < TOL
            && (self.origin_y - other.origin_y).abs() < TOL
            && (self.pixel_width - other.pixel_width).abs() < TOL
            && (self.pixel_height - other.pixel_height).abs() < TOL
    }
}

/// A rectangular block of pixels inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

/// Tolerance for pixel centres lying exactly on a box edge.
const EDGE_TOL: f64 = 1e-9;

/// Inclusive index range of cell centres `origin + (i + 0.5) * step` that fall
/// within `[lo, hi]`, clamped to `0..n`.
fn centre_range(origin: f64, step: f64, lo: f64, hi: f64, n: usize) -> Option<(usize, usize)> {
    let a = (lo - origin) / step - 0.5;
    let b = (hi - origin) / step - 0.5;
    let first = (a.min(b) - EDGE_TOL).ceil().max(0.0);
    let last = (a.max(b) + EDGE_TOL).floor().min(n as f64 - 1.0);
    if n == 0 || !first.is_finite() || !last.is_finite() || last < first {
        return None;
    }
    Some((first as usize, last as usize))
}

impl GeoTransform {
    /// Pixels of a `rows` x `cols` grid whose centres lie inside `bbox`.
    ///
    /// `None` when no pixel centre falls inside the box.
    pub fn pixel_window(&self, bbox: &BoundingBox, rows: usize, cols: usize) -> Option<PixelWindow> {
        let (c0, c1) = centre_range(self.origin_x, self.pixel_width, bbox.west(), bbox.east(), cols)?;
        let (r0, r1) = centre_range(self.origin_y, self.pixel_height, bbox.south(), bbox.north(), rows)?;
        Some(PixelWindow {
            row: r0,
            col: c0,
            rows: r1 - r0 + 1,
            cols: c1 - c0 + 1,
        })
    }

    /// Transform of the sub-grid starting at `window`'s upper-left pixel.
    pub fn window(&self, window: &PixelWindow) -> Self {
        Self::new(
            self.origin_x + window.col as f64 * self.pixel_width,
            self.origin_y + window.row as f64 * self.pixel_height,
            self.pixel_width,
            self.pixel_height,
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
