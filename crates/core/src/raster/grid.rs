//! Raw raster grid

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelWindow, RasterElement};
use ndarray::{s, Array2};

/// A georeferenced grid of values as the imagery provider delivers them.
///
/// Reflectance bands are `Raster<u16>` digital numbers, the scene
/// classification layer is `Raster<u8>` class codes and QA60 is a
/// `Raster<u16>` bitmask. Anything derived from them lives in a
/// [`SampleGrid`](super::SampleGrid).
///
/// ```ignore
/// use verdant_core::Raster;
///
/// let mut red: Raster<u16> = Raster::new(64, 64);
/// red.set(10, 20, 1234)?;
/// assert_eq!(red.get(10, 20)?, 1234);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Row-major (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    /// Fill value the provider uses outside the acquisition footprint
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::wrap(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::wrap(Array2::from_elem((rows, cols), value))
    }

    /// Row-major values; the length must be `rows * cols`.
    pub fn from_vec(values: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Array2::from_shape_vec((rows, cols), values)
            .map(Self::wrap)
            .map_err(|e| Error::Other(e.to_string()))
    }

    fn wrap(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<T>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Copy of the pixels inside `window`, georeferenced to the window.
    pub fn crop(&self, window: &PixelWindow) -> Result<Self> {
        let (rows, cols) = self.shape();
        if window.rows == 0
            || window.cols == 0
            || window.row + window.rows > rows
            || window.col + window.cols > cols
        {
            return Err(self.out_of_bounds(window.row + window.rows, window.col + window.cols));
        }
        let data = self
            .data
            .slice(s![window.row..window.row + window.rows, window.col..window.col + window.cols])
            .to_owned();
        Ok(Self {
            data,
            transform: self.transform.window(window),
            nodata: self.nodata,
        })
    }

    /// Whether `value` is this raster's fill value.
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }
}
