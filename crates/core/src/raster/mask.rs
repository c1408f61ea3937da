//! Boolean loss classification grid

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Per-pixel boolean classification of detected vegetation loss.
#[derive(Debug, Clone, PartialEq)]
pub struct LossMask {
    data: Array2<bool>,
    transform: GeoTransform,
}

impl LossMask {
    pub fn from_array(data: Array2<bool>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    pub fn from_vec(data: Vec<bool>, rows: usize, cols: usize, transform: GeoTransform) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array, transform))
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_lost(&self, row: usize, col: usize) -> Result<bool> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Number of pixels flagged as lost.
    pub fn lost_count(&self) -> usize {
        self.data.iter().filter(|&&lost| lost).count()
    }
}
