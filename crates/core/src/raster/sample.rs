//! Per-pixel values with an explicit no-data channel

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Denominators smaller than this in magnitude are treated as division by zero.
pub const DIVISION_EPSILON: f64 = 1e-10;

/// A derived pixel value.
///
/// Masked pixels, division by zero and undefined statistics are all
/// `NoData`. Region reductions skip `NoData` instead of averaging a
/// sentinel into the result.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Sample {
    Defined(f64),
    #[default]
    NoData,
}

impl Sample {
    /// Wrap a value; non-finite values become `NoData`.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Sample::Defined(value)
        } else {
            Sample::NoData
        }
    }

    /// `numerator / denominator`, `NoData` when the denominator vanishes.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator.abs() < DIVISION_EPSILON {
            return Sample::NoData;
        }
        Sample::new(numerator / denominator)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Defined(v) => Some(v),
            Sample::NoData => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Sample::Defined(_))
    }

    /// Apply `f` to a defined value.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Sample::Defined(v) => Sample::new(f(v)),
            Sample::NoData => Sample::NoData,
        }
    }

    /// Combine two samples; `NoData` if either side is.
    pub fn zip_with(self, other: Sample, f: impl FnOnce(f64, f64) -> f64) -> Self {
        match (self, other) {
            (Sample::Defined(a), Sample::Defined(b)) => Sample::new(f(a, b)),
            _ => Sample::NoData,
        }
    }
}

impl From<Option<f64>> for Sample {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Sample::NoData, Sample::new)
    }
}

/// A georeferenced grid of [`Sample`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    data: Array2<Sample>,
    transform: GeoTransform,
}

/// Summary statistics over the defined pixels of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

impl SampleGrid {
    /// Grid with every pixel `NoData`.
    pub fn nodata(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), Sample::NoData),
            transform,
        }
    }

    pub fn from_array(data: Array2<Sample>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    /// Build from row-major samples.
    pub fn from_vec(
        data: Vec<Sample>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
    ) -> Result<Self> {
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

    /// Build from plain values; non-finite values become `NoData`.
    pub fn from_values(
        values: Vec<f64>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
    ) -> Result<Self> {
        Self::from_vec(
            values.into_iter().map(Sample::new).collect(),
            rows,
            cols,
            transform,
        )
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

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Sample> {
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

    pub fn set(&mut self, row: usize, col: usize, value: Sample) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<Sample> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Fails with `SizeMismatch` unless `other` has the same shape.
    pub fn check_same_shape(&self, other: &SampleGrid) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        Ok(())
    }

    /// Pixel-wise combination of two equally shaped grids.
    pub fn zip_with(
        &self,
        other: &SampleGrid,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<SampleGrid> {
        self.check_same_shape(other)?;
        let data = ndarray::Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|a, b| a.zip_with(*b, &f));
        Ok(SampleGrid::from_array(data, self.transform))
    }

    /// Defined values in row-major order.
    pub fn defined_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().filter_map(|s| s.value())
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|s| s.is_defined()).count()
    }

    /// Whether no pixel carries a value.
    pub fn is_all_nodata(&self) -> bool {
        !self.data.iter().any(|s| s.is_defined())
    }

    // Region reductions

    /// Sum of defined pixels, `None` if there are none.
    pub fn sum(&self) -> Option<f64> {
        let mut any = false;
        let mut sum = 0.0;
        for v in self.defined_values() {
            any = true;
            sum += v;
        }
        any.then_some(sum)
    }

    /// Mean of defined pixels, `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        let mut count = 0usize;
        let mut sum = 0.0;
        for v in self.defined_values() {
            count += 1;
            sum += v;
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Population standard deviation of defined pixels.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let mut count = 0usize;
        let mut acc = 0.0;
        for v in self.defined_values() {
            count += 1;
            acc += (v - mean) * (v - mean);
        }
        Some((acc / count as f64).sqrt())
    }

    /// Calculate basic statistics over defined pixels
    pub fn statistics(&self) -> GridStatistics {
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        let mut valid_count = 0usize;

        for v in self.defined_values() {
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
            valid_count += 1;
        }

        GridStatistics {
            min,
            max,
            mean: self.mean(),
            std_dev: self.std_dev(),
            valid_count,
            nodata_count: self.len() - valid_count,
        }
    }
}
