/// Compatibility layer for rayon/sequential execution.
///
/// With the `parallel` feature this re-exports rayon's parallel iterators.
/// Without it, `into_par_iter()` resolves to a plain `into_iter()` so the
/// per-row pixel loops compile unchanged.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

use verdant_core::{GeoTransform, Result, Sample, SampleGrid};

/// Evaluate `f` for every pixel, rows in parallel, preserving row-major order.
pub(crate) fn map_pixels<F>(
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    f: F,
) -> Result<SampleGrid>
where
    F: Fn(usize, usize) -> Sample + Sync + Send,
{
    let data: Vec<Sample> = (0..rows)
        .into_par_iter()
        .flat_map(|row| (0..cols).map(|col| f(row, col)).collect::<Vec<_>>())
        .collect();
    SampleGrid::from_vec(data, rows, cols, transform)
}
