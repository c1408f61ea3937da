//! # Verdant Colormap
//!
//! Color mapping and presentation rendering for Verdant.
//!
//! Turns sample grids into RGBA images: single-band grids through a
//! multi-stop colormap ([`grid_to_rgba`]) and reflectance triplets through a
//! gamma stretch ([`rgb_composite`]). Images are resized with
//! nearest-neighbour sampling before they are handed to a render host.
//!
//! ## Usage
//!
//! ```ignore
//! use verdant_colormap::{grid_to_rgba, ColormapParams};
//!
//! let image = grid_to_rgba(&delta_ndvi, &ColormapParams::index_change()).fit_longest_side(512);
//! ```

mod image;
mod render;
mod scheme;

pub use image::{fit_dimensions, RgbaImage};
pub use render::{auto_params, grid_to_rgba, rgb_composite, ColormapParams, RgbStretch};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
