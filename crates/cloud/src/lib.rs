//! # Verdant Cloud
//!
//! Sentinel-2 granule discovery over STAC, and where renders are hosted.
//!
//! - [`StacClient`]: async Item Search against Planetary Computer, Earth
//!   Search or any STAC API, with pagination and Planetary Computer signing
//! - [`RenderHost`]: where presentation renders end up
//!
//! Requests are never retried here. A failed search surfaces as a
//! [`CloudError`], which converts into [`verdant_core::Error`].

pub mod error;
pub mod render;
pub mod stac_client;
pub mod stac_models;

pub use error::{CloudError, Result};
pub use render::{DirectoryHost, RenderHost};
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{AssetNaming, StacItem, StacItemCollection, StacSearchParams};
