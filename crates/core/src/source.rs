//! The seam to the external raster/compute provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bands::Granule;
use crate::error::Result;
use crate::geometry::{BoundingBox, DateWindow};

/// Granule lookup for one geometry and date window.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleQuery {
    pub geometry: BoundingBox,
    pub window: DateWindow,
    /// Scenes at or above this cloudy-pixel percentage are not admissible.
    /// Providers may pre-filter with it; compositing enforces it regardless.
    pub max_cloud_cover: f64,
}

/// Which presentation render is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    BeforeRgb,
    AfterRgb,
    DeltaNdvi,
}

impl RenderKind {
    pub fn slug(&self) -> &'static str {
        match self {
            RenderKind::BeforeRgb => "before_rgb",
            RenderKind::AfterRgb => "after_rgb",
            RenderKind::DeltaNdvi => "delta_ndvi",
        }
    }
}

/// An RGBA image the provider should host and return a handle for.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub kind: RenderKind,
    pub geometry: BoundingBox,
    pub width: usize,
    pub height: usize,
    /// Row-major RGBA, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

/// Opaque reference to a hosted render (usually a URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderHandle(pub String);

impl RenderHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Supplier of clipped, georeferenced granules and render hosting.
///
/// Implementations must be safe to share across concurrent runs: either
/// stateless per call or holding a session that is established once and
/// only read afterwards. Calls may take tens of seconds; they must not
/// block the executor. Implementations do not retry internally.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// All candidate granules intersecting the query geometry and window,
    /// clipped to the geometry and resampled onto one common grid.
    async fn granules(&self, query: &GranuleQuery) -> Result<Vec<Granule>>;

    /// Host a presentation render and return its handle.
    async fn render(&self, request: RenderRequest) -> Result<RenderHandle>;
}
