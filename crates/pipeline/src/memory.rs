//! In-memory raster source and the scene archive format it loads.
//!
//! A scene archive is a JSON document holding one common grid and a list of
//! granules with raw digital numbers on that grid:
//!
//! ```json
//! {
//!   "geometry": [72.95, 22.55, 72.97, 22.56],
//!   "rows": 2, "cols": 2,
//!   "granules": [{
//!     "id": "S2A_20240612", "acquired": "2024-06-12", "cloud_cover": 3.5,
//!     "bands": { "red": [900, 910, 905, 0], "nir": [3100, 3000, 2950, 0] },
//!     "scl": [4, 4, 4, 0]
//!   }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use verdant_core::{
    Band, BoundingBox, Error, GeoTransform, Granule, GranuleQuery, QualityBand, Raster,
    RasterSource, RenderHandle, RenderKind, RenderRequest, Result,
};

/// One granule of a [`SceneArchive`], row-major on the archive grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedGranule {
    pub id: String,
    pub acquired: NaiveDate,
    pub cloud_cover: f64,
    pub bands: BTreeMap<Band, Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scl: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa60: Option<Vec<u16>>,
}

/// Granules already clipped and resampled onto one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneArchive {
    pub geometry: BoundingBox,
    pub rows: usize,
    pub cols: usize,
    pub granules: Vec<ArchivedGranule>,
}

impl SceneArchive {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InputValidation(format!("scene archive: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InputValidation(format!("reading {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn transform(&self) -> GeoTransform {
        GeoTransform::from_bounds(&self.geometry, self.rows, self.cols)
    }

    /// Decode every archived granule onto the archive grid.
    pub fn granules(&self) -> Result<Vec<Granule>> {
        let transform = self.transform();
        self.granules
            .iter()
            .map(|g| self.decode(g, transform))
            .collect()
    }

    fn decode(&self, archived: &ArchivedGranule, transform: GeoTransform) -> Result<Granule> {
        let malformed = |reason: String| Error::MalformedGranule {
            granule: archived.id.clone(),
            reason,
        };

        let mut bands = BTreeMap::new();
        for (band, values) in &archived.bands {
            let raster = Raster::from_vec(values.clone(), self.rows, self.cols)
                .map_err(|_| {
                    malformed(format!(
                        "band {} has {} values, grid is {}x{}",
                        band.sentinel2_name(),
                        values.len(),
                        self.rows,
                        self.cols
                    ))
                })?
                .with_transform(transform);
            bands.insert(*band, raster);
        }

        let quality = match (&archived.scl, &archived.qa60) {
            (Some(scl), _) => Some(QualityBand::SceneClassification(
                Raster::from_vec(scl.clone(), self.rows, self.cols)
                    .map_err(|_| malformed("SCL does not match the grid".into()))?
                    .with_transform(transform),
            )),
            (None, Some(qa)) => Some(QualityBand::Qa60(
                Raster::from_vec(qa.clone(), self.rows, self.cols)
                    .map_err(|_| malformed("QA60 does not match the grid".into()))?
                    .with_transform(transform),
            )),
            (None, None) => None,
        };

        Ok(Granule {
            id: archived.id.clone(),
            acquired: archived.acquired,
            cloud_cover: archived.cloud_cover,
            transform,
            bands,
            quality,
        })
    }
}

/// A render the in-memory source was asked to host.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRender {
    pub kind: RenderKind,
    pub width: usize,
    pub height: usize,
    pub bytes: usize,
}

/// [`RasterSource`] over granules held in memory.
///
/// Returns every granule acquired inside the query window whose footprint
/// intersects the query geometry, cropped to the pixels whose centres lie in
/// that geometry. Admission by cloud cover is left to compositing. Renders are recorded and answered with `memory://` handles.
#[derive(Debug, Default)]
pub struct InMemoryRasterSource {
    granules: Vec<Granule>,
    queries: AtomicUsize,
    renders: Mutex<Vec<RecordedRender>>,
}

impl InMemoryRasterSource {
    pub fn new(granules: Vec<Granule>) -> Self {
        Self {
            granules,
            queries: AtomicUsize::new(0),
            renders: Mutex::new(Vec::new()),
        }
    }

    pub fn from_archive(archive: &SceneArchive) -> Result<Self> {
        Ok(Self::new(archive.granules()?))
    }

    pub fn granule_count(&self) -> usize {
        self.granules.len()
    }

    /// Number of `granules` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn recorded_renders(&self) -> Vec<RecordedRender> {
        match self.renders.lock() {
            Ok(renders) => renders.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Crop a granule to the pixels whose centres fall inside `geometry`.
    fn clip(granule: &Granule, geometry: &BoundingBox) -> Result<Granule> {
        let (rows, cols) = granule.shape()?;
        let window = granule
            .transform
            .pixel_window(geometry, rows, cols)
            .ok_or_else(|| {
                Error::InputValidation(format!(
                    "region {:?} covers no pixel of granule {}",
                    geometry.to_array(),
                    granule.id
                ))
            })?;
        granule.crop(&window)
    }

    fn footprint(granule: &Granule) -> Option<BoundingBox> {
        let (rows, cols) = granule.shape().ok()?;
        let (west, south, east, north) = granule.transform.bounds(cols, rows);
        BoundingBox::new(west, south, east, north).ok()
    }
}

#[async_trait]
impl RasterSource for InMemoryRasterSource {
    async fn granules(&self, query: &GranuleQuery) -> Result<Vec<Granule>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let matching = self
            .granules
            .iter()
            .filter(|g| query.window.contains(g.acquired))
            .filter(|g| Self::footprint(g).map_or(true, |fp| fp.intersects(&query.geometry)))
            .map(|g| Self::clip(g, &query.geometry))
            .collect::<Result<Vec<Granule>>>()?;
        debug!(window = %query.window, granules = matching.len(), "in-memory granules");
        Ok(matching)
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderHandle> {
        let record = RecordedRender {
            kind: request.kind,
            width: request.width,
            height: request.height,
            bytes: request.rgba.len(),
        };
        match self.renders.lock() {
            Ok(mut renders) => renders.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(RenderHandle(format!("memory://{}", request.kind.slug())))
    }
}
