//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Serde models for STAC Item Search (POST /search) covering what granule
//! discovery needs: bbox and datetime filters, the `eo:cloud_cover` query,
//! pagination via `links`, and per-band asset lookup.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use verdant_core::{Band, BoundingBox, DateWindow};

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search` (STAC API – Item Search).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StacSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// STAC query extension filter, e.g. `{"eo:cloud_cover": {"lt": 50}}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortby: Option<Vec<SortBy>>,

    /// Pagination token (next page).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Sort extension field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: String,
}

impl StacSearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounding box from a request geometry.
    pub fn bbox(mut self, geometry: &BoundingBox) -> Self {
        self.bbox = Some(geometry.to_array().to_vec());
        self
    }

    /// Set the datetime interval covering a date window.
    pub fn window(mut self, window: &DateWindow) -> Self {
        self.datetime = Some(window.to_stac_datetime());
        self
    }

    /// Set collection filter.
    pub fn collections(mut self, cols: &[&str]) -> Self {
        self.collections = Some(cols.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Set maximum items per page.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Only items whose scene cloud cover is strictly below `percent`.
    pub fn max_cloud_cover(mut self, percent: f64) -> Self {
        self.query = Some(serde_json::json!({ "eo:cloud_cover": { "lt": percent } }));
        self
    }

    /// Oldest acquisitions first.
    pub fn sort_by_datetime(mut self) -> Self {
        self.sortby = Some(vec![SortBy {
            field: "properties.datetime".into(),
            direction: "asc".into(),
        }]);
        self
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,

    #[serde(default)]
    pub links: Vec<StacLink>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,

    #[serde(rename = "numberReturned", skip_serializing_if = "Option::is_none")]
    pub number_returned: Option<u64>,
}

impl StacItemCollection {
    /// Find the `"next"` pagination link, if any.
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn has_next(&self) -> bool {
        self.next_link().is_some()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub type_: String,

    pub id: String,

    /// Bounding box `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    pub assets: HashMap<String, StacAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl StacItem {
    /// Get an asset by key.
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// Acquisition date (UTC) from the `datetime` property.
    pub fn acquired(&self) -> Option<NaiveDate> {
        let raw = self.properties.datetime.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.naive_utc().date())
    }

    /// Scene-level cloudy pixel percentage (EO extension).
    pub fn cloud_cover(&self) -> Option<f64> {
        self.properties.eo_cloud_cover
    }

    /// Asset holding a reflectance band, whatever naming the catalog uses.
    pub fn band_asset(&self, band: Band) -> Option<(AssetNaming, &StacAsset)> {
        AssetNaming::ALL
            .iter()
            .find_map(|naming| self.asset(naming.band_key(band)).map(|a| (*naming, a)))
    }

    /// The scene classification asset, if published.
    pub fn scl_asset(&self) -> Option<&StacAsset> {
        AssetNaming::ALL
            .iter()
            .find_map(|naming| self.asset(naming.scl_key()))
    }
}

/// How a catalog names Sentinel-2 band assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetNaming {
    /// Earth Search style: `red`, `nir`, `swir16`, `scl`, ...
    Common,
    /// Planetary Computer style: `B04`, `B08`, `B11`, `SCL`, ...
    BandCode,
}

impl AssetNaming {
    pub const ALL: &'static [AssetNaming] = &[AssetNaming::Common, AssetNaming::BandCode];

    pub fn band_key(&self, band: Band) -> &'static str {
        match self {
            AssetNaming::BandCode => band.sentinel2_name(),
            AssetNaming::Common => match band {
                Band::Blue => "blue",
                Band::Green => "green",
                Band::Red => "red",
                Band::Nir => "nir",
                Band::NarrowNir => "nir08",
                Band::Swir1 => "swir16",
                Band::Swir2 => "swir22",
            },
        }
    }

    pub fn scl_key(&self) -> &'static str {
        match self {
            AssetNaming::Common => "scl",
            AssetNaming::BandCode => "SCL",
        }
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    pub href: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A STAC Link (used for pagination and related resources).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacLink {
    /// Relationship: `"self"`, `"root"`, `"next"`, `"prev"`, etc.
    pub rel: String,

    pub href: String,

    /// HTTP method for the link (default GET, but `"next"` often uses POST).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body for POST-based pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Merge mode: if true, merge body with previous request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
