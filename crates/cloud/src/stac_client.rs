//! Async STAC client for Sentinel-2 granule discovery.
//!
//! Earth Search and Planetary Computer are known by name; any other STAC API
//! root can be given as a URL.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

const PLANETARY_COMPUTER_ROOT: &str = "https://planetarycomputer.microsoft.com/api/stac/v1";
const PLANETARY_COMPUTER_SIGN: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";
const EARTH_SEARCH_ROOT: &str = "https://earth-search.aws.element84.com/v1";

/// Longest error body quoted back in an error message.
const ERROR_BODY_CHARS: usize = 300;

/// A STAC API serving Sentinel-2 L2A items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StacCatalog {
    /// Microsoft Planetary Computer; assets need a SAS signature.
    PlanetaryComputer,
    /// Element 84 Earth Search on AWS.
    EarthSearch,
    /// Any other STAC API root, e.g. `https://stac.example.com/api/v1`.
    Custom(String),
}

impl StacCatalog {
    /// Resolve `pc`, `es` and their long names; anything else is a URL.
    pub fn resolve(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(name.to_string()),
        }
    }

    fn root(&self) -> &str {
        match self {
            Self::PlanetaryComputer => PLANETARY_COMPUTER_ROOT,
            Self::EarthSearch => EARTH_SEARCH_ROOT,
            Self::Custom(root) => root.trim_end_matches('/'),
        }
    }

    /// The `POST /search` endpoint.
    pub fn search_url(&self) -> String {
        let root = self.root();
        if root.ends_with("/search") {
            root.to_string()
        } else {
            format!("{root}/search")
        }
    }

    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }
}

impl fmt::Display for StacCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanetaryComputer => write!(f, "planetary-computer"),
            Self::EarthSearch => write!(f, "earth-search"),
            Self::Custom(root) => write!(f, "{root}"),
        }
    }
}

/// Configuration for [`StacClient`].
#[derive(Debug, Clone)]
pub struct StacClientOptions {
    /// Per-request transport timeout; `None` leaves timing to the caller.
    pub request_timeout: Option<Duration>,
    /// Upper bound on items collected across pages.
    pub max_items: usize,
    /// Items requested per page.
    pub page_size: u32,
    /// Collection searched for granules.
    pub collection: String,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_items: 200,
            page_size: 100,
            collection: "sentinel-2-l2a".to_string(),
        }
    }
}

/// Async client for STAC Item Search.
///
/// Failed requests are reported, never retried.
#[derive(Debug)]
pub struct StacClient {
    catalog: StacCatalog,
    client: reqwest::Client,
    options: StacClientOptions,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            catalog,
            client,
            options,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &StacClientOptions {
        &self.options
    }

    /// One page of search results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.post_search(&self.catalog.search_url(), params).await
    }

    /// Follow `next` links until the catalog runs out or `max_items` is reached.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let max = self.options.max_items;
        let mut items = Vec::new();
        let mut page = self.search(params).await?;
        let mut pages = 1usize;

        loop {
            let next = page.next_link().cloned();
            items.append(&mut page.features);
            let Some(link) = next.filter(|_| items.len() < max) else {
                break;
            };
            page = self.next_page(&link, params).await?;
            pages += 1;
            if page.is_empty() {
                break;
            }
        }

        items.truncate(max);
        debug!(catalog = %self.catalog, pages, items = items.len(), "STAC search complete");
        Ok(items)
    }

    /// Asset href ready to read; signed through the SAS endpoint on
    /// Planetary Computer and returned as-is elsewhere.
    pub async fn sign_asset_href(&self, href: &str) -> Result<String> {
        if !self.catalog.needs_signing() {
            return Ok(href.to_string());
        }
        let resp = self
            .client
            .get(PLANETARY_COMPUTER_SIGN)
            .query(&[("href", href)])
            .send()
            .await
            .map_err(|e| CloudError::Auth(format!("sign request failed: {e}")))?;
        let signed: serde_json::Value = read_json(resp, "sign")
            .await
            .map_err(|e| CloudError::Auth(e.to_string()))?;
        signed["href"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CloudError::Auth("sign response has no 'href'".into()))
    }

    async fn post_search(&self, url: &str, params: &StacSearchParams) -> Result<StacItemCollection> {
        debug!(url, datetime = ?params.datetime, "STAC search");
        let resp = self
            .client
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| CloudError::Network(format!("search request failed: {e}")))?;
        read_json(resp, "search").await
    }

    async fn next_page(&self, link: &StacLink, params: &StacSearchParams) -> Result<StacItemCollection> {
        if link.method.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("POST")) {
            let body = next_page_body(link, params)?;
            return self.post_search(&link.href, &body).await;
        }
        let resp = self
            .client
            .get(&link.href)
            .send()
            .await
            .map_err(|e| CloudError::Network(format!("pagination request failed: {e}")))?;
        read_json(resp, "pagination").await
    }
}

/// Body of a POST `next` link: the link body alone, or merged over the
/// original search when the link says `merge`.
pub(crate) fn next_page_body(link: &StacLink, params: &StacSearchParams) -> Result<StacSearchParams> {
    let encode = |p: &StacSearchParams| {
        serde_json::to_value(p).map_err(|e| CloudError::Parse(format!("search params: {e}")))
    };
    let body = match (&link.body, link.merge.unwrap_or(false)) {
        (Some(overlay), true) => {
            let mut base = encode(params)?;
            if let (Some(base), Some(overlay)) = (base.as_object_mut(), overlay.as_object()) {
                base.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            base
        }
        (Some(body), false) => body.clone(),
        (None, _) => encode(params)?,
    };
    serde_json::from_value(body).map_err(|e| CloudError::Parse(format!("pagination body: {e}")))
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| CloudError::Network(format!("reading {what} response: {e}")))?;
    if !status.is_success() {
        let excerpt: String = body.chars().take(ERROR_BODY_CHARS).collect();
        return Err(CloudError::Network(format!("{what} returned HTTP {status}: {excerpt}")));
    }
    serde_json::from_str(&body).map_err(|e| CloudError::Parse(format!("{what} response: {e}")))
}
