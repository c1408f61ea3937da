//! Integration tests for the STAC client.
//!
//! Tests marked `#[ignore]` require network access to real STAC catalogs.
//! Run with: `cargo test -p verdant-cloud -- --ignored stac`

use chrono::NaiveDate;
use verdant_cloud::{StacCatalog, StacClient, StacClientOptions, StacSearchParams};
use verdant_core::{Band, BoundingBox, DateWindow};

/// A small forest patch in the Western Ghats.
fn ghats() -> BoundingBox {
    BoundingBox::new(75.60, 12.20, 75.65, 12.25).unwrap()
}

fn june_2024() -> DateWindow {
    DateWindow::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 1).unwrap()
}

#[tokio::test]
#[ignore]
async fn stac_earth_search_sentinel2() {
    let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default())
        .expect("failed to create client");

    let params = StacSearchParams::new()
        .bbox(&ghats())
        .window(&june_2024())
        .collections(&["sentinel-2-l2a"])
        .max_cloud_cover(80.0)
        .sort_by_datetime()
        .limit(5);

    let results = client.search(&params).await.expect("search failed");
    println!("Found {} items", results.len());
    assert!(!results.is_empty(), "should find at least one item");

    for item in &results.features {
        let acquired = item.acquired().expect("item should carry a datetime");
        assert!(june_2024().contains(acquired));
        assert!(item.cloud_cover().unwrap_or(100.0) < 80.0);
        assert!(item.band_asset(Band::Red).is_some(), "item should publish red");
        assert!(item.scl_asset().is_some(), "L2A items publish SCL");
    }
}

#[tokio::test]
#[ignore]
async fn stac_planetary_computer_sentinel2() {
    let client = StacClient::new(StacCatalog::PlanetaryComputer, StacClientOptions::default())
        .expect("failed to create client");

    let params = StacSearchParams::new()
        .bbox(&ghats())
        .window(&june_2024())
        .collections(&["sentinel-2-l2a"])
        .limit(3);

    let results = client.search(&params).await.expect("search failed");
    println!("Found {} items (matched: {:?})", results.len(), results.number_matched);
    assert!(!results.is_empty(), "should find at least one item");

    let item = &results.features[0];
    let (_, red) = item.band_asset(Band::Red).expect("should have a red band asset");
    let signed = client
        .sign_asset_href(&red.href)
        .await
        .expect("signing failed");
    assert!(signed.starts_with(&red.href), "should start with original href");
    assert!(signed.contains("sig="), "should contain SAS token params");
}

#[tokio::test]
#[ignore]
async fn stac_paginated_search() {
    let options = StacClientOptions {
        max_items: 15,
        ..StacClientOptions::default()
    };
    let client = StacClient::new(StacCatalog::EarthSearch, options).expect("failed to create client");

    let window = DateWindow::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 6).unwrap();
    let params = StacSearchParams::new()
        .bbox(&ghats())
        .window(&window)
        .collections(&["sentinel-2-l2a"])
        .limit(5);

    let items = client.search_all(&params).await.expect("search_all failed");
    println!("Fetched {} items across pages", items.len());
    assert!(items.len() > 5, "should have fetched more than one page");
    assert!(items.len() <= 15, "should respect max_items");
}

#[tokio::test]
async fn unreachable_catalog_is_a_network_error() {
    let client = StacClient::new(
        StacCatalog::Custom("http://127.0.0.1:9".into()),
        StacClientOptions::default(),
    )
    .unwrap();

    let err = client
        .search(&StacSearchParams::new().bbox(&ghats()))
        .await
        .unwrap_err();
    let core: verdant_core::Error = err.into();
    assert!(matches!(core, verdant_core::Error::ComputeBackend(_)));
}
