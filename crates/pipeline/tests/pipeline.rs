//! End-to-end runs of the analysis pipeline over synthetic Sentinel-2 scenes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use verdant_algorithms::decision::{DecisionPolicy, PolicyKind};
use verdant_core::{
    Band, BoundingBox, DateWindow, Error, GeoTransform, Granule, GranuleQuery, QualityBand, Raster,
    RasterSource, RenderHandle, RenderKind, RenderRequest,
};
use verdant_pipeline::{
    AnalysisPipeline, AnalysisRequest, ConfigError, InMemoryRasterSource, PipelineConfig, RunState,
    SceneArchive,
};

// Digital numbers in `Band::ALL` order: blue, green, red, nir, nir08, swir16, swir22.
const FOREST: [u16; 7] = [300, 600, 500, 3000, 3000, 1500, 800];
const FOREST_DRY: [u16; 7] = [300, 600, 500, 2800, 2800, 1500, 800];
const CLEARED: [u16; 7] = [900, 1000, 1500, 1800, 1800, 2500, 2000];

const ROWS: usize = 4;
const COLS: usize = 4;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn geometry() -> BoundingBox {
    BoundingBox::new(72.950, 22.550, 72.954, 22.554).unwrap()
}

fn granule(id: &str, acquired: NaiveDate, cloud_cover: f64, pixel: impl Fn(usize, usize) -> [u16; 7]) -> Granule {
    let transform = GeoTransform::from_bounds(&geometry(), ROWS, COLS);
    let bands: BTreeMap<Band, Raster<u16>> = Band::ALL
        .iter()
        .enumerate()
        .map(|(i, band)| {
            let values: Vec<u16> = (0..ROWS * COLS).map(|k| pixel(k / COLS, k % COLS)[i]).collect();
            let raster = Raster::from_vec(values, ROWS, COLS).unwrap().with_transform(transform);
            (*band, raster)
        })
        .collect();
    let scl = Raster::filled(ROWS, COLS, 4u8).with_transform(transform);
    Granule {
        id: id.to_string(),
        acquired,
        cloud_cover,
        transform,
        bands,
        quality: Some(QualityBand::SceneClassification(scl)),
    }
}

/// Forest everywhere before; the western half cleared after.
fn scene() -> Vec<Granule> {
    vec![
        granule("before", date(2024, 1, 10), 5.0, |_, _| FOREST),
        granule("after", date(2024, 6, 12), 10.0, |_, c| if c < 2 { CLEARED } else { FOREST }),
        granule("after-cloudy", date(2024, 6, 20), 70.0, |_, _| CLEARED),
        granule("hist-2023", date(2023, 6, 14), 8.0, |_, _| FOREST),
        granule("hist-2022", date(2022, 6, 10), 12.0, |_, _| FOREST_DRY),
    ]
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(geometry(), date(2024, 1, 15), date(2024, 6, 15), "western block").unwrap()
}

fn request_over(west: f64, east: f64) -> AnalysisRequest {
    let region = BoundingBox::new(west, 22.550, east, 22.554).unwrap();
    AnalysisRequest::new(region, date(2024, 1, 15), date(2024, 6, 15), "sub-block").unwrap()
}

fn config(kind: PolicyKind) -> PipelineConfig {
    PipelineConfig {
        policy: Some(DecisionPolicy::with_defaults(kind)),
        ..PipelineConfig::default()
    }
}

fn pipeline(source: Arc<dyn RasterSource>) -> AnalysisPipeline {
    AnalysisPipeline::new(source, config(PolicyKind::Weighted)).unwrap()
}

#[tokio::test]
async fn clearing_is_detected_end_to_end() {
    let source = Arc::new(InMemoryRasterSource::new(scene()));
    let outcome = pipeline(source.clone()).run(&request()).await.unwrap();

    assert_eq!(
        outcome.trace.states(),
        vec![
            RunState::AwaitingInput,
            RunState::FetchingRasters,
            RunState::ComputingIndices,
            RunState::ComputingBaseline,
            RunState::Scoring,
            RunState::Deciding,
            RunState::Complete,
        ]
    );

    let m = &outcome.metrics;
    assert_eq!(m.location_label, "western block");
    assert_eq!(m.baseline_years_used, 2);
    assert!(m.mean_ndvi_change.unwrap() < -0.3);
    assert!(m.mean_evi_change.unwrap() < -0.15);
    assert!(m.mean_ndbi_change.unwrap() > 0.0);
    assert!(m.mean_z_score.unwrap() < -2.0);
    assert!(m.historical_variability_sigma.unwrap() > 0.0);
    // Eight lost pixels of roughly 100 m x 111 m.
    assert!(m.area_of_loss_m2 > 80_000.0 && m.area_of_loss_m2 < 100_000.0);

    assert!(outcome.decision.loss_detected);
    assert_eq!(outcome.decision.policy, PolicyKind::Weighted);
    assert!((0.0..=1.0).contains(&outcome.decision.confidence_score));

    // one query per window: before, after, two historical years
    assert_eq!(source.query_count(), 4);
    let renders = source.recorded_renders();
    assert_eq!(renders.len(), 3);
    assert!(renders.iter().all(|r| r.width == 512 && r.height == 512));
    assert_eq!(outcome.renders.delta_ndvi, RenderHandle("memory://delta_ndvi".into()));
}

#[tokio::test]
async fn loss_outside_the_region_is_excluded() {
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(scene())));

    let east = pipeline.run(&request_over(72.952, 72.954)).await.unwrap();
    assert_eq!(east.metrics.area_of_loss_m2, 0.0);
    assert!(east.metrics.mean_ndvi_change.unwrap().abs() < 1e-12);

    let west = pipeline.run(&request_over(72.950, 72.952)).await.unwrap();
    let full = pipeline.run(&request()).await.unwrap();
    assert_eq!(west.metrics.area_of_loss_m2, full.metrics.area_of_loss_m2);
    assert!(west.metrics.mean_ndvi_change.unwrap() < full.metrics.mean_ndvi_change.unwrap());
}

#[tokio::test]
async fn loss_area_grows_with_the_region() {
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(scene())));
    let mut areas = Vec::new();
    for west in [72.953, 72.952, 72.951, 72.950] {
        let outcome = pipeline.run(&request_over(west, 72.954)).await.unwrap();
        areas.push(outcome.metrics.area_of_loss_m2);
    }
    assert!(areas.windows(2).all(|w| w[0] <= w[1]), "areas {areas:?}");
    assert_eq!(areas[0], 0.0);
    assert!(areas[2] > 0.0 && areas[2] < areas[3]);
}

#[tokio::test]
async fn region_smaller_than_a_pixel_is_rejected() {
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(scene())));
    let err = pipeline.run(&request_over(72.9500, 72.9504)).await.unwrap_err();
    assert_eq!(err.state, RunState::FetchingRasters);
    assert!(err.is_input_error());
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn rerun_is_bit_identical() {
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(scene())));
    let first = pipeline.run(&request()).await.unwrap();
    let second = pipeline.run(&request()).await.unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(
        first.metrics.area_of_loss_m2.to_bits(),
        second.metrics.area_of_loss_m2.to_bits()
    );
    assert_eq!(
        serde_json::to_string(&first.metrics).unwrap(),
        serde_json::to_string(&second.metrics).unwrap()
    );
    assert_eq!(first.decision, second.decision);
}

#[tokio::test]
async fn hard_rule_policy_is_selectable() {
    let source = Arc::new(InMemoryRasterSource::new(scene()));
    let pipeline = AnalysisPipeline::new(source, config(PolicyKind::HardRule)).unwrap();
    let outcome = pipeline.run(&request()).await.unwrap();
    assert_eq!(outcome.decision.policy, PolicyKind::HardRule);
    // Eight pixels cover about 90 000 m², above the significant-area floor.
    assert!(outcome.decision.loss_detected);
}

#[tokio::test]
async fn no_after_imagery_fails_with_no_data() {
    let granules: Vec<Granule> = scene().into_iter().filter(|g| !g.id.starts_with("after")).collect();
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(granules)));

    let err = pipeline.run(&request()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_server_error());
    assert_eq!(err.state, RunState::FetchingRasters);
    assert_eq!(err.trace.current(), RunState::Failed);
    assert!(matches!(err.source, Error::NoDataAvailable { .. }));
}

#[tokio::test]
async fn cloudy_only_window_is_no_data() {
    let granules: Vec<Granule> = scene().into_iter().filter(|g| g.id != "after").collect();
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(granules)));
    let err = pipeline.run(&request()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn missing_historical_year_is_skipped() {
    let granules: Vec<Granule> = scene().into_iter().filter(|g| g.id != "hist-2022").collect();
    let outcome = pipeline(Arc::new(InMemoryRasterSource::new(granules)))
        .run(&request())
        .await
        .unwrap();

    let m = &outcome.metrics;
    assert_eq!(m.baseline_years_used, 1);
    // One sample per pixel: a mean but no spread, hence no anomaly and no loss.
    assert!(m.historical_baseline_mu.is_some());
    assert_eq!(m.historical_variability_sigma, None);
    assert_eq!(m.mean_z_score, None);
    assert_eq!(m.area_of_loss_m2, 0.0);
}

#[tokio::test]
async fn invalid_request_never_reaches_the_source() {
    let source = Arc::new(InMemoryRasterSource::new(scene()));
    let mut bad = request();
    bad.after_date = bad.before_date;

    let err = pipeline(source.clone()).run(&bad).await.unwrap_err();
    assert!(err.is_input_error());
    assert_eq!(err.state, RunState::AwaitingInput);
    assert_eq!(err.trace.states(), vec![RunState::AwaitingInput, RunState::Failed]);
    assert_eq!(source.query_count(), 0);
}

#[test]
fn pipeline_requires_a_policy() {
    let source = Arc::new(InMemoryRasterSource::default());
    let err = AnalysisPipeline::new(source, PipelineConfig::default()).err().unwrap();
    assert!(matches!(err, ConfigError::Invalid { field: "policy", .. }));
}

/// Never answers for one window.
struct StallingSource {
    inner: InMemoryRasterSource,
    stalled: DateWindow,
}

#[async_trait]
impl RasterSource for StallingSource {
    async fn granules(&self, query: &GranuleQuery) -> verdant_core::Result<Vec<Granule>> {
        if query.window == self.stalled {
            futures::future::pending::<()>().await;
        }
        self.inner.granules(query).await
    }

    async fn render(&self, request: RenderRequest) -> verdant_core::Result<RenderHandle> {
        self.inner.render(request).await
    }
}

#[tokio::test]
async fn no_data_cancels_in_flight_fetches() {
    let granules: Vec<Granule> = scene().into_iter().filter(|g| !g.id.starts_with("after")).collect();
    let source = Arc::new(StallingSource {
        inner: InMemoryRasterSource::new(granules),
        stalled: DateWindow::new(date(2024, 1, 15), 1).unwrap(),
    });

    let result = tokio::time::timeout(Duration::from_secs(5), pipeline(source).run(&request()))
        .await
        .expect("run should not wait for the stalled window");
    let err = result.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.state, RunState::FetchingRasters);
}

/// Fails every query for one calendar year.
struct FlakySource {
    inner: InMemoryRasterSource,
    failing_year: i32,
}

#[async_trait]
impl RasterSource for FlakySource {
    async fn granules(&self, query: &GranuleQuery) -> verdant_core::Result<Vec<Granule>> {
        if query.window.year() == self.failing_year {
            return Err(Error::ComputeBackend("quota exceeded".into()));
        }
        self.inner.granules(query).await
    }

    async fn render(&self, request: RenderRequest) -> verdant_core::Result<RenderHandle> {
        if request.kind == RenderKind::AfterRgb {
            return Err(Error::ComputeBackend("render host unavailable".into()));
        }
        self.inner.render(request).await
    }
}

#[tokio::test]
async fn backend_failure_in_history_fails_the_run() {
    let source = Arc::new(FlakySource {
        inner: InMemoryRasterSource::new(scene()),
        failing_year: 2022,
    });
    let err = pipeline(source).run(&request()).await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.state, RunState::FetchingRasters);
    assert!(matches!(err.source, Error::ComputeBackend(ref m) if m == "quota exceeded"));
}

#[tokio::test]
async fn render_failure_fails_while_deciding() {
    let source = Arc::new(FlakySource {
        inner: InMemoryRasterSource::new(scene()),
        failing_year: 1900,
    });
    let err = pipeline(source).run(&request()).await.unwrap_err();
    assert_eq!(err.state, RunState::Deciding);
    assert!(err.is_server_error());
}

#[tokio::test]
async fn concurrent_runs_share_one_pipeline() {
    let pipeline = pipeline(Arc::new(InMemoryRasterSource::new(scene())));
    let first = request();
    let mut other = request();
    other.location_label = "same block, second caller".into();

    let (a, b) = tokio::join!(pipeline.run(&first), pipeline.run(&other));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.metrics.area_of_loss_m2, b.metrics.area_of_loss_m2);
    assert_eq!(b.trace.location_label, "same block, second caller");
}

#[tokio::test]
async fn demo_archive_and_config_run() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    let archive = SceneArchive::load(&demos.join("western_block.json")).unwrap();
    let config = PipelineConfig::load(&demos.join("verdant.toml")).unwrap();
    let source = Arc::new(InMemoryRasterSource::from_archive(&archive).unwrap());
    let pipeline = AnalysisPipeline::new(source, config).unwrap();

    let request =
        AnalysisRequest::new(archive.geometry, date(2024, 1, 15), date(2024, 6, 15), "demo").unwrap();
    let outcome = pipeline.run(&request).await.unwrap();

    // The western column of three pixels is cleared.
    let area = outcome.metrics.area_of_loss_m2;
    assert!(area > 30_000.0 && area < 40_000.0, "area {area}");
    assert!(outcome.decision.loss_detected);
}
