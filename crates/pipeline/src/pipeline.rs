//! The analysis run: fetch, index, baseline, score, decide.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use verdant_algorithms::decision::{DecisionPolicy, LossDecision, LossModel};
use verdant_algorithms::imagery::{
    build_composite, compute_all, compute_index, index_deltas, loss_mask, CompositeParams,
    IndexDelta, IndexRaster, IndexSet, RasterComposite, SpectralIndex,
};
use verdant_algorithms::statistics::{estimate_baseline, historical_windows, loss_area_m2, z_scores};
use verdant_core::{
    BoundingBox, DateWindow, Error, GranuleQuery, MetricsRecord, RasterSource, RenderKind, Result,
    SampleGrid,
};

use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError};
use crate::render::{delta_request, true_colour_request, RenderSet};
use crate::request::AnalysisRequest;
use crate::state::{RunState, RunTrace};

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub metrics: MetricsRecord,
    pub decision: LossDecision,
    pub renders: RenderSet,
    pub trace: RunTrace,
}

/// Composites of one run.
struct Composites {
    before: RasterComposite,
    after: RasterComposite,
    /// Nearest year first; years without imagery are absent
    history: Vec<RasterComposite>,
}

/// Runs analyses against one shared [`RasterSource`].
///
/// The pipeline holds no per-run state, so one instance can serve any number
/// of concurrent runs. Nothing here times out; wrap [`run`](Self::run) in
/// `tokio::time::timeout` to bound it.
pub struct AnalysisPipeline {
    source: Arc<dyn RasterSource>,
    config: PipelineConfig,
    policy: DecisionPolicy,
}

impl AnalysisPipeline {
    /// Fails when the configuration is invalid or names no decision policy.
    pub fn new(source: Arc<dyn RasterSource>, config: PipelineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.policy.ok_or(ConfigError::Invalid {
            field: "policy",
            message: "no decision policy configured".into(),
        })?;
        Ok(Self {
            source,
            config,
            policy,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Run one analysis to `Complete` or `Failed`.
    pub async fn run(&self, request: &AnalysisRequest) -> std::result::Result<AnalysisOutcome, PipelineError> {
        let mut trace = RunTrace::start(request.location_label.clone());
        match self.execute(request, &mut trace).await {
            Ok((metrics, decision, renders)) => {
                advance(&mut trace, RunState::Complete);
                info!(
                    location = %request.location_label,
                    confidence = decision.confidence_score,
                    loss_detected = decision.loss_detected,
                    "analysis complete"
                );
                Ok(AnalysisOutcome {
                    metrics,
                    decision,
                    renders,
                    trace,
                })
            }
            Err(source) => {
                let state = trace.current();
                advance(&mut trace, RunState::Failed);
                error!(location = %request.location_label, %state, error = %source, "analysis failed");
                Err(PipelineError {
                    state,
                    source,
                    trace,
                })
            }
        }
    }

    async fn execute(
        &self,
        request: &AnalysisRequest,
        trace: &mut RunTrace,
    ) -> Result<(MetricsRecord, LossDecision, RenderSet)> {
        request.validate()?;
        let composite_params = self.config.composite_params();
        let baseline_params = self.config.baseline_params();
        let mask_params = self.config.loss_mask_params();
        let before_window = DateWindow::new(request.before_date, composite_params.offset_months)?;
        let after_window = DateWindow::new(request.after_date, composite_params.offset_months)?;
        let history_windows = historical_windows(&after_window, baseline_params.lookback_years)?;

        advance(trace, RunState::FetchingRasters);
        let composites = self
            .fetch(request.geometry, before_window, after_window, &history_windows, &composite_params)
            .await?;

        advance(trace, RunState::ComputingIndices);
        let before_indices = compute_all(&composites.before)?;
        let after_indices = compute_all(&composites.after)?;
        let deltas = index_deltas(&before_indices, &after_indices)?;

        advance(trace, RunState::ComputingBaseline);
        let yearly = composites
            .history
            .iter()
            .map(|c| compute_index(c, baseline_params.index))
            .collect::<Result<Vec<IndexRaster>>>()?;
        let observed = index_of(&after_indices, baseline_params.index)?;
        let baseline = estimate_baseline(&yearly, &observed.grid, &baseline_params)?;
        debug!(
            years = baseline.years_used,
            mu = ?baseline.mean_mu(),
            sigma = ?baseline.mean_sigma(),
            "baseline estimated"
        );

        advance(trace, RunState::Scoring);
        let anomaly = z_scores(observed, &baseline)?;
        let mask = loss_mask(delta_of(&deltas, mask_params.index)?, &anomaly, &mask_params)?;
        let area = loss_area_m2(&mask, &self.config.area_params())?;
        debug!(lost_pixels = mask.lost_count(), area_m2 = area, "loss mask scored");

        advance(trace, RunState::Deciding);
        let metrics = MetricsRecord {
            location_label: request.location_label.clone(),
            before_date: request.before_date,
            after_date: request.after_date,
            mean_ndvi_change: delta_of(&deltas, SpectralIndex::Ndvi)?.mean,
            mean_evi_change: delta_of(&deltas, SpectralIndex::Evi)?.mean,
            mean_ndmi_change: delta_of(&deltas, SpectralIndex::Ndmi)?.mean,
            mean_ndbi_change: delta_of(&deltas, SpectralIndex::Ndbi)?.mean,
            mean_nbr_change: delta_of(&deltas, SpectralIndex::Nbr)?.mean,
            mean_z_score: anomaly.mean(),
            historical_baseline_mu: baseline.mean_mu(),
            historical_variability_sigma: baseline.mean_sigma(),
            area_of_loss_m2: area,
            baseline_years_used: baseline.years_used,
        };
        let decision = self.policy.decide(&metrics);

        let renders = self
            .render(
                request.geometry,
                &composites,
                &delta_of(&deltas, SpectralIndex::Ndvi)?.grid,
            )
            .await?;

        Ok((metrics, decision, renders))
    }

    /// Before, after and every historical composite, fetched concurrently.
    ///
    /// The first hard failure drops the other in-flight fetches. A historical
    /// year without admissible imagery is skipped; a before or after window
    /// without imagery fails the run.
    async fn fetch(
        &self,
        geometry: BoundingBox,
        before: DateWindow,
        after: DateWindow,
        history: &[DateWindow],
        params: &CompositeParams,
    ) -> Result<Composites> {
        let historical = history
            .iter()
            .map(|window| self.historical_composite(geometry, *window, params));

        let (before, after, history) = tokio::try_join!(
            self.composite(geometry, before, params),
            self.composite(geometry, after, params),
            try_join_all(historical),
        )?;

        Ok(Composites {
            before,
            after,
            history: history.into_iter().flatten().collect(),
        })
    }

    async fn composite(
        &self,
        geometry: BoundingBox,
        window: DateWindow,
        params: &CompositeParams,
    ) -> Result<RasterComposite> {
        let query = GranuleQuery {
            geometry,
            window,
            max_cloud_cover: params.max_cloud_cover,
        };
        let granules = self.source.granules(&query).await?;
        debug!(%window, granules = granules.len(), "granules fetched");
        build_composite(&granules, geometry, window, params)
    }

    async fn historical_composite(
        &self,
        geometry: BoundingBox,
        window: DateWindow,
        params: &CompositeParams,
    ) -> Result<Option<RasterComposite>> {
        match self.composite(geometry, window, params).await {
            Ok(composite) => Ok(Some(composite)),
            Err(err) if err.is_not_found() => {
                warn!(%window, "no admissible imagery for historical year, skipping");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn render(
        &self,
        geometry: BoundingBox,
        composites: &Composites,
        delta_ndvi: &SampleGrid,
    ) -> Result<RenderSet> {
        let config = &self.config.render;
        let before = true_colour_request(RenderKind::BeforeRgb, &composites.before, config)?;
        let after = true_colour_request(RenderKind::AfterRgb, &composites.after, config)?;
        let delta = delta_request(geometry, delta_ndvi, config);

        let (before_rgb, after_rgb, delta_ndvi) = tokio::try_join!(
            self.source.render(before),
            self.source.render(after),
            self.source.render(delta),
        )?;
        Ok(RenderSet {
            before_rgb,
            after_rgb,
            delta_ndvi,
        })
    }
}

/// The pipeline only ever asks for forward moves or `Failed` from a working
/// state, so a refusal here is a sequencing bug.
fn advance(trace: &mut RunTrace, state: RunState) {
    let moved = trace.enter(state);
    debug_assert!(moved, "run cannot move from {} to {state}", trace.current());
}

fn index_of(set: &IndexSet, index: SpectralIndex) -> Result<&IndexRaster> {
    set.get(&index)
        .ok_or_else(|| Error::Other(format!("{index} was not computed")))
}

fn delta_of(
    deltas: &BTreeMap<SpectralIndex, IndexDelta>,
    index: SpectralIndex,
) -> Result<&IndexDelta> {
    deltas
        .get(&index)
        .ok_or_else(|| Error::Other(format!("no {index} difference")))
}
