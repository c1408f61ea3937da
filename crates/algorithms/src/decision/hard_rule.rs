//! Hard-rule conjunction policy
//!
//! Loss requires a definite NDVI clearing over a significant area, backed
//! by either a historical anomaly or a built-up signal.

use serde::{Deserialize, Serialize};
use verdant_core::MetricsRecord;

use super::{DecisionSignals, LossDecision, LossModel, PolicyKind};

/// Thresholds of the hard-rule policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardRuleParams {
    /// Minimum |Z| for the region to count as anomalous
    pub min_abs_z: f64,
    /// NDVI change at or below which the region is a definite clearing
    pub clearing_ndvi_change: f64,
    /// NDBI change at or above which new built-up surface is assumed
    pub construction_ndbi_change: f64,
    /// Minimum loss area in m²
    pub min_area_m2: f64,
}

impl Default for HardRuleParams {
    fn default() -> Self {
        Self {
            min_abs_z: 0.5,
            clearing_ndvi_change: -0.15,
            construction_ndbi_change: 0.03,
            min_area_m2: 50_000.0,
        }
    }
}

impl LossModel for HardRuleParams {
    fn decide(&self, metrics: &MetricsRecord) -> LossDecision {
        let is_anomalous = metrics
            .mean_z_score
            .is_some_and(|z| z.abs() >= self.min_abs_z);
        let is_definite_clearing = metrics
            .mean_ndvi_change
            .is_some_and(|d| d <= self.clearing_ndvi_change);
        let is_construction = metrics
            .mean_ndbi_change
            .is_some_and(|d| d >= self.construction_ndbi_change);
        let is_significant_area = metrics.area_of_loss_m2 >= self.min_area_m2;

        let met = [is_anomalous, is_definite_clearing, is_construction, is_significant_area]
            .iter()
            .filter(|&&c| c)
            .count();

        LossDecision {
            confidence_score: met as f64 / 4.0,
            loss_detected: is_definite_clearing
                && is_significant_area
                && (is_anomalous || is_construction),
            policy: PolicyKind::HardRule,
            signals: DecisionSignals::HardRule {
                is_anomalous,
                is_definite_clearing,
                is_construction,
                is_significant_area,
            },
        }
    }
}
