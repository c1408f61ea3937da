//! Weighted confidence policy
//!
//! Blends three normalized signals: the NDVI drop relative to a full
//! clearing, the loss area on a log scale, and the anomaly strength.

use serde::{Deserialize, Serialize};
use verdant_core::MetricsRecord;

use super::{DecisionSignals, LossDecision, LossModel, PolicyKind};

/// Constants of the weighted policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedParams {
    /// NDVI drop that counts as a full clearing
    pub full_drop: f64,
    /// log10(m²) where the area signal starts (1 ha)
    pub min_log_area: f64,
    /// log10(m²) where the area signal saturates (~50 ha)
    pub max_log_area: f64,
    /// |Z| at which the anomaly signal saturates
    pub full_z: f64,
    pub drop_weight: f64,
    pub area_weight: f64,
    pub anomaly_weight: f64,
    /// Loss is detected when confidence is strictly above this
    pub threshold: f64,
}

impl Default for WeightedParams {
    fn default() -> Self {
        Self {
            full_drop: 0.15,
            min_log_area: 4.0,
            max_log_area: 5.7,
            full_z: 1.5,
            drop_weight: 0.4,
            area_weight: 0.4,
            anomaly_weight: 0.2,
            threshold: 0.55,
        }
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl LossModel for WeightedParams {
    fn decide(&self, metrics: &MetricsRecord) -> LossDecision {
        let drop_magnitude = metrics
            .mean_ndvi_change
            .map_or(0.0, |d| unit(d.abs() / self.full_drop));

        let log_area = metrics.area_of_loss_m2.max(1.0).log10();
        let area_weight =
            unit((log_area - self.min_log_area) / (self.max_log_area - self.min_log_area));

        let anomaly_confidence = metrics
            .mean_z_score
            .map_or(0.0, |z| unit(z.abs() / self.full_z));

        let confidence = unit(
            self.drop_weight * drop_magnitude
                + self.area_weight * area_weight
                + self.anomaly_weight * anomaly_confidence,
        );

        LossDecision {
            confidence_score: confidence,
            loss_detected: confidence > self.threshold,
            policy: PolicyKind::Weighted,
            signals: DecisionSignals::Weighted {
                drop_magnitude,
                area_weight,
                anomaly_confidence,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::tests::record;
    use approx::assert_relative_eq;

    #[test]
    fn test_strong_clearing_saturates() {
        let decision = WeightedParams::default().decide(&record(Some(-0.384), None, 2_197_528.0, Some(-4.01)));
        assert_relative_eq!(decision.confidence_score, 1.0, epsilon = 1e-12);
        assert!(decision.loss_detected);
        assert_eq!(decision.policy, PolicyKind::Weighted);
    }

    #[test]
    fn test_area_signal_on_log_scale() {
        // 10^4.85 m² sits halfway between 1 ha and ~50 ha
        let area = 10f64.powf(4.85);
        let decision = WeightedParams::default().decide(&record(Some(0.0), None, area, Some(0.0)));
        match decision.signals {
            DecisionSignals::Weighted { area_weight, .. } => {
                assert_relative_eq!(area_weight, 0.5, epsilon = 1e-9)
            }
            other => panic!("unexpected signals {:?}", other),
        }
        assert_relative_eq!(decision.confidence_score, 0.2, epsilon = 1e-9);
        assert!(!decision.loss_detected);
    }

    #[test]
    fn test_threshold_is_strict() {
        // drop 1.0 * 0.4 + anomaly 0.75 * 0.2 = 0.55
        let metrics = record(Some(-0.2), None, 0.0, Some(1.125));
        let decision = WeightedParams::default().decide(&metrics);
        assert_relative_eq!(decision.confidence_score, 0.55, epsilon = 1e-12);

        let at_threshold = WeightedParams {
            threshold: decision.confidence_score,
            ..Default::default()
        };
        assert!(!at_threshold.decide(&metrics).loss_detected);
    }

    #[test]
    fn test_missing_scalars_contribute_nothing() {
        let decision = WeightedParams::default().decide(&record(None, None, 0.0, None));
        assert_eq!(decision.confidence_score, 0.0);
        assert!(!decision.loss_detected);
    }

    #[test]
    fn test_confidence_bounded_and_deterministic() {
        let params = WeightedParams::default();
        for drop in [-2.0, -0.3, -0.05, 0.0, 0.1, 5.0] {
            for area in [0.0, 1.0, 5e3, 1e5, 1e9] {
                for z in [-50.0, -1.0, 0.0, 0.7, 3.0] {
                    let m = record(Some(drop), None, area, Some(z));
                    let a = params.decide(&m);
                    let b = params.decide(&m);
                    assert!((0.0..=1.0).contains(&a.confidence_score));
                    assert_eq!(a.confidence_score.to_bits(), b.confidence_score.to_bits());
                }
            }
        }
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: WeightedParams = serde_json::from_str(r#"{ "threshold": 0.7 }"#).unwrap();
        assert_eq!(params.threshold, 0.7);
        assert_eq!(params.full_drop, 0.15);
    }
}
