//! Loss decision from region metrics
//!
//! Two policies are supported and neither is preferred: the caller picks
//! one explicitly through [`DecisionPolicy`].
//!
//! - **weighted**: blended confidence of drop, area and anomaly signals
//! - **hard_rule**: conjunction of clearing, area and anomaly/construction

mod hard_rule;
mod weighted;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use verdant_core::{Error, MetricsRecord, Result};

pub use hard_rule::HardRuleParams;
pub use weighted::WeightedParams;

/// A stateless mapping from region metrics to a loss decision.
pub trait LossModel {
    fn decide(&self, metrics: &MetricsRecord) -> LossDecision;
}

/// Which decision policy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Weighted,
    HardRule,
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Weighted => "weighted",
            PolicyKind::HardRule => "hard_rule",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "weighted" => Ok(PolicyKind::Weighted),
            "hard_rule" => Ok(PolicyKind::HardRule),
            _ => Err(Error::InvalidParameter {
                name: "policy",
                value: s.to_string(),
                reason: "expected 'weighted' or 'hard_rule'".into(),
            }),
        }
    }
}

/// The configured decision policy with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DecisionPolicy {
    Weighted(WeightedParams),
    HardRule(HardRuleParams),
}

impl DecisionPolicy {
    /// The named policy with its default parameters.
    pub fn with_defaults(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Weighted => DecisionPolicy::Weighted(WeightedParams::default()),
            PolicyKind::HardRule => DecisionPolicy::HardRule(HardRuleParams::default()),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            DecisionPolicy::Weighted(_) => PolicyKind::Weighted,
            DecisionPolicy::HardRule(_) => PolicyKind::HardRule,
        }
    }
}

impl LossModel for DecisionPolicy {
    fn decide(&self, metrics: &MetricsRecord) -> LossDecision {
        match self {
            DecisionPolicy::Weighted(params) => params.decide(metrics),
            DecisionPolicy::HardRule(params) => params.decide(metrics),
        }
    }
}

/// Intermediate signals behind a decision, per policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionSignals {
    Weighted {
        drop_magnitude: f64,
        area_weight: f64,
        anomaly_confidence: f64,
    },
    HardRule {
        is_anomalous: bool,
        is_definite_clearing: bool,
        is_construction: bool,
        is_significant_area: bool,
    },
}

/// Output of the loss model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossDecision {
    /// In [0, 1]; for the hard-rule policy, the fraction of criteria met
    pub confidence_score: f64,
    pub loss_detected: bool,
    pub policy: PolicyKind,
    pub signals: DecisionSignals,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn record(
        ndvi_change: Option<f64>,
        ndbi_change: Option<f64>,
        area_m2: f64,
        z: Option<f64>,
    ) -> MetricsRecord {
        MetricsRecord {
            location_label: "test".into(),
            before_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            after_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            mean_ndvi_change: ndvi_change,
            mean_evi_change: None,
            mean_ndmi_change: None,
            mean_ndbi_change: ndbi_change,
            mean_nbr_change: None,
            mean_z_score: z,
            historical_baseline_mu: None,
            historical_variability_sigma: None,
            area_of_loss_m2: area_m2,
            baseline_years_used: 2,
        }
    }

    #[test]
    fn test_policy_dispatch() {
        let metrics = record(Some(-0.384), Some(0.0), 2_197_528.0, Some(-4.01));
        let weighted = DecisionPolicy::with_defaults(PolicyKind::Weighted).decide(&metrics);
        let hard = DecisionPolicy::with_defaults(PolicyKind::HardRule).decide(&metrics);
        assert_eq!(weighted.policy, PolicyKind::Weighted);
        assert_eq!(hard.policy, PolicyKind::HardRule);
        assert!(weighted.loss_detected && hard.loss_detected);
    }

    #[test]
    fn test_policy_names_parse() {
        assert_eq!("hard-rule".parse::<PolicyKind>().unwrap(), PolicyKind::HardRule);
        assert_eq!("Weighted".parse::<PolicyKind>().unwrap(), PolicyKind::Weighted);
        assert!("majority".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn test_policy_config_shape() {
        let policy: DecisionPolicy =
            serde_json::from_str(r#"{ "policy": "hard_rule", "min_area_m2": 10000.0 }"#).unwrap();
        match policy {
            DecisionPolicy::HardRule(p) => {
                assert_eq!(p.min_area_m2, 10_000.0);
                assert_eq!(p.min_abs_z, 0.5);
            }
            other => panic!("unexpected policy {:?}", other),
        }

        let weighted: DecisionPolicy = serde_json::from_str(r#"{ "policy": "weighted" }"#).unwrap();
        assert_eq!(weighted, DecisionPolicy::Weighted(WeightedParams::default()));
    }

    #[test]
    fn test_decision_serializes_policy_tag() {
        let decision = DecisionPolicy::with_defaults(PolicyKind::HardRule)
            .decide(&record(None, None, 0.0, None));
        let value = serde_json::to_value(decision).unwrap();
        assert_eq!(value["policy"], "hard_rule");
        assert_eq!(value["signals"]["kind"], "hard_rule");
    }
}
