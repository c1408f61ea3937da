//! Region-level result of one analysis run

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Region reductions of every raster produced by one run.
///
/// Field names match the persisted report document. Scalars are `None`
/// only when every contributing pixel was no-data; a record is never built
/// from a partially finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(rename = "locationName")]
    pub location_label: String,
    #[serde(rename = "beforeDate")]
    pub before_date: NaiveDate,
    #[serde(rename = "afterDate")]
    pub after_date: NaiveDate,
    pub mean_ndvi_change: Option<f64>,
    pub mean_evi_change: Option<f64>,
    pub mean_ndmi_change: Option<f64>,
    pub mean_ndbi_change: Option<f64>,
    pub mean_nbr_change: Option<f64>,
    pub mean_z_score: Option<f64>,
    pub historical_baseline_mu: Option<f64>,
    pub historical_variability_sigma: Option<f64>,
    pub area_of_loss_m2: f64,
    /// Historical years that contributed at least one composite
    #[serde(default)]
    pub baseline_years_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_report_document() {
        let json = r#"{
            "locationName": "anand",
            "beforeDate": "2026-02-01",
            "afterDate": "2026-02-20",
            "mean_ndvi_change": -0.013529697928220504,
            "mean_evi_change": -0.005696507884254989,
            "mean_ndmi_change": -0.006393497077631907,
            "mean_ndbi_change": 0.006393497077631907,
            "mean_nbr_change": -0.002871656810564468,
            "mean_z_score": 0.10410301305233988,
            "historical_baseline_mu": 0.2735583673804922,
            "historical_variability_sigma": 0.0491262057969278,
            "area_of_loss_m2": 0
        }"#;
        let record: MetricsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.location_label, "anand");
        assert_eq!(record.area_of_loss_m2, 0.0);
        assert_eq!(record.baseline_years_used, 0);
        assert_eq!(record.mean_z_score, Some(0.10410301305233988));
    }

    #[test]
    fn missing_scalars_serialize_as_null() {
        let record = MetricsRecord {
            location_label: "x".into(),
            before_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            after_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            mean_ndvi_change: Some(-0.1),
            mean_evi_change: None,
            mean_ndmi_change: None,
            mean_ndbi_change: None,
            mean_nbr_change: None,
            mean_z_score: None,
            historical_baseline_mu: None,
            historical_variability_sigma: None,
            area_of_loss_m2: 12.5,
            baseline_years_used: 2,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["mean_z_score"].is_null());
        assert_eq!(value["locationName"], "x");
    }
}
