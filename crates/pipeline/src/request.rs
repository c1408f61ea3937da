//! Inbound analysis request

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use verdant_core::{BoundingBox, Error, Result};

/// One before/after comparison over one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub geometry: BoundingBox,
    pub before_date: NaiveDate,
    pub after_date: NaiveDate,
    pub location_label: String,
}

impl AnalysisRequest {
    pub fn new(
        geometry: BoundingBox,
        before_date: NaiveDate,
        after_date: NaiveDate,
        location_label: impl Into<String>,
    ) -> Result<Self> {
        let request = Self {
            geometry,
            before_date,
            after_date,
            location_label: location_label.into(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checked again at the start of every run.
    pub fn validate(&self) -> Result<()> {
        if self.before_date >= self.after_date {
            return Err(Error::InputValidation(format!(
                "before date {} must precede after date {}",
                self.before_date, self.after_date
            )));
        }
        if self.location_label.trim().is_empty() {
            return Err(Error::InputValidation("location label is empty".into()));
        }
        // Geometry deserialized through serde is validated by BoundingBox itself.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(72.95, 22.55, 72.97, 22.56).unwrap()
    }

    #[test]
    fn dates_must_be_ordered() {
        assert!(AnalysisRequest::new(bbox(), date(2024, 6, 1), date(2024, 6, 1), "a").is_err());
        assert!(AnalysisRequest::new(bbox(), date(2024, 6, 2), date(2024, 6, 1), "a").is_err());
        assert!(AnalysisRequest::new(bbox(), date(2024, 1, 1), date(2024, 6, 1), "a").is_ok());
    }

    #[test]
    fn blank_label_is_rejected() {
        let err = AnalysisRequest::new(bbox(), date(2024, 1, 1), date(2024, 6, 1), "  ").unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn deserializes_camel_case_and_validates_geometry() {
        let json = r#"{
            "geometry": [72.95, 22.55, 72.97, 22.56],
            "beforeDate": "2026-02-01",
            "afterDate": "2026-02-20",
            "locationLabel": "anand"
        }"#;
        let request: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.location_label, "anand");
        assert!(request.validate().is_ok());

        let bad = json.replace("72.97", "72.90");
        assert!(serde_json::from_str::<AnalysisRequest>(&bad).is_err());
    }
}
