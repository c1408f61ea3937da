//! Request geometry and date windows

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An immutable geographic bounding box in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

impl BoundingBox {
    /// Validate and build a box from `(west, south, east, north)`.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(Error::InputValidation(
                "bounding box coordinates must be finite".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return Err(Error::InputValidation(format!(
                "longitudes must lie in [-180, 180], got west={west}, east={east}"
            )));
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(Error::InputValidation(format!(
                "latitudes must lie in [-90, 90], got south={south}, north={north}"
            )));
        }
        if west >= east || south >= north {
            return Err(Error::InputValidation(format!(
                "degenerate bounding box: west={west}, south={south}, east={east}, north={north}"
            )));
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    /// Center as (lon, lat)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west < other.east
            && self.east > other.west
            && self.south < other.north
            && self.north > other.south
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.west <= other.west
            && self.east >= other.east
            && self.south <= other.south
            && self.north >= other.north
    }

    /// `[west, south, east, north]`, the STAC `bbox` order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = Error;

    fn try_from(v: [f64; 4]) -> Result<Self> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.5}, {:.5}, {:.5}, {:.5}]",
            self.west, self.south, self.east, self.north
        )
    }
}

/// A center date with a symmetric month offset: `[center - n, center + n)`.
///
/// Month arithmetic clamps the day of month, so Jan 31 + 1 month is the
/// last day of February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    center: NaiveDate,
    offset_months: u32,
}

impl DateWindow {
    pub fn new(center: NaiveDate, offset_months: u32) -> Result<Self> {
        if offset_months == 0 {
            return Err(Error::InvalidParameter {
                name: "offset_months",
                value: "0".into(),
                reason: "window would be empty".into(),
            });
        }
        let window = Self {
            center,
            offset_months,
        };
        // Fail early on windows that fall off the calendar.
        window.try_bounds()?;
        Ok(window)
    }

    pub fn center(&self) -> NaiveDate {
        self.center
    }

    pub fn offset_months(&self) -> u32 {
        self.offset_months
    }

    fn try_bounds(&self) -> Result<(NaiveDate, NaiveDate)> {
        let months = Months::new(self.offset_months);
        let start = self.center.checked_sub_months(months);
        let end = self.center.checked_add_months(months);
        match (start, end) {
            (Some(s), Some(e)) => Ok((s, e)),
            _ => Err(Error::InputValidation(format!(
                "date window around {} (±{} months) is out of range",
                self.center, self.offset_months
            ))),
        }
    }

    /// Inclusive start.
    pub fn start(&self) -> NaiveDate {
        self.try_bounds().map(|(s, _)| s).unwrap_or(NaiveDate::MIN)
    }

    /// Exclusive end.
    pub fn end(&self) -> NaiveDate {
        self.try_bounds().map(|(_, e)| e).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date < self.end()
    }

    /// The same calendar window `years` years earlier.
    pub fn shifted_years(&self, years: u32) -> Result<DateWindow> {
        let center = self
            .center
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .ok_or_else(|| {
                Error::InputValidation(format!(
                    "cannot shift {} back by {} years",
                    self.center, years
                ))
            })?;
        DateWindow::new(center, self.offset_months)
    }

    /// Calendar year of the center date.
    pub fn year(&self) -> i32 {
        self.center.year()
    }

    /// STAC `datetime` interval; STAC ranges are closed, so the end is the
    /// last second before the exclusive bound.
    pub fn to_stac_datetime(&self) -> String {
        let last = self.end().pred_opt().unwrap_or(self.end());
        format!("{}T00:00:00Z/{}T23:59:59Z", self.start(), last)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start(), self.end())
    }
}
