//! Request payloads sent to the transparency platform.

use crate::utils::error::{EpiasError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Offset of the Europe/Istanbul wall clock the platform works in.
pub const ISTANBUL_OFFSET: &str = "+03:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSort {
    pub direction: String,
    pub field: String,
}

impl Default for PageSort {
    fn default() -> Self {
        Self {
            direction: "ASC".to_string(),
            field: "date".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    pub number: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<PageSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PageConfig {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number,
            size,
            sort: None,
            total: None,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::new(1, 100)
    }
}

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(EpiasError::ValidationError {
                message: format!("end date {} is before start date {}", end, start),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_of_range(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    pub fn end_of_range(&self) -> NaiveDateTime {
        self.end.and_hms_opt(23, 59, 59).unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
    }

    pub fn from_preset(preset: DatePreset, today: NaiveDate) -> Self {
        let start = match preset {
            DatePreset::Today => today,
            DatePreset::Last7Days => today - Duration::days(7),
            DatePreset::Last30Days => today - Duration::days(30),
            DatePreset::ThisMonth => today.with_day(1).unwrap_or(today),
        };
        Self { start, end: today }
    }

    /// Range ending today and reaching `days_back` days into the past.
    pub fn trailing(days_back: i64, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(days_back.max(0)),
            end: today,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Last7Days,
    Last30Days,
    ThisMonth,
}

impl FromStr for DatePreset {
    type Err = EpiasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "today" => Ok(DatePreset::Today),
            "last7" | "last-7-days" | "week" => Ok(DatePreset::Last7Days),
            "last30" | "last-30-days" | "month" => Ok(DatePreset::Last30Days),
            "this-month" | "mtd" => Ok(DatePreset::ThisMonth),
            other => Err(EpiasError::ValidationError {
                message: format!(
                    "unknown date preset '{}' (expected today, last7, last30, this-month)",
                    other
                ),
            }),
        }
    }
}

pub fn format_api_datetime(dt: &NaiveDateTime) -> String {
    format!("{}{}", dt.format("%Y-%m-%dT%H:%M:%S"), ISTANBUL_OFFSET)
}

fn serialize_api_datetime<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_api_datetime(dt))
}

/// `startDate` / `endDate` body shared by almost every data endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeRequest {
    #[serde(serialize_with = "serialize_api_datetime")]
    pub start_date: NaiveDateTime,
    #[serde(serialize_with = "serialize_api_datetime")]
    pub end_date: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_plant_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uevcb_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageConfig>,
}

impl DateRangeRequest {
    pub fn new(range: &DateRange) -> Self {
        Self {
            start_date: range.start_of_range(),
            end_date: range.end_of_range(),
            organization_id: None,
            power_plant_id: None,
            uevcb_id: None,
            province_id: None,
            district_id: None,
            profile_group: None,
            contract_type: None,
            period: None,
            page: None,
        }
    }

    pub fn with_organization(mut self, organization_id: u64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn with_power_plant(mut self, power_plant_id: Option<u64>) -> Self {
        self.power_plant_id = power_plant_id;
        self
    }

    pub fn with_province(mut self, province_id: Option<u64>) -> Self {
        self.province_id = province_id;
        self
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UevcbListRequest {
    pub organization_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted_dates() {
        assert!(DateRange::new(day("2024-03-02"), day("2024-03-01")).is_err());
        let range = DateRange::new(day("2024-03-01"), day("2024-03-01")).unwrap();
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn test_request_serializes_istanbul_timestamps() {
        let range = DateRange::new(day("2024-03-01"), day("2024-03-02")).unwrap();
        let body = DateRangeRequest::new(&range)
            .with_organization(42)
            .to_json()
            .unwrap();

        assert_eq!(body["startDate"], "2024-03-01T00:00:00+03:00");
        assert_eq!(body["endDate"], "2024-03-02T23:59:59+03:00");
        assert_eq!(body["organizationId"], 42);
        assert!(body.get("powerPlantId").is_none());
        assert!(body.get("page").is_none());
    }

    #[test]
    fn test_presets() {
        let today = day("2024-03-15");
        assert_eq!(DateRange::from_preset(DatePreset::Today, today).start(), today);
        assert_eq!(
            DateRange::from_preset(DatePreset::Last7Days, today).start(),
            day("2024-03-08")
        );
        assert_eq!(
            DateRange::from_preset(DatePreset::Last30Days, today).start(),
            day("2024-02-14")
        );
        assert_eq!(
            DateRange::from_preset(DatePreset::ThisMonth, today).start(),
            day("2024-03-01")
        );
        assert!("yesterday".parse::<DatePreset>().is_err());
        assert_eq!("this-month".parse::<DatePreset>().unwrap(), DatePreset::ThisMonth);
    }
}
