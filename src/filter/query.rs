//! Query-string parameters for the list endpoints and the typed criteria
//! they parse into.
//!
//! Raw parameters arrive as strings so that a bad value becomes a field
//! error in a 422 response instead of an extractor rejection.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::error::FilterError;
use super::filter::Filter;
use super::page::PageRequest;
use super::types::{FilterOp, SortDirection};
use crate::config::ApiConfig;
use crate::models::{LogStatus, ScheduleType};
use crate::validation::{parse_date, ValidationErrors};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationQuery {
    pub active: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternQuery {
    pub active: Option<String>,
    pub schedule_type: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub medication_id: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationCriteria {
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternCriteria {
    pub active: Option<bool>,
    pub schedule_type: Option<ScheduleType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogCriteria {
    /// Half-open `[from, until)` range over `scheduled_at`.
    pub scheduled: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub status: Option<LogStatus>,
    pub medication_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogCriteria {
    pub category: Option<String>,
}

impl MedicationQuery {
    pub fn parse(&self, api: &ApiConfig) -> Result<(MedicationCriteria, PageRequest), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let criteria = MedicationCriteria {
            active: parse_active(self.active.as_deref(), &mut errors),
            search: non_blank(self.search.as_deref()),
        };
        let page = page_request(self.page.as_deref(), self.per_page.as_deref(), api, &mut errors);
        errors.into_result().map(|_| (criteria, page))
    }
}

impl PatternQuery {
    pub fn parse(&self, api: &ApiConfig) -> Result<(PatternCriteria, PageRequest), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let schedule_type = match non_blank(self.schedule_type.as_deref()) {
            Some(raw) => match raw.parse::<ScheduleType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    errors.add("schedule_type", "The selected schedule type is invalid.");
                    None
                }
            },
            None => None,
        };
        let criteria = PatternCriteria {
            active: parse_active(self.active.as_deref(), &mut errors),
            schedule_type,
        };
        let page = page_request(self.page.as_deref(), self.per_page.as_deref(), api, &mut errors);
        errors.into_result().map(|_| (criteria, page))
    }
}

impl LogQuery {
    pub fn parse(&self, api: &ApiConfig) -> Result<(LogCriteria, PageRequest), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let start = parse_filter_date("start_date", self.start_date.as_deref(), &mut errors);
        let end = parse_filter_date("end_date", self.end_date.as_deref(), &mut errors);
        let scheduled = match (start, end) {
            (Some(start), Some(end)) if end < start => {
                errors.add(
                    "end_date",
                    "The end date field must be a date after or equal to start date.",
                );
                None
            }
            (Some(start), Some(end)) => day_range(start, end),
            (Some(_), None) if !errors.contains("end_date") => {
                errors.add("end_date", "The end date field is required when start date is present.");
                None
            }
            (None, Some(_)) if !errors.contains("start_date") => {
                errors.add("start_date", "The start date field is required when end date is present.");
                None
            }
            _ => None,
        };

        let status = match non_blank(self.status.as_deref()) {
            Some(raw) => match raw.parse::<LogStatus>() {
                Ok(s) => Some(s),
                Err(_) => {
                    errors.add("status", "The selected status is invalid.");
                    None
                }
            },
            None => None,
        };

        let medication_id = match non_blank(self.medication_id.as_deref()) {
            Some(raw) => match Uuid::parse_str(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("medication_id", "The medication id field must be a valid identifier.");
                    None
                }
            },
            None => None,
        };

        let page = page_request(self.page.as_deref(), self.per_page.as_deref(), api, &mut errors);
        errors
            .into_result()
            .map(|_| (LogCriteria { scheduled, status, medication_id }, page))
    }
}

impl MedicationCriteria {
    pub fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        if let Some(active) = self.active {
            filter.where_eq("is_active", active)?;
        }
        if let Some(term) = &self.search {
            filter.where_contains_any(&["name", "generic_name"], term)?;
        }
        filter.order_by("created_at", SortDirection::Desc)?;
        Ok(())
    }
}

impl PatternCriteria {
    pub fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        if let Some(active) = self.active {
            filter.where_eq("is_active", active)?;
        }
        if let Some(schedule_type) = self.schedule_type {
            filter.where_eq("schedule_type", schedule_type.as_str())?;
        }
        filter.order_by("created_at", SortDirection::Desc)?;
        Ok(())
    }
}

impl LogCriteria {
    pub fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        if let Some((from, until)) = self.scheduled {
            filter.where_field("scheduled_at", FilterOp::Gte, from)?;
            filter.where_field("scheduled_at", FilterOp::Lt, until)?;
        }
        if let Some(status) = self.status {
            filter.where_eq("status", status.as_str())?;
        }
        if let Some(medication_id) = self.medication_id {
            filter.where_eq("medication_id", medication_id)?;
        }
        filter
            .order_by("scheduled_at", SortDirection::Desc)?
            .order_by("created_at", SortDirection::Desc)?;
        Ok(())
    }
}

impl CatalogCriteria {
    pub fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        if let Some(category) = &self.category {
            filter.where_eq("category", category.as_str())?;
        }
        filter
            .order_by("category", SortDirection::Asc)?
            .order_by("name", SortDirection::Asc)?;
        Ok(())
    }
}

/// `true|false|1|0|yes|no|on|off`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_active(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<bool> {
    let raw = non_blank(raw)?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        errors.add("active", "The active field must be true or false.");
    }
    parsed
}

fn parse_filter_date(field: &str, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    let raw = non_blank(raw)?;
    let parsed = parse_date(&raw);
    if parsed.is_none() {
        errors.add(
            field,
            format!("The {} field must be a valid date.", field.replace('_', " ")),
        );
    }
    parsed
}

/// Inclusive UTC day range as `[start 00:00, end+1 00:00)`.
fn day_range(start: NaiveDate, end: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let from = start.and_hms_opt(0, 0, 0)?.and_utc();
    let until = end.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((from, until))
}

fn page_request(
    page: Option<&str>,
    per_page: Option<&str>,
    api: &ApiConfig,
    errors: &mut ValidationErrors,
) -> PageRequest {
    let page = match non_blank(page) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                errors.add("page", "The page field must be an integer of at least 1.");
                1
            }
        },
        None => 1,
    };
    let per_page = match non_blank(per_page) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => n.min(api.max_per_page),
            _ => {
                errors.add("per_page", "The per page field must be an integer of at least 1.");
                api.default_per_page
            }
        },
        None => api.default_per_page,
    };
    PageRequest { page, per_page }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn api() -> ApiConfig {
        AppConfig::development().api
    }

    #[test]
    fn active_accepts_common_spellings() {
        for (raw, expected) in [("true", true), ("1", true), ("YES", true), ("on", true), ("off", false), ("0", false)] {
            let query = MedicationQuery { active: Some(raw.to_string()), ..Default::default() };
            let (criteria, _) = query.parse(&api()).unwrap();
            assert_eq!(criteria.active, Some(expected), "{}", raw);
        }
        let query = MedicationQuery { active: Some("maybe".to_string()), ..Default::default() };
        assert!(query.parse(&api()).unwrap_err().contains("active"));
    }

    #[test]
    fn pagination_defaults_and_cap() {
        let (_, page) = MedicationQuery::default().parse(&api()).unwrap();
        assert_eq!(page, PageRequest { page: 1, per_page: 15 });

        let query = MedicationQuery { per_page: Some("5000".to_string()), ..Default::default() };
        let (_, page) = query.parse(&api()).unwrap();
        assert_eq!(page.per_page, api().max_per_page);

        let query = MedicationQuery { page: Some("0".to_string()), ..Default::default() };
        assert!(query.parse(&api()).unwrap_err().contains("page"));
    }

    #[test]
    fn date_range_requires_both_ends() {
        let query = LogQuery { start_date: Some("2024-03-01".to_string()), ..Default::default() };
        assert!(query.parse(&api()).unwrap_err().contains("end_date"));

        let query = LogQuery { end_date: Some("2024-03-01".to_string()), ..Default::default() };
        assert!(query.parse(&api()).unwrap_err().contains("start_date"));
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        let query = LogQuery {
            start_date: Some("2024-03-05".to_string()),
            end_date: Some("2024-03-01".to_string()),
            ..Default::default()
        };
        assert!(query.parse(&api()).unwrap_err().contains("end_date"));
    }

    #[test]
    fn date_range_covers_whole_end_day() {
        let query = LogQuery {
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-03-01".to_string()),
            ..Default::default()
        };
        let (criteria, _) = query.parse(&api()).unwrap();
        let (from, until) = criteria.scheduled.unwrap();
        assert_eq!(from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(until.to_rfc3339(), "2024-03-02T00:00:00+00:00");
    }

    #[test]
    fn rejects_unknown_status() {
        let query = LogQuery { status: Some("forgotten".to_string()), ..Default::default() };
        assert!(query.parse(&api()).unwrap_err().contains("status"));
        let query = LogQuery { status: Some("taken".to_string()), ..Default::default() };
        assert_eq!(query.parse(&api()).unwrap().0.status, Some(LogStatus::Taken));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = MedicationQuery { search: Some("  ".to_string()), ..Default::default() };
        assert_eq!(query.parse(&api()).unwrap().0.search, None);
    }
}
