use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

use crate::filter::{FilterRecord, FilterValue};
use crate::validation::{Change, InputMode, ValidationErrors, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Daily,
    Cycle,
    AsNeeded,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Daily => "daily",
            ScheduleType::Cycle => "cycle",
            ScheduleType::AsNeeded => "as_needed",
        }
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ScheduleType::Daily),
            "cycle" => Ok(ScheduleType::Cycle),
            "as_needed" => Ok(ScheduleType::AsNeeded),
            other => Err(format!("unknown schedule type '{}'", other)),
        }
    }
}

/// A recurring dose definition attached to one medication. Patterns are
/// descriptive only; nothing derives doses or logs from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationPattern {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Uuid,
    pub pattern_name: Option<String>,
    pub schedule_type: ScheduleType,
    pub times_per_day: Option<i32>,
    pub dosage_amount: Option<Decimal>,
    pub dosage_unit: Option<String>,
    pub specific_times: Vec<String>,
    pub days_of_week: Vec<i32>,
    pub interval_hours: Option<i32>,
    pub cycle_days_on: Option<i32>,
    pub cycle_days_off: Option<i32>,
    pub total_cycles: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PatternInput {
    pub pattern_name: Change<String>,
    pub schedule_type: Change<ScheduleType>,
    pub times_per_day: Change<i32>,
    pub dosage_amount: Change<Decimal>,
    pub dosage_unit: Change<String>,
    pub specific_times: Change<Vec<String>>,
    pub days_of_week: Change<Vec<i32>>,
    pub interval_hours: Change<i32>,
    pub cycle_days_on: Change<i32>,
    pub cycle_days_off: Change<i32>,
    pub total_cycles: Change<i32>,
    pub start_date: Change<NaiveDate>,
    pub end_date: Change<NaiveDate>,
    pub is_active: Change<bool>,
    pub notes: Change<String>,
}

impl PatternInput {
    pub fn from_body(body: &Map<String, Value>, mode: InputMode) -> Result<Self, ValidationErrors> {
        let mut v = Validator::new(body);

        let schedule_type = v.one_of("schedule_type");
        let schedule_type = v.required(mode, "schedule_type", schedule_type);
        let start_date = v.date("start_date");
        let start_date = v.required(mode, "start_date", start_date);
        let is_active = v.boolean("is_active");
        let is_active = v.not_null("is_active", is_active);

        let input = Self {
            pattern_name: v.string("pattern_name", 255),
            schedule_type,
            times_per_day: v.integer("times_per_day", 1, 24),
            dosage_amount: v.decimal("dosage_amount"),
            dosage_unit: v.string("dosage_unit", 50),
            specific_times: v.clock_times("specific_times"),
            days_of_week: v.integer_list("days_of_week", 0, 6),
            interval_hours: v.integer("interval_hours", 1, 168),
            cycle_days_on: v.integer("cycle_days_on", 1, 365),
            cycle_days_off: v.integer("cycle_days_off", 1, 365),
            total_cycles: v.integer("total_cycles", 1, 1000),
            start_date,
            end_date: v.date("end_date"),
            is_active,
            notes: v.string("notes", 2000),
        };

        v.finish().map(|_| input)
    }
}

impl MedicationPattern {
    /// Builds a new row from create input and checks the row invariants.
    pub fn create(user_id: Uuid, medication_id: Uuid, input: PatternInput) -> Result<Self, ValidationErrors> {
        let mut missing = ValidationErrors::new();
        let schedule_type = match input.schedule_type {
            Change::Set(t) => Some(t),
            _ => {
                missing.add("schedule_type", "The schedule type field is required.");
                None
            }
        };
        let start_date = match input.start_date {
            Change::Set(d) => Some(d),
            _ => {
                missing.add("start_date", "The start date field is required.");
                None
            }
        };
        let (Some(schedule_type), Some(start_date)) = (schedule_type, start_date) else {
            return Err(missing);
        };

        let now = Utc::now();
        let pattern = Self {
            id: Uuid::new_v4(),
            user_id,
            medication_id,
            pattern_name: input.pattern_name.into_option(),
            schedule_type,
            times_per_day: input.times_per_day.into_option(),
            dosage_amount: input.dosage_amount.into_option(),
            dosage_unit: input.dosage_unit.into_option(),
            specific_times: input.specific_times.into_list(),
            days_of_week: input.days_of_week.into_list(),
            interval_hours: input.interval_hours.into_option(),
            cycle_days_on: input.cycle_days_on.into_option(),
            cycle_days_off: input.cycle_days_off.into_option(),
            total_cycles: input.total_cycles.into_option(),
            start_date,
            end_date: input.end_date.into_option(),
            is_active: input.is_active.into_option().unwrap_or(true),
            notes: input.notes.into_option(),
            created_at: now,
            updated_at: now,
        };
        pattern.check().map(|_| pattern)
    }

    /// Merges a partial update and re-checks the invariants on the result.
    pub fn apply(&mut self, input: PatternInput) -> Result<(), ValidationErrors> {
        let mut merged = self.clone();
        input.pattern_name.apply_to(&mut merged.pattern_name);
        input.schedule_type.apply_required(&mut merged.schedule_type);
        input.times_per_day.apply_to(&mut merged.times_per_day);
        input.dosage_amount.apply_to(&mut merged.dosage_amount);
        input.dosage_unit.apply_to(&mut merged.dosage_unit);
        input.specific_times.apply_list(&mut merged.specific_times);
        input.days_of_week.apply_list(&mut merged.days_of_week);
        input.interval_hours.apply_to(&mut merged.interval_hours);
        input.cycle_days_on.apply_to(&mut merged.cycle_days_on);
        input.cycle_days_off.apply_to(&mut merged.cycle_days_off);
        input.total_cycles.apply_to(&mut merged.total_cycles);
        input.start_date.apply_required(&mut merged.start_date);
        input.end_date.apply_to(&mut merged.end_date);
        input.is_active.apply_required(&mut merged.is_active);
        input.notes.apply_to(&mut merged.notes);
        merged.check()?;

        merged.updated_at = Utc::now();
        *self = merged;
        Ok(())
    }

    /// Date ordering and cycle-field rules.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(end) = self.end_date {
            if end < self.start_date {
                errors.add(
                    "end_date",
                    "The end date field must be a date after or equal to start date.",
                );
            }
        }

        match self.schedule_type {
            ScheduleType::Cycle => {
                if self.cycle_days_on.is_none() {
                    errors.add("cycle_days_on", "The cycle days on field is required when schedule type is cycle.");
                }
                if self.cycle_days_off.is_none() {
                    errors.add("cycle_days_off", "The cycle days off field is required when schedule type is cycle.");
                }
            }
            ScheduleType::Daily | ScheduleType::AsNeeded => {
                for (field, value) in [
                    ("cycle_days_on", self.cycle_days_on),
                    ("cycle_days_off", self.cycle_days_off),
                    ("total_cycles", self.total_cycles),
                ] {
                    if value.is_some() {
                        errors.add(
                            field,
                            format!(
                                "The {} field is only allowed when schedule type is cycle.",
                                field.replace('_', " ")
                            ),
                        );
                    }
                }
            }
        }

        errors.into_result()
    }
}

impl FilterRecord for MedicationPattern {
    fn column(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "medication_id" => Some(self.medication_id.into()),
            "schedule_type" => Some(self.schedule_type.as_str().into()),
            "is_active" => Some(self.is_active.into()),
            "created_at" => Some(self.created_at.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn daily() -> MedicationPattern {
        let input = PatternInput::from_body(
            &body(json!({
                "schedule_type": "daily",
                "times_per_day": 2,
                "specific_times": ["08:00", "20:00"],
                "dosage_amount": "1.5",
                "dosage_unit": "tablet",
                "start_date": "2024-03-01"
            })),
            InputMode::Create,
        )
        .unwrap();
        MedicationPattern::create(Uuid::new_v4(), Uuid::new_v4(), input).unwrap()
    }

    #[test]
    fn create_requires_type_and_start() {
        let errors = PatternInput::from_body(&Map::new(), InputMode::Create).unwrap_err();
        assert!(errors.contains("schedule_type"));
        assert!(errors.contains("start_date"));
    }

    #[test]
    fn cycle_requires_both_counts() {
        let input = PatternInput::from_body(
            &body(json!({ "schedule_type": "cycle", "cycle_days_on": 21, "start_date": "2024-03-01" })),
            InputMode::Create,
        )
        .unwrap();
        let errors = MedicationPattern::create(Uuid::new_v4(), Uuid::new_v4(), input).unwrap_err();
        assert!(errors.contains("cycle_days_off"));
    }

    #[test]
    fn cycle_counts_rejected_for_daily() {
        let mut pattern = daily();
        let patch = PatternInput::from_body(&body(json!({ "cycle_days_on": 5 })), InputMode::Update).unwrap();
        let errors = pattern.apply(patch).unwrap_err();
        assert!(errors.contains("cycle_days_on"));
        assert_eq!(pattern.cycle_days_on, None);
    }

    #[test]
    fn end_date_checked_against_merged_row() {
        let mut pattern = daily();
        let patch = PatternInput::from_body(&body(json!({ "end_date": "2024-02-01" })), InputMode::Update).unwrap();
        assert!(pattern.apply(patch).unwrap_err().contains("end_date"));

        let patch = PatternInput::from_body(&body(json!({ "end_date": "2024-04-01" })), InputMode::Update).unwrap();
        pattern.apply(patch).unwrap();
        assert_eq!(pattern.end_date, NaiveDate::from_ymd_opt(2024, 4, 1));
    }

    #[test]
    fn switching_to_cycle_with_counts() {
        let mut pattern = daily();
        let patch = PatternInput::from_body(
            &body(json!({ "schedule_type": "cycle", "cycle_days_on": 21, "cycle_days_off": 7, "total_cycles": 3 })),
            InputMode::Update,
        )
        .unwrap();
        pattern.apply(patch).unwrap();
        assert_eq!(pattern.schedule_type, ScheduleType::Cycle);
        assert_eq!(pattern.specific_times, vec!["08:00", "20:00"]);
    }

    #[test]
    fn rejects_bad_clock_time_and_weekday() {
        let errors = PatternInput::from_body(
            &body(json!({
                "schedule_type": "daily",
                "start_date": "2024-03-01",
                "specific_times": ["8 o'clock"],
                "days_of_week": [1, 9]
            })),
            InputMode::Create,
        )
        .unwrap_err();
        assert!(errors.contains("specific_times.0"));
        assert!(errors.contains("days_of_week"));
    }
}
