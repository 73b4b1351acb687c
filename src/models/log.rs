use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

use crate::filter::{FilterRecord, FilterValue};
use crate::validation::{Change, InputMode, ValidationErrors, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Taken,
    Missed,
    Skipped,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Taken => "taken",
            LogStatus::Missed => "missed",
            LogStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taken" => Ok(LogStatus::Taken),
            "missed" => Ok(LogStatus::Missed),
            "skipped" => Ok(LogStatus::Skipped),
            other => Err(format!("unknown log status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Mild,
    Moderate,
    Severe,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Mild => "mild",
            SeverityLevel::Moderate => "moderate",
            SeverityLevel::Severe => "severe",
        }
    }
}

impl FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mild" => Ok(SeverityLevel::Mild),
            "moderate" => Ok(SeverityLevel::Moderate),
            "severe" => Ok(SeverityLevel::Severe),
            other => Err(format!("unknown severity level '{}'", other)),
        }
    }
}

/// One recorded dose event. Rows are independent facts; status may be
/// corrected freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Uuid,
    pub medication_pattern_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub dosage_amount: Option<Decimal>,
    pub dosage_unit: Option<String>,
    pub status: LogStatus,
    pub side_effects: Vec<String>,
    pub effectiveness_rating: Option<i32>,
    pub severity_level: Option<SeverityLevel>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct LogInput {
    pub medication_id: Change<Uuid>,
    pub medication_pattern_id: Change<Uuid>,
    pub scheduled_at: Change<DateTime<Utc>>,
    pub taken_at: Change<DateTime<Utc>>,
    pub dosage_amount: Change<Decimal>,
    pub dosage_unit: Change<String>,
    pub status: Change<LogStatus>,
    pub side_effects: Change<Vec<String>>,
    pub effectiveness_rating: Change<i32>,
    pub severity_level: Change<SeverityLevel>,
    pub notes: Change<String>,
}

impl LogInput {
    pub fn from_body(body: &Map<String, Value>, mode: InputMode) -> Result<Self, ValidationErrors> {
        let mut v = Validator::new(body);

        let medication_id = v.uuid("medication_id");
        let medication_id = v.required(mode, "medication_id", medication_id);
        let scheduled_at = v.datetime("scheduled_at");
        let scheduled_at = v.required(mode, "scheduled_at", scheduled_at);
        let status = v.one_of("status");
        let status = v.required(mode, "status", status);

        let input = Self {
            medication_id,
            medication_pattern_id: v.uuid("medication_pattern_id"),
            scheduled_at,
            taken_at: v.datetime("taken_at"),
            dosage_amount: v.decimal("dosage_amount"),
            dosage_unit: v.string("dosage_unit", 50),
            status,
            side_effects: v.string_list("side_effects", 500),
            effectiveness_rating: v.integer("effectiveness_rating", 1, 5),
            severity_level: v.one_of("severity_level"),
            notes: v.string("notes", 2000),
        };

        v.finish().map(|_| input)
    }
}

impl MedicationLog {
    pub fn create(user_id: Uuid, input: LogInput) -> Result<Self, ValidationErrors> {
        let mut missing = ValidationErrors::new();
        let medication_id = required(&mut missing, "medication_id", input.medication_id);
        let scheduled_at = required(&mut missing, "scheduled_at", input.scheduled_at);
        let status = required(&mut missing, "status", input.status);
        let (Some(medication_id), Some(scheduled_at), Some(status)) = (medication_id, scheduled_at, status) else {
            return Err(missing);
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            medication_id,
            medication_pattern_id: input.medication_pattern_id.into_option(),
            scheduled_at,
            taken_at: input.taken_at.into_option(),
            dosage_amount: input.dosage_amount.into_option(),
            dosage_unit: input.dosage_unit.into_option(),
            status,
            side_effects: input.side_effects.into_list(),
            effectiveness_rating: input.effectiveness_rating.into_option(),
            severity_level: input.severity_level.into_option(),
            notes: input.notes.into_option(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges a partial update. Reference ownership is checked by the store
    /// against the merged row.
    pub fn apply(&mut self, input: LogInput) {
        // Moving a log to another medication drops a pattern link that was
        // not re-supplied, since it would belong to the old medication.
        if let Change::Set(medication_id) = input.medication_id {
            if medication_id != self.medication_id && input.medication_pattern_id.is_keep() {
                self.medication_pattern_id = None;
            }
        }
        input.medication_id.apply_required(&mut self.medication_id);
        input.medication_pattern_id.apply_to(&mut self.medication_pattern_id);
        input.scheduled_at.apply_required(&mut self.scheduled_at);
        input.taken_at.apply_to(&mut self.taken_at);
        input.dosage_amount.apply_to(&mut self.dosage_amount);
        input.dosage_unit.apply_to(&mut self.dosage_unit);
        input.status.apply_required(&mut self.status);
        input.side_effects.apply_list(&mut self.side_effects);
        input.effectiveness_rating.apply_to(&mut self.effectiveness_rating);
        input.severity_level.apply_to(&mut self.severity_level);
        input.notes.apply_to(&mut self.notes);
        self.updated_at = Utc::now();
    }
}

fn required<T>(errors: &mut ValidationErrors, field: &str, change: Change<T>) -> Option<T> {
    match change {
        Change::Set(v) => Some(v),
        _ => {
            errors.add(field, format!("The {} field is required.", field.replace('_', " ")));
            None
        }
    }
}

impl FilterRecord for MedicationLog {
    fn column(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "medication_id" => Some(self.medication_id.into()),
            "medication_pattern_id" => self.medication_pattern_id.map(Into::into),
            "status" => Some(self.status.as_str().into()),
            "scheduled_at" => Some(self.scheduled_at.into()),
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

    #[test]
    fn create_requires_core_fields() {
        let errors = LogInput::from_body(&Map::new(), InputMode::Create).unwrap_err();
        for field in ["medication_id", "scheduled_at", "status"] {
            assert!(errors.contains(field), "{}", field);
        }
    }

    #[test]
    fn rating_is_bounded() {
        let errors = LogInput::from_body(&body(json!({ "effectiveness_rating": 6 })), InputMode::Update).unwrap_err();
        assert!(errors.contains("effectiveness_rating"));
    }

    #[test]
    fn update_rejects_null_status() {
        let errors = LogInput::from_body(&body(json!({ "status": null })), InputMode::Update).unwrap_err();
        assert!(errors.contains("status"));
    }

    #[test]
    fn moving_medication_drops_stale_pattern() {
        let input = LogInput::from_body(
            &body(json!({
                "medication_id": Uuid::new_v4(),
                "medication_pattern_id": Uuid::new_v4(),
                "scheduled_at": "2024-03-01T08:00:00Z",
                "status": "taken",
                "severity_level": "mild"
            })),
            InputMode::Create,
        )
        .unwrap();
        let mut log = MedicationLog::create(Uuid::new_v4(), input).unwrap();
        assert_eq!(log.severity_level, Some(SeverityLevel::Mild));

        let patch = LogInput::from_body(&body(json!({ "medication_id": Uuid::new_v4() })), InputMode::Update).unwrap();
        log.apply(patch);
        assert_eq!(log.medication_pattern_id, None);
    }
}
