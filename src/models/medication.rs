use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::filter::{FilterRecord, FilterValue};
use crate::validation::{Change, InputMode, ValidationErrors, Validator};

/// A prescribed drug record owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub generic_name: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub manufacturer: Option<String>,
    pub prescription_number: Option<String>,
    pub prescribing_doctor: Option<String>,
    pub pharmacy: Option<String>,
    pub ndc_number: Option<String>,
    pub indications: Vec<String>,
    pub contraindications: Vec<String>,
    pub side_effects: Vec<String>,
    pub drug_interactions: Vec<String>,
    pub storage_instructions: Option<String>,
    pub notes: Option<String>,
    pub schedule: Option<MedicationSchedule>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-side schedule snapshot stored alongside the medication. It is
/// opaque to the server apart from its shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSchedule {
    #[serde(rename = "type")]
    pub schedule_type: Option<String>,
    pub doses_per_day: Option<i32>,
    #[serde(default)]
    pub times: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cycle_pattern: Option<Value>,
}

/// Validated medication fields from a create or update body.
#[derive(Debug, Clone, Default)]
pub struct MedicationInput {
    pub name: Change<String>,
    pub description: Change<String>,
    pub image_path: Change<String>,
    pub generic_name: Change<String>,
    pub dosage_form: Change<String>,
    pub strength: Change<String>,
    pub manufacturer: Change<String>,
    pub prescription_number: Change<String>,
    pub prescribing_doctor: Change<String>,
    pub pharmacy: Change<String>,
    pub ndc_number: Change<String>,
    pub indications: Change<Vec<String>>,
    pub contraindications: Change<Vec<String>>,
    pub side_effects: Change<Vec<String>>,
    pub drug_interactions: Change<Vec<String>>,
    pub storage_instructions: Change<String>,
    pub notes: Change<String>,
    pub schedule: Change<MedicationSchedule>,
    pub is_active: Change<bool>,
}

const LIST_ITEM_MAX: usize = 500;

impl MedicationInput {
    pub fn from_body(body: &Map<String, Value>, mode: InputMode) -> Result<Self, ValidationErrors> {
        let mut v = Validator::new(body);

        let name = match mode {
            InputMode::Create => v.required_string("name", 255).map_or(Change::Keep, Change::Set),
            InputMode::Update => v.present_string("name", 255),
        };
        let is_active = v.boolean("is_active");
        let is_active = v.not_null("is_active", is_active);

        let input = Self {
            name,
            description: v.string("description", 65_535),
            image_path: v.string("image_path", 500),
            generic_name: v.string("generic_name", 255),
            dosage_form: v.string("dosage_form", 100),
            strength: v.string("strength", 100),
            manufacturer: v.string("manufacturer", 255),
            prescription_number: v.string("prescription_number", 100),
            prescribing_doctor: v.string("prescribing_doctor", 255),
            pharmacy: v.string("pharmacy", 255),
            ndc_number: v.string("ndc_number", 50),
            indications: v.string_list("indications", LIST_ITEM_MAX),
            contraindications: v.string_list("contraindications", LIST_ITEM_MAX),
            side_effects: v.string_list("side_effects", LIST_ITEM_MAX),
            drug_interactions: v.string_list("drug_interactions", LIST_ITEM_MAX),
            storage_instructions: v.string("storage_instructions", 1000),
            notes: v.string("notes", 2000),
            schedule: schedule_change(&mut v),
            is_active,
        };

        v.finish().map(|_| input)
    }
}

fn schedule_change(v: &mut Validator<'_>) -> Change<MedicationSchedule> {
    let body = match v.object("schedule") {
        Change::Set(body) => body,
        Change::Clear => return Change::Clear,
        Change::Keep => return Change::Keep,
    };

    let mut s = v.nested("schedule", body);
    let schedule = MedicationSchedule {
        schedule_type: s.string("type", 50).into_option(),
        doses_per_day: s.integer("dosesPerDay", 1, 24).into_option(),
        times: s.clock_times("times").into_list(),
        start_date: s.date("startDate").into_option(),
        end_date: s.date("endDate").into_option(),
        cycle_pattern: match body.get("cyclePattern") {
            None | Some(Value::Null) => None,
            Some(p @ (Value::Array(_) | Value::Object(_))) => Some(p.clone()),
            Some(_) => {
                s.add_error("cyclePattern", "The schedule.cyclePattern field must be an array.");
                None
            }
        },
    };
    if let (Some(start), Some(end)) = (schedule.start_date, schedule.end_date) {
        if end < start {
            s.add_error(
                "endDate",
                "The schedule.endDate field must be a date after or equal to schedule.startDate.",
            );
        }
    }

    let failed = s.has_errors();
    v.absorb(s);
    if failed {
        Change::Keep
    } else {
        Change::Set(schedule)
    }
}

impl Medication {
    /// Builds a new row; `input` must come from [`InputMode::Create`].
    pub fn create(user_id: Uuid, input: MedicationInput) -> Result<Self, ValidationErrors> {
        let Change::Set(name) = input.name else {
            return Err(ValidationErrors::single("name", "The name field is required."));
        };
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            description: input.description.into_option(),
            image_path: input.image_path.into_option(),
            generic_name: input.generic_name.into_option(),
            dosage_form: input.dosage_form.into_option(),
            strength: input.strength.into_option(),
            manufacturer: input.manufacturer.into_option(),
            prescription_number: input.prescription_number.into_option(),
            prescribing_doctor: input.prescribing_doctor.into_option(),
            pharmacy: input.pharmacy.into_option(),
            ndc_number: input.ndc_number.into_option(),
            indications: input.indications.into_list(),
            contraindications: input.contraindications.into_list(),
            side_effects: input.side_effects.into_list(),
            drug_interactions: input.drug_interactions.into_list(),
            storage_instructions: input.storage_instructions.into_option(),
            notes: input.notes.into_option(),
            schedule: input.schedule.into_option(),
            is_active: input.is_active.into_option().unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges a partial update; `id` and `user_id` never change.
    pub fn apply(&mut self, input: MedicationInput) {
        input.name.apply_required(&mut self.name);
        input.description.apply_to(&mut self.description);
        input.image_path.apply_to(&mut self.image_path);
        input.generic_name.apply_to(&mut self.generic_name);
        input.dosage_form.apply_to(&mut self.dosage_form);
        input.strength.apply_to(&mut self.strength);
        input.manufacturer.apply_to(&mut self.manufacturer);
        input.prescription_number.apply_to(&mut self.prescription_number);
        input.prescribing_doctor.apply_to(&mut self.prescribing_doctor);
        input.pharmacy.apply_to(&mut self.pharmacy);
        input.ndc_number.apply_to(&mut self.ndc_number);
        input.indications.apply_list(&mut self.indications);
        input.contraindications.apply_list(&mut self.contraindications);
        input.side_effects.apply_list(&mut self.side_effects);
        input.drug_interactions.apply_list(&mut self.drug_interactions);
        input.storage_instructions.apply_to(&mut self.storage_instructions);
        input.notes.apply_to(&mut self.notes);
        input.schedule.apply_to(&mut self.schedule);
        input.is_active.apply_required(&mut self.is_active);
        self.updated_at = Utc::now();
    }
}

impl FilterRecord for Medication {
    fn column(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "name" => Some(self.name.as_str().into()),
            "generic_name" => self.generic_name.as_deref().map(Into::into),
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

    #[test]
    fn create_applies_defaults() {
        let input = MedicationInput::from_body(&body(json!({ "name": "Aspirin", "dosage_form": "tablet" })), InputMode::Create)
            .unwrap();
        let med = Medication::create(Uuid::new_v4(), input).unwrap();
        assert!(med.is_active);
        assert!(med.indications.is_empty());
        assert_eq!(med.dosage_form.as_deref(), Some("tablet"));
        assert_eq!(med.created_at, med.updated_at);
    }

    #[test]
    fn create_requires_name() {
        let errors = MedicationInput::from_body(&Map::new(), InputMode::Create).unwrap_err();
        assert!(errors.contains("name"));
    }

    #[test]
    fn update_rejects_null_name_and_flag() {
        let errors =
            MedicationInput::from_body(&body(json!({ "name": null, "is_active": null })), InputMode::Update).unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("is_active"));
    }

    #[test]
    fn partial_update_semantics() {
        let create = body(json!({
            "name": "Aspirin",
            "notes": "with food",
            "strength": "100mg",
            "indications": ["pain", "fever"]
        }));
        let mut med =
            Medication::create(Uuid::new_v4(), MedicationInput::from_body(&create, InputMode::Create).unwrap()).unwrap();

        let patch = body(json!({ "notes": null, "indications": null, "pharmacy": "Corner Drug" }));
        med.apply(MedicationInput::from_body(&patch, InputMode::Update).unwrap());

        assert_eq!(med.name, "Aspirin");
        assert_eq!(med.strength.as_deref(), Some("100mg"));
        assert_eq!(med.notes, None);
        assert!(med.indications.is_empty());
        assert_eq!(med.pharmacy.as_deref(), Some("Corner Drug"));
    }

    #[test]
    fn schedule_end_must_not_precede_start() {
        let patch = body(json!({
            "name": "Aspirin",
            "schedule": { "type": "daily", "startDate": "2024-03-10", "endDate": "2024-03-01" }
        }));
        let errors = MedicationInput::from_body(&patch, InputMode::Create).unwrap_err();
        assert!(errors.contains("schedule.endDate"));
    }

    #[test]
    fn schedule_times_must_be_clock_times() {
        let patch = body(json!({
            "name": "Aspirin",
            "schedule": { "type": "daily", "times": ["08:00", "after lunch"] }
        }));
        let errors = MedicationInput::from_body(&patch, InputMode::Create).unwrap_err();
        assert!(errors.contains("schedule.times.1"));

        let patch = body(json!({ "name": "Aspirin", "schedule": { "times": ["24:30"] } }));
        let errors = MedicationInput::from_body(&patch, InputMode::Create).unwrap_err();
        assert!(errors.contains("schedule.times.0"));
    }

    #[test]
    fn schedule_round_trips_camel_case() {
        let patch = body(json!({
            "name": "Aspirin",
            "schedule": { "type": "daily", "dosesPerDay": 2, "times": ["08:00", "20:00"], "startDate": "2024-03-01" }
        }));
        let med = Medication::create(Uuid::new_v4(), MedicationInput::from_body(&patch, InputMode::Create).unwrap())
            .unwrap();
        let out = serde_json::to_value(&med).unwrap();
        assert_eq!(out["schedule"]["dosesPerDay"], 2);
        assert_eq!(out["schedule"]["type"], "daily");
        assert_eq!(out["schedule"]["endDate"], Value::Null);
    }
}
