//! Row shapes as stored, converted into domain models on the way out.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    Medication, MedicationLog, MedicationPattern, MedicationSchedule, Session, SideEffectType, User,
};
use crate::store::StoreError;

fn parse_enum<T: std::str::FromStr<Err = String>>(table: &'static str, raw: &str) -> Result<T, StoreError> {
    raw.parse().map_err(|message| StoreError::Decode { table, message })
}

#[derive(FromRow)]
pub struct UserRecord {
    id: Uuid,
    email: String,
    name: String,
    external_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            external_id: self.external_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
pub struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn to_domain(self) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct MedicationRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    image_path: Option<String>,
    generic_name: Option<String>,
    dosage_form: Option<String>,
    strength: Option<String>,
    manufacturer: Option<String>,
    prescription_number: Option<String>,
    prescribing_doctor: Option<String>,
    pharmacy: Option<String>,
    ndc_number: Option<String>,
    indications: Json<Vec<String>>,
    contraindications: Json<Vec<String>>,
    side_effects: Json<Vec<String>>,
    drug_interactions: Json<Vec<String>>,
    storage_instructions: Option<String>,
    notes: Option<String>,
    schedule: Option<Json<MedicationSchedule>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MedicationRecord {
    pub fn to_domain(self) -> Medication {
        Medication {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            image_path: self.image_path,
            generic_name: self.generic_name,
            dosage_form: self.dosage_form,
            strength: self.strength,
            manufacturer: self.manufacturer,
            prescription_number: self.prescription_number,
            prescribing_doctor: self.prescribing_doctor,
            pharmacy: self.pharmacy,
            ndc_number: self.ndc_number,
            indications: self.indications.0,
            contraindications: self.contraindications.0,
            side_effects: self.side_effects.0,
            drug_interactions: self.drug_interactions.0,
            storage_instructions: self.storage_instructions,
            notes: self.notes,
            schedule: self.schedule.map(|s| s.0),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
pub struct PatternRecord {
    id: Uuid,
    user_id: Uuid,
    medication_id: Uuid,
    pattern_name: Option<String>,
    schedule_type: String,
    times_per_day: Option<i32>,
    dosage_amount: Option<Decimal>,
    dosage_unit: Option<String>,
    specific_times: Json<Vec<String>>,
    days_of_week: Json<Vec<i32>>,
    interval_hours: Option<i32>,
    cycle_days_on: Option<i32>,
    cycle_days_off: Option<i32>,
    total_cycles: Option<i32>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    is_active: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PatternRecord {
    pub fn to_domain(self) -> Result<MedicationPattern, StoreError> {
        Ok(MedicationPattern {
            id: self.id,
            user_id: self.user_id,
            medication_id: self.medication_id,
            pattern_name: self.pattern_name,
            schedule_type: parse_enum("medication_patterns", &self.schedule_type)?,
            times_per_day: self.times_per_day,
            dosage_amount: self.dosage_amount,
            dosage_unit: self.dosage_unit,
            specific_times: self.specific_times.0,
            days_of_week: self.days_of_week.0,
            interval_hours: self.interval_hours,
            cycle_days_on: self.cycle_days_on,
            cycle_days_off: self.cycle_days_off,
            total_cycles: self.total_cycles,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct LogRecord {
    id: Uuid,
    user_id: Uuid,
    medication_id: Uuid,
    medication_pattern_id: Option<Uuid>,
    scheduled_at: DateTime<Utc>,
    taken_at: Option<DateTime<Utc>>,
    dosage_amount: Option<Decimal>,
    dosage_unit: Option<String>,
    status: String,
    side_effects: Json<Vec<String>>,
    effectiveness_rating: Option<i32>,
    severity_level: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn to_domain(self) -> Result<MedicationLog, StoreError> {
        Ok(MedicationLog {
            id: self.id,
            user_id: self.user_id,
            medication_id: self.medication_id,
            medication_pattern_id: self.medication_pattern_id,
            scheduled_at: self.scheduled_at,
            taken_at: self.taken_at,
            dosage_amount: self.dosage_amount,
            dosage_unit: self.dosage_unit,
            status: parse_enum("medication_logs", &self.status)?,
            side_effects: self.side_effects.0,
            effectiveness_rating: self.effectiveness_rating,
            severity_level: self
                .severity_level
                .as_deref()
                .map(|s| parse_enum("medication_logs", s))
                .transpose()?,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct SideEffectTypeRecord {
    id: Uuid,
    name: String,
    category: String,
    description: Option<String>,
    severity_level: Option<String>,
    is_common: bool,
    requires_medical_attention: bool,
    symptoms: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SideEffectTypeRecord {
    pub fn to_domain(self) -> Result<SideEffectType, StoreError> {
        Ok(SideEffectType {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            severity_level: self
                .severity_level
                .as_deref()
                .map(|s| parse_enum("side_effect_types", s))
                .transpose()?,
            is_common: self.is_common,
            requires_medical_attention: self.requires_medical_attention,
            symptoms: self.symptoms.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
