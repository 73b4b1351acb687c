use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Medication, MedicationLog, MedicationPattern};

/// A medication as returned by the medication endpoints: its own fields plus
/// the patterns and logs that hang off it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationWithRelations {
    #[serde(flatten)]
    pub medication: Medication,
    pub patterns: Vec<MedicationPattern>,
    pub logs: Vec<MedicationLog>,
}

impl MedicationWithRelations {
    /// Distributes children over their medications. Medication order and the
    /// order of children within each medication are preserved.
    pub fn assemble(
        medications: Vec<Medication>,
        patterns: Vec<MedicationPattern>,
        logs: Vec<MedicationLog>,
    ) -> Vec<Self> {
        let mut patterns = group_by(patterns, |p| p.medication_id);
        let mut logs = group_by(logs, |l| l.medication_id);
        medications
            .into_iter()
            .map(|medication| Self {
                patterns: patterns.remove(&medication.id).unwrap_or_default(),
                logs: logs.remove(&medication.id).unwrap_or_default(),
                medication,
            })
            .collect()
    }
}

/// A log as returned by the log endpoints, with its parent medication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogWithMedication {
    #[serde(flatten)]
    pub log: MedicationLog,
    pub medication: Option<Medication>,
}

impl LogWithMedication {
    pub fn assemble(logs: Vec<MedicationLog>, medications: Vec<Medication>) -> Vec<Self> {
        let medications: HashMap<Uuid, Medication> = medications.into_iter().map(|m| (m.id, m)).collect();
        logs.into_iter()
            .map(|log| Self {
                medication: medications.get(&log.medication_id).cloned(),
                log,
            })
            .collect()
    }
}

fn group_by<T>(rows: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut groups: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        groups.entry(key(&row)).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogInput, MedicationInput, PatternInput};
    use crate::validation::InputMode;
    use serde_json::{json, Value};

    fn medication(owner: Uuid, name: &str) -> Medication {
        let input = MedicationInput::from_body(json!({ "name": name }).as_object().unwrap(), InputMode::Create).unwrap();
        Medication::create(owner, input).unwrap()
    }

    fn pattern(medication: &Medication) -> MedicationPattern {
        let body = json!({ "schedule_type": "as_needed", "start_date": "2024-01-01" });
        let input = PatternInput::from_body(body.as_object().unwrap(), InputMode::Create).unwrap();
        MedicationPattern::create(medication.user_id, medication.id, input).unwrap()
    }

    fn log(medication: &Medication, scheduled_at: &str) -> MedicationLog {
        let body = json!({ "medication_id": medication.id, "scheduled_at": scheduled_at, "status": "taken" });
        let input = LogInput::from_body(body.as_object().unwrap(), InputMode::Create).unwrap();
        MedicationLog::create(medication.user_id, input).unwrap()
    }

    #[test]
    fn children_land_under_their_medication() {
        let owner = Uuid::new_v4();
        let a = medication(owner, "A");
        let b = medication(owner, "B");
        let patterns = vec![pattern(&a), pattern(&b), pattern(&a)];
        let logs = vec![log(&b, "2024-03-01T08:00:00Z"), log(&b, "2024-03-02T08:00:00Z")];

        let embedded = MedicationWithRelations::assemble(vec![a.clone(), b.clone()], patterns.clone(), logs.clone());
        assert_eq!(embedded[0].medication.id, a.id);
        assert_eq!(embedded[0].patterns, vec![patterns[0].clone(), patterns[2].clone()]);
        assert!(embedded[0].logs.is_empty());
        assert_eq!(embedded[1].patterns, vec![patterns[1].clone()]);
        assert_eq!(embedded[1].logs, logs);
    }

    #[test]
    fn relations_serialize_beside_the_medication_fields() {
        let owner = Uuid::new_v4();
        let a = medication(owner, "A");
        let embedded = MedicationWithRelations::assemble(vec![a], Vec::new(), Vec::new());
        let out = serde_json::to_value(&embedded[0]).unwrap();
        assert_eq!(out["name"], "A");
        assert_eq!(out["patterns"], json!([]));
        assert_eq!(out["logs"], json!([]));

        let m = medication(owner, "Ibuprofen");
        let joined = LogWithMedication::assemble(vec![log(&m, "2024-03-01T08:00:00Z")], vec![m.clone()]);
        let out = serde_json::to_value(&joined[0]).unwrap();
        assert_eq!(out["status"], "taken");
        assert_eq!(out["medication"]["name"], "Ibuprofen");
        assert_eq!(out["medication"].get("patterns"), None::<&Value>);
    }
}
