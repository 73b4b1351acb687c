//! Embeds related rows into medication and log responses with one extra
//! store round trip per response, whatever the page size.

use uuid::Uuid;

use super::{MedicationStore, StoreError, StoreResult, LOG, MEDICATION};
use crate::filter::Page;
use crate::models::{LogWithMedication, Medication, MedicationLog, MedicationWithRelations};

pub async fn medications<S>(store: &S, owner: Uuid, medications: Vec<Medication>) -> StoreResult<Vec<MedicationWithRelations>>
where
    S: MedicationStore + ?Sized,
{
    let ids: Vec<Uuid> = medications.iter().map(|m| m.id).collect();
    let (patterns, logs) = store.medication_children(owner, &ids).await?;
    Ok(MedicationWithRelations::assemble(medications, patterns, logs))
}

pub async fn medication<S>(store: &S, owner: Uuid, medication: Medication) -> StoreResult<MedicationWithRelations>
where
    S: MedicationStore + ?Sized,
{
    medications(store, owner, vec![medication])
        .await?
        .pop()
        .ok_or(StoreError::NotFound(MEDICATION))
}

pub async fn medication_page<S>(store: &S, owner: Uuid, page: Page<Medication>) -> StoreResult<Page<MedicationWithRelations>>
where
    S: MedicationStore + ?Sized,
{
    let Page { items, meta } = page;
    Ok(Page {
        items: medications(store, owner, items).await?,
        meta,
    })
}

pub async fn logs<S>(store: &S, owner: Uuid, logs: Vec<MedicationLog>) -> StoreResult<Vec<LogWithMedication>>
where
    S: MedicationStore + ?Sized,
{
    let mut ids: Vec<Uuid> = logs.iter().map(|l| l.medication_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let medications = store.medications_by_id(owner, &ids).await?;
    Ok(LogWithMedication::assemble(logs, medications))
}

pub async fn log<S>(store: &S, owner: Uuid, log: MedicationLog) -> StoreResult<LogWithMedication>
where
    S: MedicationStore + ?Sized,
{
    logs(store, owner, vec![log]).await?.pop().ok_or(StoreError::NotFound(LOG))
}

pub async fn log_page<S>(store: &S, owner: Uuid, page: Page<MedicationLog>) -> StoreResult<Page<LogWithMedication>>
where
    S: MedicationStore + ?Sized,
{
    let Page { items, meta } = page;
    Ok(Page {
        items: logs(store, owner, items).await?,
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{LogCriteria, PageRequest};
    use crate::models::{LogInput, MedicationInput, PatternInput};
    use crate::store::{LogStore, MemoryStore, PatternStore};
    use crate::validation::InputMode;
    use serde_json::{json, Value};

    fn object(v: Value) -> serde_json::Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn embeds_only_the_owners_children() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let med = store
            .create_medication(owner, MedicationInput::from_body(&object(json!({ "name": "A" })), InputMode::Create).unwrap())
            .await
            .unwrap();
        let pattern_body = object(json!({ "schedule_type": "as_needed", "start_date": "2024-01-01" }));
        store
            .create_pattern(owner, med.id, PatternInput::from_body(&pattern_body, InputMode::Create).unwrap())
            .await
            .unwrap();
        for at in ["2024-03-02T08:00:00Z", "2024-03-01T08:00:00Z"] {
            let body = object(json!({ "medication_id": med.id, "scheduled_at": at, "status": "taken" }));
            store
                .create_log(owner, LogInput::from_body(&body, InputMode::Create).unwrap())
                .await
                .unwrap();
        }

        let embedded = medication(&store, owner, med.clone()).await.unwrap();
        assert_eq!(embedded.patterns.len(), 1);
        let times: Vec<String> = embedded.logs.iter().map(|l| l.scheduled_at.to_rfc3339()).collect();
        assert_eq!(times, vec!["2024-03-01T08:00:00+00:00", "2024-03-02T08:00:00+00:00"]);

        let stranger = medication(&store, Uuid::new_v4(), med).await.unwrap();
        assert!(stranger.patterns.is_empty());
        assert!(stranger.logs.is_empty());

        let page = store
            .list_logs(owner, &LogCriteria::default(), PageRequest { page: 1, per_page: 15 })
            .await
            .unwrap();
        let joined = log_page(&store, owner, page).await.unwrap();
        assert_eq!(joined.meta.total, 2);
        assert!(joined.items.iter().all(|l| l.medication.as_ref().map(|m| m.name.as_str()) == Some("A")));
    }
}
