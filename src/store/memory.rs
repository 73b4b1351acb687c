use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    log_reference_errors, scope, LogStore, MedicationStore, PatternStore, SessionStore, SideEffectCatalog, Store,
    StoreError, StoreResult, UserStore, LOG, MEDICATION, PATTERN, SESSION, USER,
};
use crate::filter::{
    CatalogCriteria, Filter, FilterRecord, LogCriteria, MedicationCriteria, Page, PageRequest, PatternCriteria,
};
use crate::models::{
    default_catalog, LogInput, Medication, MedicationInput, MedicationLog, MedicationPattern, PatternInput, Session,
    SideEffectType, User,
};

/// Rows in insertion order.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    medications: Vec<Medication>,
    patterns: Vec<MedicationPattern>,
    logs: Vec<MedicationLog>,
    side_effect_types: Vec<SideEffectType>,
}

impl Tables {
    fn medication(&self, owner: Uuid, id: Uuid) -> Option<&Medication> {
        self.medications.iter().find(|m| m.id == id && m.user_id == owner)
    }

    fn require_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<&Medication> {
        self.medication(owner, id).ok_or(StoreError::NotFound(MEDICATION))
    }

    fn pattern(&self, owner: Uuid, id: Uuid) -> Option<&MedicationPattern> {
        self.patterns.iter().find(|p| p.id == id && p.user_id == owner)
    }

    fn check_log_references(&self, owner: Uuid, log: &MedicationLog) -> StoreResult<()> {
        let medication = self.medication(owner, log.medication_id);
        let pattern = log.medication_pattern_id.map(|id| self.pattern(owner, id));
        log_reference_errors(medication, pattern, log)?;
        Ok(())
    }
}

/// Store kept entirely in process memory behind one async lock. Starts with
/// the default side-effect catalog.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                side_effect_types: default_catalog(),
                ..Default::default()
            }),
        }
    }

    pub fn empty() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

/// Newest-inserted first before the stable sort, so ties in the sort keys
/// come out most recent first just like the SQL tie-breakers.
fn select<T: FilterRecord + Clone>(rows: &[T], filter: &Filter) -> (Vec<T>, u64) {
    let mut hits: Vec<T> = rows.iter().rev().filter(|r| filter.matches(*r)).cloned().collect();
    filter.sort(&mut hits);
    let total = hits.len() as u64;
    (hits, total)
}

fn select_page<T: FilterRecord + Clone>(rows: &[T], mut filter: Filter, page: PageRequest) -> Page<T> {
    let (hits, total) = select(rows, &filter);
    let items = filter.page(page).window(hits);
    Page::new(items, page, total)
}

#[async_trait]
impl MedicationStore for MemoryStore {
    async fn list_medications(
        &self,
        owner: Uuid,
        criteria: &MedicationCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<Medication>> {
        let filter = scope::medications(owner, criteria)?;
        let tables = self.tables.read().await;
        Ok(select_page(&tables.medications, filter, page))
    }

    async fn create_medication(&self, owner: Uuid, input: MedicationInput) -> StoreResult<Medication> {
        let medication = Medication::create(owner, input)?;
        self.tables.write().await.medications.push(medication.clone());
        Ok(medication)
    }

    async fn get_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<Medication> {
        let tables = self.tables.read().await;
        tables.require_medication(owner, id).cloned()
    }

    async fn update_medication(&self, owner: Uuid, id: Uuid, input: MedicationInput) -> StoreResult<Medication> {
        let mut tables = self.tables.write().await;
        let medication = tables
            .medications
            .iter_mut()
            .find(|m| m.id == id && m.user_id == owner)
            .ok_or(StoreError::NotFound(MEDICATION))?;
        medication.apply(input);
        Ok(medication.clone())
    }

    async fn delete_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_medication(owner, id)?;
        tables.medications.retain(|m| m.id != id);
        tables.patterns.retain(|p| p.medication_id != id);
        tables.logs.retain(|l| l.medication_id != id);
        Ok(())
    }

    async fn medications_by_id(&self, owner: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Medication>> {
        let tables = self.tables.read().await;
        Ok(tables
            .medications
            .iter()
            .filter(|m| m.user_id == owner && ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn medication_children(
        &self,
        owner: Uuid,
        ids: &[Uuid],
    ) -> StoreResult<(Vec<MedicationPattern>, Vec<MedicationLog>)> {
        let tables = self.tables.read().await;
        let patterns = tables
            .patterns
            .iter()
            .filter(|p| p.user_id == owner && ids.contains(&p.medication_id))
            .cloned()
            .collect();
        let mut logs: Vec<MedicationLog> = tables
            .logs
            .iter()
            .filter(|l| l.user_id == owner && ids.contains(&l.medication_id))
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.scheduled_at);
        Ok((patterns, logs))
    }
}

#[async_trait]
impl PatternStore for MemoryStore {
    async fn list_patterns(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        criteria: &PatternCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<MedicationPattern>> {
        let filter = scope::patterns(owner, medication_id, criteria)?;
        let tables = self.tables.read().await;
        tables.require_medication(owner, medication_id)?;
        Ok(select_page(&tables.patterns, filter, page))
    }

    async fn create_pattern(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        input: PatternInput,
    ) -> StoreResult<MedicationPattern> {
        let mut tables = self.tables.write().await;
        tables.require_medication(owner, medication_id)?;
        let pattern = MedicationPattern::create(owner, medication_id, input)?;
        tables.patterns.push(pattern.clone());
        Ok(pattern)
    }

    async fn get_pattern(&self, owner: Uuid, medication_id: Uuid, id: Uuid) -> StoreResult<MedicationPattern> {
        let tables = self.tables.read().await;
        tables.require_medication(owner, medication_id)?;
        tables
            .pattern(owner, id)
            .filter(|p| p.medication_id == medication_id)
            .cloned()
            .ok_or(StoreError::NotFound(PATTERN))
    }

    async fn update_pattern(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        id: Uuid,
        input: PatternInput,
    ) -> StoreResult<MedicationPattern> {
        let mut tables = self.tables.write().await;
        tables.require_medication(owner, medication_id)?;
        let pattern = tables
            .patterns
            .iter_mut()
            .find(|p| p.id == id && p.user_id == owner && p.medication_id == medication_id)
            .ok_or(StoreError::NotFound(PATTERN))?;
        pattern.apply(input)?;
        Ok(pattern.clone())
    }

    async fn delete_pattern(&self, owner: Uuid, medication_id: Uuid, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_medication(owner, medication_id)?;
        let before = tables.patterns.len();
        tables
            .patterns
            .retain(|p| !(p.id == id && p.user_id == owner && p.medication_id == medication_id));
        if tables.patterns.len() == before {
            return Err(StoreError::NotFound(PATTERN));
        }
        for log in tables.logs.iter_mut().filter(|l| l.medication_pattern_id == Some(id)) {
            log.medication_pattern_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn list_logs(
        &self,
        owner: Uuid,
        criteria: &LogCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<MedicationLog>> {
        let filter = scope::logs(owner, criteria)?;
        let tables = self.tables.read().await;
        Ok(select_page(&tables.logs, filter, page))
    }

    async fn create_log(&self, owner: Uuid, input: LogInput) -> StoreResult<MedicationLog> {
        let log = MedicationLog::create(owner, input)?;
        let mut tables = self.tables.write().await;
        tables.check_log_references(owner, &log)?;
        tables.logs.push(log.clone());
        Ok(log)
    }

    async fn get_log(&self, owner: Uuid, id: Uuid) -> StoreResult<MedicationLog> {
        let tables = self.tables.read().await;
        tables
            .logs
            .iter()
            .find(|l| l.id == id && l.user_id == owner)
            .cloned()
            .ok_or(StoreError::NotFound(LOG))
    }

    async fn update_log(&self, owner: Uuid, id: Uuid, input: LogInput) -> StoreResult<MedicationLog> {
        let mut tables = self.tables.write().await;
        let index = tables
            .logs
            .iter()
            .position(|l| l.id == id && l.user_id == owner)
            .ok_or(StoreError::NotFound(LOG))?;
        let mut merged = tables.logs[index].clone();
        merged.apply(input);
        tables.check_log_references(owner, &merged)?;
        tables.logs[index] = merged.clone();
        Ok(merged)
    }

    async fn delete_log(&self, owner: Uuid, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.logs.len();
        tables.logs.retain(|l| !(l.id == id && l.user_id == owner));
        if tables.logs.len() == before {
            return Err(StoreError::NotFound(LOG));
        }
        Ok(())
    }
}

#[async_trait]
impl SideEffectCatalog for MemoryStore {
    async fn list_side_effect_types(&self, criteria: &CatalogCriteria) -> StoreResult<Vec<SideEffectType>> {
        let filter = scope::catalog(criteria)?;
        let tables = self.tables.read().await;
        // Catalog order is fully determined by the sort keys.
        let mut hits: Vec<SideEffectType> = tables
            .side_effect_types
            .iter()
            .filter(|e| filter.matches(*e))
            .cloned()
            .collect();
        filter.sort(&mut hits);
        Ok(hits)
    }

    async fn seed_side_effect_types(&self, entries: Vec<SideEffectType>) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        let mut added = 0;
        for entry in entries {
            if tables.side_effect_types.iter().all(|e| e.name != entry.name) {
                tables.side_effect_types.push(entry);
                added += 1;
            }
        }
        Ok(added)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_or_create_user(&self, email: &str, name: &str, external_id: Option<&str>) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = User::new(email, name, external_id);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(USER))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        self.tables.write().await.sessions.push(session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Session> {
        let tables = self.tables.read().await;
        tables
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(SESSION))
    }

    async fn revoke_session(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound(SESSION))?;
        session.revoked_at.get_or_insert_with(Utc::now);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::InputMode;
    use serde_json::{json, Value};

    fn medication_input(v: Value) -> MedicationInput {
        MedicationInput::from_body(v.as_object().unwrap(), InputMode::Create).unwrap()
    }

    fn page() -> PageRequest {
        PageRequest { page: 1, per_page: 15 }
    }

    #[tokio::test]
    async fn list_is_owner_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create_medication(alice, medication_input(json!({ "name": "First" }))).await.unwrap();
        store.create_medication(alice, medication_input(json!({ "name": "Second" }))).await.unwrap();
        store.create_medication(bob, medication_input(json!({ "name": "Bob's" }))).await.unwrap();

        let listed = store
            .list_medications(alice, &MedicationCriteria::default(), page())
            .await
            .unwrap();
        let names: Vec<&str> = listed.items.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
        assert_eq!(listed.meta.total, 2);
    }

    #[tokio::test]
    async fn foreign_rows_are_not_found() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let med = store.create_medication(alice, medication_input(json!({ "name": "Mine" }))).await.unwrap();

        let intruder = Uuid::new_v4();
        assert!(matches!(
            store.get_medication(intruder, med.id).await,
            Err(StoreError::NotFound(MEDICATION))
        ));
        assert!(matches!(
            store.delete_medication(intruder, med.id).await,
            Err(StoreError::NotFound(MEDICATION))
        ));
        assert!(store.get_medication(alice, med.id).await.is_ok());
    }

    #[tokio::test]
    async fn paging_windows_results() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for i in 0..5 {
            store
                .create_medication(owner, medication_input(json!({ "name": format!("Med {}", i) })))
                .await
                .unwrap();
        }
        let second = store
            .list_medications(owner, &MedicationCriteria::default(), PageRequest { page: 2, per_page: 2 })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.meta.last_page, 3);
        assert_eq!(second.meta.current_page, 2);
    }

    #[tokio::test]
    async fn seeding_skips_existing_names() {
        let store = MemoryStore::new();
        assert_eq!(store.seed_side_effect_types(default_catalog()).await.unwrap(), 0);

        let empty = MemoryStore::empty();
        assert_eq!(empty.seed_side_effect_types(default_catalog()).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn catalog_sorts_bytewise() {
        let store = MemoryStore::empty();
        let entries = ["apple", "頭痛", "Zinc", "Éclair"]
            .iter()
            .map(|name| SideEffectType::new(name, "mixed", ""))
            .collect();
        store.seed_side_effect_types(entries).await.unwrap();

        let criteria = CatalogCriteria { category: Some("mixed".to_string()) };
        let listed = store.list_side_effect_types(&criteria).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Zinc", "apple", "Éclair", "頭痛"]);
    }

    #[tokio::test]
    async fn revoked_sessions_stay_revoked() {
        let store = MemoryStore::new();
        let session = store
            .create_session(Session::new(Uuid::new_v4(), Utc::now() + chrono::Duration::hours(1)))
            .await
            .unwrap();
        store.revoke_session(session.id).await.unwrap();
        let stored = store.get_session(session.id).await.unwrap();
        assert!(!stored.is_live(Utc::now()));
    }
}
