use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

use super::records::{LogRecord, MedicationRecord, PatternRecord};
use super::{query_builder, PgStore};
use crate::filter::{MedicationCriteria, Page, PageRequest};
use crate::models::{Medication, MedicationInput, MedicationLog, MedicationPattern};
use crate::store::{scope, MedicationStore, StoreError, StoreResult, MEDICATION};

const UPSERT: &str = r#"
INSERT INTO medications (
    id, user_id, name, description, image_path, generic_name, dosage_form, strength,
    manufacturer, prescription_number, prescribing_doctor, pharmacy, ndc_number,
    indications, contraindications, side_effects, drug_interactions,
    storage_instructions, notes, schedule, is_active, created_at, updated_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
)
ON CONFLICT (id) DO UPDATE SET
    name = EXCLUDED.name,
    description = EXCLUDED.description,
    image_path = EXCLUDED.image_path,
    generic_name = EXCLUDED.generic_name,
    dosage_form = EXCLUDED.dosage_form,
    strength = EXCLUDED.strength,
    manufacturer = EXCLUDED.manufacturer,
    prescription_number = EXCLUDED.prescription_number,
    prescribing_doctor = EXCLUDED.prescribing_doctor,
    pharmacy = EXCLUDED.pharmacy,
    ndc_number = EXCLUDED.ndc_number,
    indications = EXCLUDED.indications,
    contraindications = EXCLUDED.contraindications,
    side_effects = EXCLUDED.side_effects,
    drug_interactions = EXCLUDED.drug_interactions,
    storage_instructions = EXCLUDED.storage_instructions,
    notes = EXCLUDED.notes,
    schedule = EXCLUDED.schedule,
    is_active = EXCLUDED.is_active,
    updated_at = EXCLUDED.updated_at
WHERE medications.user_id = EXCLUDED.user_id
"#;

async fn save(conn: &mut PgConnection, m: &Medication) -> StoreResult<()> {
    sqlx::query(UPSERT)
        .bind(m.id)
        .bind(m.user_id)
        .bind(&m.name)
        .bind(&m.description)
        .bind(&m.image_path)
        .bind(&m.generic_name)
        .bind(&m.dosage_form)
        .bind(&m.strength)
        .bind(&m.manufacturer)
        .bind(&m.prescription_number)
        .bind(&m.prescribing_doctor)
        .bind(&m.pharmacy)
        .bind(&m.ndc_number)
        .bind(Json(&m.indications))
        .bind(Json(&m.contraindications))
        .bind(Json(&m.side_effects))
        .bind(Json(&m.drug_interactions))
        .bind(&m.storage_instructions)
        .bind(&m.notes)
        .bind(m.schedule.as_ref().map(Json))
        .bind(m.is_active)
        .bind(m.created_at)
        .bind(m.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl MedicationStore for PgStore {
    async fn list_medications(
        &self,
        owner: Uuid,
        criteria: &MedicationCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<Medication>> {
        let mut filter = scope::medications(owner, criteria)?;
        let mut tx = self.pool.begin().await?;
        let total = query_builder::count(&mut tx, &filter).await?;
        let rows: Vec<MedicationRecord> = query_builder::select_all(&mut tx, filter.page(page)).await?;
        tx.commit().await?;

        let items = rows.into_iter().map(MedicationRecord::to_domain).collect();
        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn create_medication(&self, owner: Uuid, input: MedicationInput) -> StoreResult<Medication> {
        let medication = Medication::create(owner, input)?;
        let mut conn = self.pool.acquire().await?;
        save(&mut conn, &medication).await?;
        Ok(medication)
    }

    async fn get_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<Medication> {
        let row: Option<MedicationRecord> = sqlx::query_as("SELECT * FROM medications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MedicationRecord::to_domain).ok_or(StoreError::NotFound(MEDICATION))
    }

    async fn update_medication(&self, owner: Uuid, id: Uuid, input: MedicationInput) -> StoreResult<Medication> {
        let mut tx = self.pool.begin().await?;
        let row: Option<MedicationRecord> =
            sqlx::query_as("SELECT * FROM medications WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;
        let mut medication = row.map(MedicationRecord::to_domain).ok_or(StoreError::NotFound(MEDICATION))?;

        medication.apply(input);
        save(&mut tx, &medication).await?;
        tx.commit().await?;
        Ok(medication)
    }

    async fn delete_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<()> {
        // Patterns and logs go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM medications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(MEDICATION));
        }
        Ok(())
    }

    async fn medications_by_id(&self, owner: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Medication>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<MedicationRecord> =
            sqlx::query_as("SELECT * FROM medications WHERE user_id = $1 AND id = ANY($2)")
                .bind(owner)
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(MedicationRecord::to_domain).collect())
    }

    async fn medication_children(
        &self,
        owner: Uuid,
        ids: &[Uuid],
    ) -> StoreResult<(Vec<MedicationPattern>, Vec<MedicationLog>)> {
        if ids.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let patterns: Vec<PatternRecord> = sqlx::query_as(
            "SELECT * FROM medication_patterns WHERE user_id = $1 AND medication_id = ANY($2) \
             ORDER BY created_at, id",
        )
        .bind(owner)
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        let logs: Vec<LogRecord> = sqlx::query_as(
            "SELECT * FROM medication_logs WHERE user_id = $1 AND medication_id = ANY($2) \
             ORDER BY scheduled_at, created_at",
        )
        .bind(owner)
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let patterns = patterns
            .into_iter()
            .map(PatternRecord::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let logs = logs.into_iter().map(LogRecord::to_domain).collect::<Result<Vec<_>, _>>()?;
        Ok((patterns, logs))
    }
}
