use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

use super::records::{LogRecord, MedicationRecord, PatternRecord};
use super::{query_builder, PgStore};
use crate::filter::{LogCriteria, Page, PageRequest};
use crate::models::{LogInput, MedicationLog};
use crate::store::{log_reference_errors, scope, LogStore, StoreError, StoreResult, LOG};

const UPSERT: &str = r#"
INSERT INTO medication_logs (
    id, user_id, medication_id, medication_pattern_id, scheduled_at, taken_at,
    dosage_amount, dosage_unit, status, side_effects, effectiveness_rating,
    severity_level, notes, created_at, updated_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
)
ON CONFLICT (id) DO UPDATE SET
    medication_id = EXCLUDED.medication_id,
    medication_pattern_id = EXCLUDED.medication_pattern_id,
    scheduled_at = EXCLUDED.scheduled_at,
    taken_at = EXCLUDED.taken_at,
    dosage_amount = EXCLUDED.dosage_amount,
    dosage_unit = EXCLUDED.dosage_unit,
    status = EXCLUDED.status,
    side_effects = EXCLUDED.side_effects,
    effectiveness_rating = EXCLUDED.effectiveness_rating,
    severity_level = EXCLUDED.severity_level,
    notes = EXCLUDED.notes,
    updated_at = EXCLUDED.updated_at
WHERE medication_logs.user_id = EXCLUDED.user_id
"#;

async fn save(conn: &mut PgConnection, l: &MedicationLog) -> StoreResult<()> {
    sqlx::query(UPSERT)
        .bind(l.id)
        .bind(l.user_id)
        .bind(l.medication_id)
        .bind(l.medication_pattern_id)
        .bind(l.scheduled_at)
        .bind(l.taken_at)
        .bind(l.dosage_amount)
        .bind(&l.dosage_unit)
        .bind(l.status.as_str())
        .bind(Json(&l.side_effects))
        .bind(l.effectiveness_rating)
        .bind(l.severity_level.map(|s| s.as_str()))
        .bind(&l.notes)
        .bind(l.created_at)
        .bind(l.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Locks the referenced medication and pattern (when owned) and validates
/// that they fit the log.
async fn check_references(conn: &mut PgConnection, owner: Uuid, log: &MedicationLog) -> StoreResult<()> {
    let medication: Option<MedicationRecord> =
        sqlx::query_as("SELECT * FROM medications WHERE id = $1 AND user_id = $2 FOR SHARE")
            .bind(log.medication_id)
            .bind(owner)
            .fetch_optional(&mut *conn)
            .await?;
    let medication = medication.map(MedicationRecord::to_domain);

    let pattern = match log.medication_pattern_id {
        Some(pattern_id) => {
            let row: Option<PatternRecord> =
                sqlx::query_as("SELECT * FROM medication_patterns WHERE id = $1 AND user_id = $2 FOR SHARE")
                    .bind(pattern_id)
                    .bind(owner)
                    .fetch_optional(&mut *conn)
                    .await?;
            Some(row.map(PatternRecord::to_domain).transpose()?)
        }
        None => None,
    };

    log_reference_errors(medication.as_ref(), pattern.as_ref().map(Option::as_ref), log)?;
    Ok(())
}

#[async_trait]
impl LogStore for PgStore {
    async fn list_logs(
        &self,
        owner: Uuid,
        criteria: &LogCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<MedicationLog>> {
        let mut filter = scope::logs(owner, criteria)?;
        let mut tx = self.pool.begin().await?;
        let total = query_builder::count(&mut tx, &filter).await?;
        let rows: Vec<LogRecord> = query_builder::select_all(&mut tx, filter.page(page)).await?;
        tx.commit().await?;

        let items = rows
            .into_iter()
            .map(LogRecord::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn create_log(&self, owner: Uuid, input: LogInput) -> StoreResult<MedicationLog> {
        let log = MedicationLog::create(owner, input)?;
        let mut tx = self.pool.begin().await?;
        check_references(&mut tx, owner, &log).await?;
        save(&mut tx, &log).await?;
        tx.commit().await?;
        Ok(log)
    }

    async fn get_log(&self, owner: Uuid, id: Uuid) -> StoreResult<MedicationLog> {
        let row: Option<LogRecord> = sqlx::query_as("SELECT * FROM medication_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::NotFound(LOG))?.to_domain()
    }

    async fn update_log(&self, owner: Uuid, id: Uuid, input: LogInput) -> StoreResult<MedicationLog> {
        let mut tx = self.pool.begin().await?;
        let row: Option<LogRecord> =
            sqlx::query_as("SELECT * FROM medication_logs WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;
        let mut log = row.ok_or(StoreError::NotFound(LOG))?.to_domain()?;

        log.apply(input);
        check_references(&mut tx, owner, &log).await?;
        save(&mut tx, &log).await?;
        tx.commit().await?;
        Ok(log)
    }

    async fn delete_log(&self, owner: Uuid, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM medication_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(LOG));
        }
        Ok(())
    }
}
