use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

use super::records::PatternRecord;
use super::{lock_medication, query_builder, PgStore};
use crate::filter::{Page, PageRequest, PatternCriteria};
use crate::models::{MedicationPattern, PatternInput};
use crate::store::{scope, PatternStore, StoreError, StoreResult, MEDICATION, PATTERN};

const UPSERT: &str = r#"
INSERT INTO medication_patterns (
    id, user_id, medication_id, pattern_name, schedule_type, times_per_day,
    dosage_amount, dosage_unit, specific_times, days_of_week, interval_hours,
    cycle_days_on, cycle_days_off, total_cycles, start_date, end_date,
    is_active, notes, created_at, updated_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
)
ON CONFLICT (id) DO UPDATE SET
    pattern_name = EXCLUDED.pattern_name,
    schedule_type = EXCLUDED.schedule_type,
    times_per_day = EXCLUDED.times_per_day,
    dosage_amount = EXCLUDED.dosage_amount,
    dosage_unit = EXCLUDED.dosage_unit,
    specific_times = EXCLUDED.specific_times,
    days_of_week = EXCLUDED.days_of_week,
    interval_hours = EXCLUDED.interval_hours,
    cycle_days_on = EXCLUDED.cycle_days_on,
    cycle_days_off = EXCLUDED.cycle_days_off,
    total_cycles = EXCLUDED.total_cycles,
    start_date = EXCLUDED.start_date,
    end_date = EXCLUDED.end_date,
    is_active = EXCLUDED.is_active,
    notes = EXCLUDED.notes,
    updated_at = EXCLUDED.updated_at
WHERE medication_patterns.user_id = EXCLUDED.user_id
"#;

async fn save(conn: &mut PgConnection, p: &MedicationPattern) -> StoreResult<()> {
    sqlx::query(UPSERT)
        .bind(p.id)
        .bind(p.user_id)
        .bind(p.medication_id)
        .bind(&p.pattern_name)
        .bind(p.schedule_type.as_str())
        .bind(p.times_per_day)
        .bind(p.dosage_amount)
        .bind(&p.dosage_unit)
        .bind(Json(&p.specific_times))
        .bind(Json(&p.days_of_week))
        .bind(p.interval_hours)
        .bind(p.cycle_days_on)
        .bind(p.cycle_days_off)
        .bind(p.total_cycles)
        .bind(p.start_date)
        .bind(p.end_date)
        .bind(p.is_active)
        .bind(&p.notes)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

async fn require_medication(conn: &mut PgConnection, owner: Uuid, medication_id: Uuid) -> StoreResult<()> {
    if lock_medication(conn, owner, medication_id).await? {
        Ok(())
    } else {
        Err(StoreError::NotFound(MEDICATION))
    }
}

#[async_trait]
impl PatternStore for PgStore {
    async fn list_patterns(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        criteria: &PatternCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<MedicationPattern>> {
        let mut filter = scope::patterns(owner, medication_id, criteria)?;
        let mut tx = self.pool.begin().await?;
        require_medication(&mut tx, owner, medication_id).await?;
        let total = query_builder::count(&mut tx, &filter).await?;
        let rows: Vec<PatternRecord> = query_builder::select_all(&mut tx, filter.page(page)).await?;
        tx.commit().await?;

        let items = rows
            .into_iter()
            .map(PatternRecord::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn create_pattern(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        input: PatternInput,
    ) -> StoreResult<MedicationPattern> {
        let mut tx = self.pool.begin().await?;
        require_medication(&mut tx, owner, medication_id).await?;
        let pattern = MedicationPattern::create(owner, medication_id, input)?;
        save(&mut tx, &pattern).await?;
        tx.commit().await?;
        Ok(pattern)
    }

    async fn get_pattern(&self, owner: Uuid, medication_id: Uuid, id: Uuid) -> StoreResult<MedicationPattern> {
        let mut tx = self.pool.begin().await?;
        require_medication(&mut tx, owner, medication_id).await?;
        let row: Option<PatternRecord> = sqlx::query_as(
            "SELECT * FROM medication_patterns WHERE id = $1 AND user_id = $2 AND medication_id = $3",
        )
        .bind(id)
        .bind(owner)
        .bind(medication_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        row.ok_or(StoreError::NotFound(PATTERN))?.to_domain()
    }

    async fn update_pattern(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        id: Uuid,
        input: PatternInput,
    ) -> StoreResult<MedicationPattern> {
        let mut tx = self.pool.begin().await?;
        require_medication(&mut tx, owner, medication_id).await?;
        let row: Option<PatternRecord> = sqlx::query_as(
            "SELECT * FROM medication_patterns WHERE id = $1 AND user_id = $2 AND medication_id = $3 FOR UPDATE",
        )
        .bind(id)
        .bind(owner)
        .bind(medication_id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut pattern = row.ok_or(StoreError::NotFound(PATTERN))?.to_domain()?;

        pattern.apply(input)?;
        save(&mut tx, &pattern).await?;
        tx.commit().await?;
        Ok(pattern)
    }

    async fn delete_pattern(&self, owner: Uuid, medication_id: Uuid, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        require_medication(&mut tx, owner, medication_id).await?;
        // Referencing logs keep their row; the FK is ON DELETE SET NULL.
        let result =
            sqlx::query("DELETE FROM medication_patterns WHERE id = $1 AND user_id = $2 AND medication_id = $3")
                .bind(id)
                .bind(owner)
                .bind(medication_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(PATTERN));
        }
        tx.commit().await?;
        Ok(())
    }
}
