use async_trait::async_trait;
use sqlx::types::Json;

use super::records::SideEffectTypeRecord;
use super::{query_builder, PgStore};
use crate::filter::CatalogCriteria;
use crate::models::SideEffectType;
use crate::store::{scope, SideEffectCatalog, StoreResult};

#[async_trait]
impl SideEffectCatalog for PgStore {
    async fn list_side_effect_types(&self, criteria: &CatalogCriteria) -> StoreResult<Vec<SideEffectType>> {
        let filter = scope::catalog(criteria)?;
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<SideEffectTypeRecord> = query_builder::select_all(&mut conn, &filter).await?;
        rows.into_iter().map(SideEffectTypeRecord::to_domain).collect()
    }

    async fn seed_side_effect_types(&self, entries: Vec<SideEffectType>) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for e in &entries {
            let result = sqlx::query(
                r#"
                INSERT INTO side_effect_types (
                    id, name, category, description, severity_level, is_common,
                    requires_medical_attention, symptoms, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(e.id)
            .bind(&e.name)
            .bind(&e.category)
            .bind(&e.description)
            .bind(e.severity_level.map(|s| s.as_str()))
            .bind(e.is_common)
            .bind(e.requires_medical_attention)
            .bind(Json(&e.symptoms))
            .bind(e.created_at)
            .bind(e.updated_at)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(added)
    }
}
