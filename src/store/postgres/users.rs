use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::records::{SessionRecord, UserRecord};
use super::PgStore;
use crate::models::{Session, User};
use crate::store::{SessionStore, StoreError, StoreResult, UserStore, SESSION, USER};

#[async_trait]
impl UserStore for PgStore {
    async fn find_or_create_user(&self, email: &str, name: &str, external_id: Option<&str>) -> StoreResult<User> {
        let candidate = User::new(email, name, external_id);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, external_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.email)
        .bind(&candidate.name)
        .bind(&candidate.external_id)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&mut *tx)
        .await?;

        let row: UserRecord = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.to_domain())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        let row: Option<UserRecord> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRecord::to_domain).ok_or(StoreError::NotFound(USER))
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, revoked_at, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Session> {
        let row: Option<SessionRecord> = sqlx::query_as("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SessionRecord::to_domain).ok_or(StoreError::NotFound(SESSION))
    }

    async fn revoke_session(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE sessions SET revoked_at = COALESCE(revoked_at, $2) WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(SESSION));
        }
        Ok(())
    }
}
