//! Persistence contract shared by the Postgres backend and the in-memory
//! backend used in tests and `serve --in-memory`.
//!
//! Every user-owned operation takes the owner id; a row owned by someone
//! else is reported exactly like a missing row.

pub mod memory;
pub mod postgres;
pub mod relations;
pub mod scope;

use async_trait::async_trait;
use uuid::Uuid;

use crate::filter::{CatalogCriteria, FilterError, LogCriteria, MedicationCriteria, Page, PageRequest, PatternCriteria};
use crate::models::{
    LogInput, Medication, MedicationInput, MedicationLog, MedicationPattern, PatternInput, Session, SideEffectType,
    User,
};
use crate::validation::ValidationErrors;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Corrupt row in {table}: {message}")]
    Decode { table: &'static str, message: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::Invalid(errors)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return StoreError::Unavailable(err.to_string());
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const MEDICATION: &str = "Medication";
pub const PATTERN: &str = "Pattern";
pub const LOG: &str = "Log";
pub const USER: &str = "User";
pub const SESSION: &str = "Session";

#[async_trait]
pub trait MedicationStore: Send + Sync {
    async fn list_medications(
        &self,
        owner: Uuid,
        criteria: &MedicationCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<Medication>>;

    async fn create_medication(&self, owner: Uuid, input: MedicationInput) -> StoreResult<Medication>;

    async fn get_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<Medication>;

    async fn update_medication(&self, owner: Uuid, id: Uuid, input: MedicationInput) -> StoreResult<Medication>;

    /// Also removes the medication's patterns and logs.
    async fn delete_medication(&self, owner: Uuid, id: Uuid) -> StoreResult<()>;

    /// The owner's medications among `ids`; ids that match nothing are
    /// skipped.
    async fn medications_by_id(&self, owner: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Medication>>;

    /// Patterns (oldest first) and logs (by `scheduled_at`) of the owner's
    /// medications among `ids`.
    async fn medication_children(
        &self,
        owner: Uuid,
        ids: &[Uuid],
    ) -> StoreResult<(Vec<MedicationPattern>, Vec<MedicationLog>)>;
}

/// Patterns are addressed through their parent medication; an unknown or
/// foreign medication is `NotFound("Medication")`.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn list_patterns(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        criteria: &PatternCriteria,
        page: PageRequest,
    ) -> StoreResult<Page<MedicationPattern>>;

    async fn create_pattern(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        input: PatternInput,
    ) -> StoreResult<MedicationPattern>;

    async fn get_pattern(&self, owner: Uuid, medication_id: Uuid, id: Uuid) -> StoreResult<MedicationPattern>;

    async fn update_pattern(
        &self,
        owner: Uuid,
        medication_id: Uuid,
        id: Uuid,
        input: PatternInput,
    ) -> StoreResult<MedicationPattern>;

    /// Logs that referenced the pattern keep existing without the link.
    async fn delete_pattern(&self, owner: Uuid, medication_id: Uuid, id: Uuid) -> StoreResult<()>;
}

/// Log writes verify that the referenced medication and pattern are the
/// caller's and fit together; violations are field errors, not 404s.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn list_logs(&self, owner: Uuid, criteria: &LogCriteria, page: PageRequest)
        -> StoreResult<Page<MedicationLog>>;

    async fn create_log(&self, owner: Uuid, input: LogInput) -> StoreResult<MedicationLog>;

    async fn get_log(&self, owner: Uuid, id: Uuid) -> StoreResult<MedicationLog>;

    async fn update_log(&self, owner: Uuid, id: Uuid, input: LogInput) -> StoreResult<MedicationLog>;

    async fn delete_log(&self, owner: Uuid, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait SideEffectCatalog: Send + Sync {
    async fn list_side_effect_types(&self, criteria: &CatalogCriteria) -> StoreResult<Vec<SideEffectType>>;

    /// Inserts catalog entries whose name is not present yet; returns how
    /// many were added.
    async fn seed_side_effect_types(&self, entries: Vec<SideEffectType>) -> StoreResult<usize>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up by email, creating the user when absent.
    async fn find_or_create_user(&self, email: &str, name: &str, external_id: Option<&str>) -> StoreResult<User>;

    async fn get_user(&self, id: Uuid) -> StoreResult<User>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> StoreResult<Session>;

    async fn get_session(&self, id: Uuid) -> StoreResult<Session>;

    async fn revoke_session(&self, id: Uuid) -> StoreResult<()>;
}

/// Everything the HTTP layer needs from a backend.
#[async_trait]
pub trait Store: MedicationStore + PatternStore + LogStore + SideEffectCatalog + UserStore + SessionStore {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;
}

/// Reference checks shared by both backends for log writes.
pub(crate) fn log_reference_errors(
    medication: Option<&Medication>,
    pattern: Option<Option<&MedicationPattern>>,
    log: &MedicationLog,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if medication.is_none() {
        errors.add("medication_id", "The selected medication id is invalid.");
    }
    // `Some(None)`: a pattern id was given but no owned pattern matched.
    if let Some(found) = pattern {
        let fits = found.map_or(false, |p| p.medication_id == log.medication_id);
        if !fits {
            errors.add("medication_pattern_id", "The selected medication pattern id is invalid.");
        }
    }
    errors.into_result()
}
