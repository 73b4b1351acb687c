use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::error::ResultExt;
use crate::filter::MedicationQuery;
use crate::middleware::{parse_id, ApiResponse, ApiResult, JsonObject, QueryParams};
use crate::models::{CurrentUser, MedicationInput, MedicationWithRelations};
use crate::store::relations;
use crate::validation::InputMode;

/// GET /api/medications
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    QueryParams(query): QueryParams<MedicationQuery>,
) -> ApiResult<Vec<MedicationWithRelations>> {
    let (criteria, page) = query.parse(&state.config.api)?;
    let page = state
        .store
        .list_medications(user.id, &criteria, page)
        .await
        .while_doing("Failed to retrieve medications")?;
    let page = relations::medication_page(&*state.store, user.id, page)
        .await
        .while_doing("Failed to retrieve medications")?;
    Ok(ApiResponse::paginated(page))
}

/// POST /api/medications
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonObject(body): JsonObject,
) -> ApiResult<MedicationWithRelations> {
    let input = MedicationInput::from_body(&body, InputMode::Create)?;
    let medication = state
        .store
        .create_medication(user.id, input)
        .await
        .while_doing("Failed to create medication")?;
    tracing::info!(user_id = %user.id, medication_id = %medication.id, "medication created");
    let medication = relations::medication(&*state.store, user.id, medication)
        .await
        .while_doing("Failed to create medication")?;
    Ok(ApiResponse::created(medication).with_message("Medication created successfully"))
}

/// GET /api/medications/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<MedicationWithRelations> {
    let id = parse_id(&id)?;
    let medication = state
        .store
        .get_medication(user.id, id)
        .await
        .while_doing("Failed to retrieve medication")?;
    let medication = relations::medication(&*state.store, user.id, medication)
        .await
        .while_doing("Failed to retrieve medication")?;
    Ok(ApiResponse::success(medication))
}

/// PUT|PATCH /api/medications/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> ApiResult<MedicationWithRelations> {
    let id = parse_id(&id)?;
    let input = MedicationInput::from_body(&body, InputMode::Update)?;
    let medication = state
        .store
        .update_medication(user.id, id, input)
        .await
        .while_doing("Failed to update medication")?;
    let medication = relations::medication(&*state.store, user.id, medication)
        .await
        .while_doing("Failed to update medication")?;
    Ok(ApiResponse::success(medication).with_message("Medication updated successfully"))
}

/// DELETE /api/medications/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    state
        .store
        .delete_medication(user.id, id)
        .await
        .while_doing("Failed to delete medication")?;
    tracing::info!(user_id = %user.id, medication_id = %id, "medication deleted");
    Ok(ApiResponse::message_only("Medication deleted successfully"))
}
