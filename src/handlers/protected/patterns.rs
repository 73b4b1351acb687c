use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::error::ResultExt;
use crate::filter::PatternQuery;
use crate::middleware::{parse_id, ApiResponse, ApiResult, JsonObject, QueryParams};
use crate::models::{CurrentUser, MedicationPattern, PatternInput};
use crate::validation::InputMode;

/// GET /api/medications/:id/patterns
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(medication_id): Path<String>,
    QueryParams(query): QueryParams<PatternQuery>,
) -> ApiResult<Vec<MedicationPattern>> {
    let medication_id = parse_id(&medication_id)?;
    let (criteria, page) = query.parse(&state.config.api)?;
    let page = state
        .store
        .list_patterns(user.id, medication_id, &criteria, page)
        .await
        .while_doing("Failed to retrieve patterns")?;
    Ok(ApiResponse::paginated(page))
}

/// POST /api/medications/:id/patterns
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(medication_id): Path<String>,
    JsonObject(body): JsonObject,
) -> ApiResult<MedicationPattern> {
    let medication_id = parse_id(&medication_id)?;
    let input = PatternInput::from_body(&body, InputMode::Create)?;
    let pattern = state
        .store
        .create_pattern(user.id, medication_id, input)
        .await
        .while_doing("Failed to create pattern")?;
    tracing::info!(user_id = %user.id, %medication_id, pattern_id = %pattern.id, "pattern created");
    Ok(ApiResponse::created(pattern).with_message("Pattern created successfully"))
}

/// GET /api/medications/:id/patterns/:pattern_id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((medication_id, id)): Path<(String, String)>,
) -> ApiResult<MedicationPattern> {
    let (medication_id, id) = (parse_id(&medication_id)?, parse_id(&id)?);
    let pattern = state
        .store
        .get_pattern(user.id, medication_id, id)
        .await
        .while_doing("Failed to retrieve pattern")?;
    Ok(ApiResponse::success(pattern))
}

/// PUT|PATCH /api/medications/:id/patterns/:pattern_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((medication_id, id)): Path<(String, String)>,
    JsonObject(body): JsonObject,
) -> ApiResult<MedicationPattern> {
    let (medication_id, id) = (parse_id(&medication_id)?, parse_id(&id)?);
    let input = PatternInput::from_body(&body, InputMode::Update)?;
    let pattern = state
        .store
        .update_pattern(user.id, medication_id, id, input)
        .await
        .while_doing("Failed to update pattern")?;
    Ok(ApiResponse::success(pattern).with_message("Pattern updated successfully"))
}

/// DELETE /api/medications/:id/patterns/:pattern_id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((medication_id, id)): Path<(String, String)>,
) -> ApiResult<()> {
    let (medication_id, id) = (parse_id(&medication_id)?, parse_id(&id)?);
    state
        .store
        .delete_pattern(user.id, medication_id, id)
        .await
        .while_doing("Failed to delete pattern")?;
    tracing::info!(user_id = %user.id, %medication_id, pattern_id = %id, "pattern deleted");
    Ok(ApiResponse::message_only("Pattern deleted successfully"))
}
