use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::error::ResultExt;
use crate::filter::LogQuery;
use crate::middleware::{parse_id, ApiResponse, ApiResult, JsonObject, QueryParams};
use crate::models::{CurrentUser, LogInput, LogWithMedication};
use crate::store::relations;
use crate::validation::InputMode;

/// GET /api/medication-logs
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    QueryParams(query): QueryParams<LogQuery>,
) -> ApiResult<Vec<LogWithMedication>> {
    let (criteria, page) = query.parse(&state.config.api)?;
    let page = state
        .store
        .list_logs(user.id, &criteria, page)
        .await
        .while_doing("Failed to retrieve logs")?;
    let page = relations::log_page(&*state.store, user.id, page)
        .await
        .while_doing("Failed to retrieve logs")?;
    Ok(ApiResponse::paginated(page))
}

/// POST /api/medication-logs
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonObject(body): JsonObject,
) -> ApiResult<LogWithMedication> {
    let input = LogInput::from_body(&body, InputMode::Create)?;
    let log = state
        .store
        .create_log(user.id, input)
        .await
        .while_doing("Failed to create log")?;
    tracing::info!(user_id = %user.id, log_id = %log.id, status = log.status.as_str(), "log created");
    let log = relations::log(&*state.store, user.id, log)
        .await
        .while_doing("Failed to create log")?;
    Ok(ApiResponse::created(log).with_message("Log created successfully"))
}

/// GET /api/medication-logs/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<LogWithMedication> {
    let id = parse_id(&id)?;
    let log = state
        .store
        .get_log(user.id, id)
        .await
        .while_doing("Failed to retrieve log")?;
    let log = relations::log(&*state.store, user.id, log)
        .await
        .while_doing("Failed to retrieve log")?;
    Ok(ApiResponse::success(log))
}

/// PUT|PATCH /api/medication-logs/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> ApiResult<LogWithMedication> {
    let id = parse_id(&id)?;
    let input = LogInput::from_body(&body, InputMode::Update)?;
    let log = state
        .store
        .update_log(user.id, id, input)
        .await
        .while_doing("Failed to update log")?;
    let log = relations::log(&*state.store, user.id, log)
        .await
        .while_doing("Failed to update log")?;
    Ok(ApiResponse::success(log).with_message("Log updated successfully"))
}

/// DELETE /api/medication-logs/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    state
        .store
        .delete_log(user.id, id)
        .await
        .while_doing("Failed to delete log")?;
    tracing::info!(user_id = %user.id, log_id = %id, "log deleted");
    Ok(ApiResponse::message_only("Log deleted successfully"))
}
