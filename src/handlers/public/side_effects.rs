use axum::extract::{Path, State};

use crate::app::AppState;
use crate::error::ResultExt;
use crate::filter::CatalogCriteria;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::SideEffectType;

/// GET /api/side-effect-types
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<SideEffectType>> {
    let types = state
        .store
        .list_side_effect_types(&CatalogCriteria::default())
        .await
        .while_doing("Failed to retrieve side effect types")?;
    Ok(ApiResponse::success(types))
}

/// GET /api/side-effect-types/category/:category
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Vec<SideEffectType>> {
    let criteria = CatalogCriteria {
        category: Some(category),
    };
    let types = state
        .store
        .list_side_effect_types(&criteria)
        .await
        .while_doing("Failed to retrieve side effect types by category")?;
    Ok(ApiResponse::success(types))
}
