use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::database::models::Requirement;
use crate::filter::ListParams;
use crate::middleware::{actor, ApiResponse, ApiResult, AuthUser};
use crate::services::{RequirementInput, RequirementSummary};
use crate::state::AppState;

/// GET /requirement
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Requirement>> {
    let Query(params) = query?;
    let (rows, total) = state.requirements().list(&params).await?;
    Ok(ApiResponse::page(rows, total))
}

/// GET /requirement/five
pub async fn latest(State(state): State<AppState>) -> ApiResult<RequirementSummary> {
    Ok(ApiResponse::success(state.requirements().latest().await?))
}

/// GET /requirement/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    Ok(ApiResponse::success(state.requirements().get(&id).await?))
}

/// POST /requirement
pub async fn create(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<RequirementInput>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let requirement = state.requirements().create(input, actor(&auth)).await?;
    Ok(ApiResponse::created(json!({
        "message": "Requirement created successfully",
        "requirement": requirement,
    })))
}

/// PATCH /requirement/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<RequirementInput>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let requirement = state.requirements().update(&id, input, actor(&auth)).await?;
    Ok(ApiResponse::success(json!({
        "message": "Requirement updated successfully",
        "requirement": requirement,
    })))
}

/// DELETE /requirement/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Option<Extension<AuthUser>>,
) -> ApiResult<Value> {
    state.requirements().delete(&id, actor(&auth)).await?;
    Ok(ApiResponse::success(json!({ "message": "Requirement deleted successfully" })))
}
