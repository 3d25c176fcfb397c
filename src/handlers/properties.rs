use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::database::models::Property;
use crate::filter::ListParams;
use crate::middleware::{actor, ApiResponse, ApiResult, AuthUser};
use crate::services::{PropertyInput, PropertySummary};
use crate::state::AppState;

/// GET /properties - Paginated, filtered and sorted listing page
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Property>> {
    let Query(params) = query?;
    let (rows, total) = state.properties().list(&params).await?;
    Ok(ApiResponse::page(rows, total))
}

/// GET /properties/five
pub async fn latest(State(state): State<AppState>) -> ApiResult<PropertySummary> {
    Ok(ApiResponse::success(state.properties().latest().await?))
}

/// GET /properties/:id - One listing with its creator populated
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    Ok(ApiResponse::success(state.properties().get(&id).await?))
}

/// POST /properties
pub async fn create(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<PropertyInput>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let property = state.properties().create(input, actor(&auth)).await?;
    Ok(ApiResponse::created(json!({
        "message": "Property created successfully",
        "property": property,
    })))
}

/// PATCH /properties/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<PropertyInput>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let property = state.properties().update(&id, input, actor(&auth)).await?;
    Ok(ApiResponse::success(json!({
        "message": "Property updated successfully",
        "property": property,
    })))
}

/// DELETE /properties/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Option<Extension<AuthUser>>,
) -> ApiResult<Value> {
    state.properties().delete(&id, actor(&auth)).await?;
    Ok(ApiResponse::success(json!({ "message": "Property deleted successfully" })))
}
