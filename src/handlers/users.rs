use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::User;
use crate::middleware::{actor, ApiResponse, ApiResult, AuthUser};
use crate::services::{UserInput, UserProfileInput, UserUpsert, UserWithProperties};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub credential: String,
}

fn upserted(result: UserUpsert) -> ApiResponse<User> {
    let status = if result.created { StatusCode::CREATED } else { StatusCode::OK };
    ApiResponse::with_status(result.user, status)
}

/// GET /users
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(ApiResponse::success(state.users().list().await?))
}

/// POST /users - Find-or-create by email
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<User> {
    let Json(input) = payload?;
    Ok(upserted(state.users().upsert(input).await?))
}

/// POST /users/login - Exchange an identity-provider credential for the stored user
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Json(request) = payload?;
    Ok(upserted(state.users().login(&request.credential).await?))
}

/// POST /users/update
pub async fn update(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<UserProfileInput>, JsonRejection>,
) -> ApiResult<User> {
    let Json(input) = payload?;
    Ok(ApiResponse::success(state.users().update_profile(input, actor(&auth)).await?))
}

/// GET /users/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserWithProperties> {
    Ok(ApiResponse::success(state.users().get(&id).await?))
}

/// DELETE /users/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Option<Extension<AuthUser>>,
) -> ApiResult<Value> {
    state.users().delete(&id, actor(&auth)).await?;
    Ok(ApiResponse::success(json!({ "message": "User deleted successfully" })))
}
