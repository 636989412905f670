use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{claims::UserContext, extractors::AuthUser},
    response::{success, ApiError, ApiResult},
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest},
        repo_types::{DeleteOutcome, UpdateOutcome, User, UserFilter},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route("/user/:id", get(get_user).put(update_user).delete(delete_user))
}

/// Resolves the `:id` path segment: the literal `me` is the caller, anything else must be a UUID.
fn resolve_id(raw: &str, caller: &UserContext) -> Result<Uuid, ApiError> {
    if raw == "me" {
        return Ok(caller.id);
    }
    Uuid::parse_str(raw).map_err(|e| ApiError::bad_request("Invalid ID").with_cause(e))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Uuid> {
    let Json(req) = payload?;
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let id = state.accounts.create_user(req).await?;
    tracing::info!(created_by = %caller.id, user_id = %id, "user created via api");
    success(StatusCode::CREATED, id)
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> ApiResult<Vec<User>> {
    let users = state.accounts.get_users(UserFilter::All).await?;
    success(StatusCode::OK, users)
}

#[instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let id = resolve_id(&id, &caller)?;
    let user = state.accounts.get_user(UserFilter::Id(id)).await?;
    success(StatusCode::OK, user)
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<UpdateOutcome> {
    let id = resolve_id(&id, &caller)?;
    let Json(req) = payload?;

    let outcome = state.accounts.update_user(UserFilter::Id(id), req.into()).await?;
    success(StatusCode::OK, outcome)
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<DeleteOutcome> {
    let id = resolve_id(&id, &caller)?;
    let outcome = state.accounts.delete_user(UserFilter::Id(id)).await?;
    success(StatusCode::OK, outcome)
}
