use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{UpdateUserRequest, UserResponse},
    services::AccountService,
};
use crate::{auth::jwt::AuthUser, context::Context, error::AppError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:uuid", patch(update_user))
        .route("/me", get(get_me))
}

/// PATCH /users/:uuid, only for the token holder's own uuid.
#[instrument(skip(state, accounts, claims, payload), fields(caller = %claims.user_uuid))]
pub async fn update_user(
    State(state): State<AppState>,
    State(accounts): State<AccountService>,
    AuthUser(claims): AuthUser,
    Path(target): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let ctx = Context::with_timeout(state.config.request_timeout);
    let user = accounts
        .update_profile(&ctx, &claims, target, payload)
        .await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, accounts, claims), fields(caller = %claims.user_uuid))]
pub async fn get_me(
    State(state): State<AppState>,
    State(accounts): State<AccountService>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let ctx = Context::with_timeout(state.config.request_timeout);
    let user = accounts.profile(&ctx, &claims).await?;
    Ok(Json(user.into()))
}
