use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::dto::{LoginRequest, LoginResponse},
    context::Context,
    error::AppError,
    state::AppState,
    users::{
        dto::{RegisterRequest, UserResponse},
        services::AccountService,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, accounts, payload))]
pub async fn register(
    State(state): State<AppState>,
    State(accounts): State<AccountService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let ctx = Context::with_timeout(state.config.request_timeout);
    let user = accounts.register(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, accounts, payload))]
pub async fn login(
    State(state): State<AppState>,
    State(accounts): State<AccountService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let ctx = Context::with_timeout(state.config.request_timeout);
    let (token, user) = accounts.login(&ctx, payload).await?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}
