use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use super::authenticator::Authenticator;
use super::dto::{RegisterRequest, UpdateUserRequest};
use super::existence::ExistenceChecker;
use super::mutator::UserMutator;
use super::repo_types::User;
use super::store::UserStore;
use super::validation::{normalize_email, validate_email, validate_password, validate_username};
use crate::auth::claims::Claims;
use crate::auth::dto::LoginRequest;
use crate::auth::jwt::{authorize_target, TokenService};
use crate::auth::password::hash_password_blocking;
use crate::context::Context;
use crate::error::AppError;
use crate::state::AppState;

/// Registration, login and profile update, composed from the data-access
/// components and the token service.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    checker: ExistenceChecker,
    mutator: UserMutator,
    authenticator: Authenticator,
    tokens: Arc<TokenService>,
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.tokens.clone())
    }
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self {
            checker: ExistenceChecker::new(store.clone()),
            mutator: UserMutator::new(store.clone()),
            authenticator: Authenticator::new(store.clone()),
            store,
            tokens,
        }
    }

    pub async fn register(&self, ctx: &Context, req: RegisterRequest) -> Result<User, AppError> {
        let email = normalize_email(&req.email);
        validate_username(&req.username)?;
        validate_email(&email)?;
        validate_password(&req.password)?;

        if let Some(field) = self
            .checker
            .check_exists(ctx, Some(&req.username), Some(&email), None)
            .await?
        {
            warn!(%field, "registration conflict");
            return Err(AppError::Conflict { field });
        }

        let hash = ctx.run(hash_password_blocking(req.password)).await??;
        let user = self.mutator.create(ctx, &req.username, &email, &hash).await?;
        info!(user_id = %user.external_id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Returns a signed token and the authenticated user.
    pub async fn login(&self, ctx: &Context, req: LoginRequest) -> Result<(String, User), AppError> {
        let email = normalize_email(&req.email);
        validate_email(&email)?;
        if req.password.is_empty() {
            return Err(AppError::validation("password", "is required"));
        }

        let user = self.authenticator.authenticate(ctx, &email, &req.password).await?;
        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.external_id, "user logged in");
        Ok((token, user))
    }

    /// Update the account named by `target`, which must be the caller's own.
    pub async fn update_profile(
        &self,
        ctx: &Context,
        claims: &Claims,
        target: Uuid,
        req: UpdateUserRequest,
    ) -> Result<User, AppError> {
        authorize_target(claims, target)?;

        let email = req.email.as_deref().map(normalize_email);
        if let Some(username) = &req.username {
            validate_username(username)?;
        }
        if let Some(email) = &email {
            validate_email(email)?;
        }
        if let Some(password) = &req.password {
            validate_password(password)?;
        }

        if let Some(field) = self
            .checker
            .check_exists(ctx, req.username.as_deref(), email.as_deref(), Some(target))
            .await?
        {
            warn!(%field, user_id = %target, "profile update conflict");
            return Err(AppError::Conflict { field });
        }

        let hash = match req.password {
            Some(password) => Some(ctx.run(hash_password_blocking(password)).await??),
            None => None,
        };
        let user = self
            .mutator
            .update(ctx, target, req.username.as_deref(), email.as_deref(), hash.as_deref())
            .await?;
        info!(user_id = %user.external_id, "profile updated");
        Ok(user)
    }

    /// Current record of the token holder.
    pub async fn profile(&self, ctx: &Context, claims: &Claims) -> Result<User, AppError> {
        let store = Arc::clone(&self.store);
        let external_id = claims.user_uuid;
        let lookup = tokio::spawn(async move { store.find_by_external_id(external_id).await });
        let user = ctx.run(lookup).await???.ok_or(AppError::NotFound)?;
        Ok(user.without_password())
    }
}
