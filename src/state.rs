use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;

use crate::auth::jwt::TokenService;
use crate::config::AppConfig;
use crate::db::{self, PgUserStore};
use crate::users::store::UserStore;

/// Read-only after startup; cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<(Self, sqlx::PgPool)> {
        let config = AppConfig::from_env()?;
        let pool = db::connect(&config)
            .await
            .context("connect to database")?;
        let store = Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>;
        Ok((Self::from_parts(config, store), pool))
    }

    pub fn from_parts(config: AppConfig, store: Arc<dyn UserStore>) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt));
        Self {
            config: Arc::new(config),
            store,
            tokens,
        }
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
