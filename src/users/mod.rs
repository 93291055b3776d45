use crate::state::AppState;
use axum::Router;

pub mod authenticator;
pub mod dto;
pub mod existence;
pub mod handlers;
pub mod mutator;
pub mod repo_types;
pub mod services;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod memory;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
