use std::sync::Arc;

use tracing::{debug, warn};

use super::repo_types::User;
use super::store::UserStore;
use super::validation::normalize_email;
use crate::auth::password::{verify_dummy, verify_password};
use crate::context::Context;
use crate::error::AppError;

/// Email/password verification against the stored hash.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Unknown email and wrong password both yield [`AppError::InvalidCredentials`].
    pub async fn authenticate(
        &self,
        ctx: &Context,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = normalize_email(email);

        let store = Arc::clone(&self.store);
        let lookup_email = email.clone();
        let lookup = tokio::spawn(async move { store.find_by_email(&lookup_email).await });
        let Some(user) = ctx.run(lookup).await??? else {
            let plain = password.to_owned();
            let check = tokio::task::spawn_blocking(move || verify_dummy(&plain));
            ctx.run(check).await??;
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let plain = password.to_owned();
        let hash = user.password_hash.clone();
        let check = tokio::task::spawn_blocking(move || verify_password(&plain, &hash));
        let ok = ctx.run(check).await???;

        if !ok {
            warn!(user_id = %user.external_id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        debug!(user_id = %user.external_id, "credentials verified");
        Ok(user.without_password())
    }
}
