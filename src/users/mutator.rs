use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};
use super::store::UserStore;
use crate::context::Context;
use crate::error::AppError;

/// Writes to the `users` table.
///
/// Each write runs on its own task and the caller only waits for it while the
/// context is live. A write abandoned by a cancelled caller keeps running and
/// is not rolled back here.
#[derive(Clone)]
pub struct UserMutator {
    store: Arc<dyn UserStore>,
}

impl UserMutator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        ctx: &Context,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let new_user = NewUser {
            external_id: Uuid::new_v4(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        let external_id = new_user.external_id;

        let store = Arc::clone(&self.store);
        let write = tokio::spawn(async move { store.insert(new_user).await });
        let user = ctx.run(write).await.map_err(|reason| {
            warn!(%external_id, %reason, "create abandoned by caller");
            reason
        })???;

        debug!(user_id = %user.external_id, "user row inserted");
        Ok(user.without_password())
    }

    /// Update only the supplied columns of the row with `external_id`.
    /// `updated_at` is refreshed even when nothing else is supplied.
    pub async fn update(
        &self,
        ctx: &Context,
        external_id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<User, AppError> {
        let changes = UserChanges {
            username: username.map(str::to_owned),
            email: email.map(str::to_owned),
            password_hash: password_hash.map(str::to_owned),
            updated_at: OffsetDateTime::now_utc(),
        };

        let store = Arc::clone(&self.store);
        let write = tokio::spawn(async move { store.update(external_id, changes).await });
        let updated = ctx.run(write).await.map_err(|reason| {
            warn!(%external_id, %reason, "update abandoned by caller");
            reason
        })???;

        let user = updated.ok_or(AppError::NotFound)?;
        debug!(user_id = %user.external_id, "user row updated");
        Ok(user.without_password())
    }
}
