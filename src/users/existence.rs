use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;
use uuid::Uuid;

use super::repo_types::Field;
use super::store::{StoreError, UserStore};
use crate::context::Context;
use crate::error::AppError;

/// Concurrent username/email occupancy check.
#[derive(Clone)]
pub struct ExistenceChecker {
    store: Arc<dyn UserStore>,
}

impl ExistenceChecker {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Returns the first field found to be taken, or `None` if every supplied
    /// candidate is free.
    ///
    /// Each candidate is queried on its own task. The first conflict ends the
    /// check even if the other query is still running; a store error ends it
    /// only if no conflict was seen before. When both fields are taken the
    /// reported one is whichever answer arrived first. The row whose external
    /// id is `exclude` never counts as a conflict.
    pub async fn check_exists(
        &self,
        ctx: &Context,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Option<Field>, AppError> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        let mut checks: JoinSet<(Field, Result<bool, StoreError>)> = JoinSet::new();
        for (field, value) in [(Field::Username, username), (Field::Email, email)] {
            let Some(value) = value else { continue };
            let store = Arc::clone(&self.store);
            let value = value.to_owned();
            checks.spawn(async move {
                let taken = store.exists(field, &value, exclude).await;
                (field, taken)
            });
        }

        // Dropping `checks` on any early return aborts the queries still in flight.
        loop {
            tokio::select! {
                biased;
                reason = ctx.done() => return Err(reason.into()),
                joined = checks.join_next() => match joined {
                    None => return Ok(None),
                    Some(Ok((field, Ok(true)))) => {
                        debug!(%field, "existence check found conflict");
                        return Ok(Some(field));
                    }
                    Some(Ok((_, Ok(false)))) => continue,
                    Some(Ok((field, Err(e)))) => {
                        debug!(%field, error = %e, "existence check failed");
                        return Err(e.into());
                    }
                    Some(Err(join_err)) => return Err(join_err.into()),
                },
            }
        }
    }
}
