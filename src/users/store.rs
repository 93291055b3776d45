use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Field, NewUser, User, UserChanges};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} is already taken")]
    UniqueViolation(Field),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Point queries over the `users` table.
///
/// Implementations own connection handling and transactional atomicity.
/// Callers cancel by dropping the returned future; work already sent to the
/// database may still complete.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive existence check on `field`, ignoring the row with
    /// `exclude` as its external id.
    async fn exists(
        &self,
        field: Field,
        value: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError>;

    /// Case-insensitive lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_external_id(&self, external_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert and return the row as stored.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Apply `changes` to the row with `external_id`; `None` if no row matched.
    async fn update(
        &self,
        external_id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError>;
}
