//! In-process [`UserStore`] used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Field, NewUser, User, UserChanges};
use super::store::{StoreError, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<User>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    exists_delay: Mutex<HashMap<Field, Duration>>,
    exists_failure: Mutex<Option<Field>>,
    write_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `exists` on `field` sleep before answering.
    pub fn slow_exists(&self, field: Field, delay: Duration) {
        self.exists_delay.lock().unwrap().insert(field, delay);
    }

    /// Make `exists` on `field` fail with a connection-level error.
    pub fn fail_exists(&self, field: Field) {
        *self.exists_failure.lock().unwrap() = Some(field);
    }

    pub fn slow_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Number of store calls made, of any kind.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn row(&self, external_id: Uuid) -> Option<User> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned()
    }

    fn taken(rows: &[User], field: Field, value: &str, exclude: Option<Uuid>) -> bool {
        rows.iter()
            .filter(|u| Some(u.external_id) != exclude)
            .any(|u| {
                let current = match field {
                    Field::Username => &u.username,
                    Field::Email => &u.email,
                };
                current.to_lowercase() == value.to_lowercase()
            })
    }

    async fn write_pause(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn exists(
        &self,
        field: Field,
        value: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.exists_delay.lock().unwrap().get(&field).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.exists_failure.lock().unwrap() == Some(field) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let rows = self.rows.lock().unwrap();
        Ok(Self::taken(&rows, field, value, exclude))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|u| u.email.to_lowercase() == email.to_lowercase())
            .cloned())
    }

    async fn find_by_external_id(&self, external_id: Uuid) -> Result<Option<User>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.row(external_id))
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.write_pause().await;
        let mut rows = self.rows.lock().unwrap();
        for field in [Field::Username, Field::Email] {
            let value = match field {
                Field::Username => &user.username,
                Field::Email => &user.email,
            };
            if Self::taken(&rows, field, value, None) {
                return Err(StoreError::UniqueViolation(field));
            }
        }
        let row = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            external_id: user.external_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        external_id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.write_pause().await;
        let mut rows = self.rows.lock().unwrap();
        if let Some(username) = &changes.username {
            if Self::taken(&rows, Field::Username, username, Some(external_id)) {
                return Err(StoreError::UniqueViolation(Field::Username));
            }
        }
        if let Some(email) = &changes.email {
            if Self::taken(&rows, Field::Email, email, Some(external_id)) {
                return Err(StoreError::UniqueViolation(Field::Email));
            }
        }
        let Some(row) = rows.iter_mut().find(|u| u.external_id == external_id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            row.username = username;
        }
        if let Some(email) = changes.email {
            row.email = email;
        }
        if let Some(hash) = changes.password_hash {
            row.password_hash = hash;
        }
        row.updated_at = changes.updated_at;
        Ok(Some(row.clone()))
    }
}
