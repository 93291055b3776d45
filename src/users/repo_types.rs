use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                      // internal id, never exposed
    pub external_id: Uuid,            // public id, used in tokens and routes
    pub username: String,
    pub email: String,                // stored lowercased
    pub password_hash: String,        // Argon2 PHC string
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Drop the stored hash before the user leaves the data layer.
    pub fn without_password(mut self) -> Self {
        self.password_hash.clear();
        self
    }
}

/// Columns that must stay unique ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Email,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Row to insert. Ids and timestamps are decided by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub updated_at: OffsetDateTime,
}
