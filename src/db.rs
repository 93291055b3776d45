use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::users::repo_types::{Field, NewUser, User, UserChanges};
use crate::users::store::{StoreError, UserStore};

const USER_COLUMNS: &str = "id, external_id, username, email, password_hash, created_at, updated_at";

pub async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
}

/// Postgres-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Field guarded by a unique index from the migration, by index name.
fn field_for_constraint(constraint: &str) -> Option<Field> {
    if constraint.contains("username") {
        Some(Field::Username)
    } else if constraint.contains("email") {
        Some(Field::Email)
    } else {
        None
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(field) = db_err.constraint().and_then(field_for_constraint) {
                return StoreError::UniqueViolation(field);
            }
        }
    }
    StoreError::Database(err)
}

/// `UPDATE` touching `updated_at` plus only the supplied columns, keyed by
/// the immutable external id.
fn build_update(external_id: Uuid, changes: UserChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = ");
    qb.push_bind(changes.updated_at);
    if let Some(username) = changes.username {
        qb.push(", username = ").push_bind(username);
    }
    if let Some(email) = changes.email {
        qb.push(", email = ").push_bind(email);
    }
    if let Some(hash) = changes.password_hash {
        qb.push(", password_hash = ").push_bind(hash);
    }
    qb.push(" WHERE external_id = ").push_bind(external_id);
    qb.push(" RETURNING ").push(USER_COLUMNS);
    qb
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn exists(
        &self,
        field: Field,
        value: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        // Column names come from `Field`, never from input.
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER({col}) = LOWER($1) \
             AND ($2::uuid IS NULL OR external_id <> $2))",
            col = field.column()
        );
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_external_id(&self, external_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (external_id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.external_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update(
        &self,
        external_id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut qb = build_update(external_id, changes);
        qb.build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }
}
