use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use authstream_application::{CreateProfileInput, ProfileRecord, ProfileStore};
use authstream_core::{AppError, AppResult};

/// PostgreSQL-backed profile store. Subject uniqueness is enforced by the
/// `profiles_oauth_subject_key` constraint.
#[derive(Clone)]
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    oauth_subject: String,
    user_id: Option<i64>,
    preferred_name: String,
    email: Option<String>,
    picture_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            subject: row.oauth_subject,
            user_id: row.user_id,
            preferred_name: row.preferred_name,
            email: row.email,
            picture_url: row.picture_url,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn profile_exists(&self, subject: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM profiles WHERE oauth_subject = $1)
            "#,
        )
        .bind(subject)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check profile existence: {error}")))
    }

    async fn create_profile(&self, input: CreateProfileInput) -> AppResult<ProfileRecord> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (id, oauth_subject, user_id, preferred_name, email, picture_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, oauth_subject, user_id, preferred_name, email, picture_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.subject.as_str())
        .bind(input.user_id)
        .bind(input.preferred_name.as_str())
        .bind(input.email.as_deref())
        .bind(input.picture_url.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| subject_conflict_or_internal(error, input.subject.as_str()))?;

        Ok(row.into())
    }
}

fn subject_conflict_or_internal(error: sqlx::Error, subject: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("profile for subject '{subject}' already exists"));
    }

    AppError::Internal(format!("failed to create profile: {error}"))
}
