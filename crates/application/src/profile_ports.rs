use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use authstream_core::AppResult;

/// Input for creating one minimal profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProfileInput {
    /// OAuth2 subject the profile belongs to. Unique.
    pub subject: String,
    /// Numeric user id from the authorization server.
    pub user_id: Option<i64>,
    /// Name shown for the user.
    pub preferred_name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Avatar URL.
    pub picture_url: Option<String>,
}

/// Stored profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Profile id.
    pub id: Uuid,
    /// OAuth2 subject.
    pub subject: String,
    /// Numeric user id.
    pub user_id: Option<i64>,
    /// Name shown for the user.
    pub preferred_name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Avatar URL.
    pub picture_url: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Profile persistence port.
///
/// Implementations must reject a second profile for the same subject with
/// `AppError::Conflict`.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns whether a profile exists for the subject.
    async fn profile_exists(&self, subject: &str) -> AppResult<bool>;

    /// Creates a profile.
    async fn create_profile(&self, input: CreateProfileInput) -> AppResult<ProfileRecord>;
}
