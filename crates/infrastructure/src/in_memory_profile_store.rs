use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use authstream_application::{CreateProfileInput, ProfileRecord, ProfileStore};
use authstream_core::{AppError, AppResult};

/// In-memory profile store keyed by subject.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, ProfileRecord>>,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored profile for a subject.
    pub async fn find(&self, subject: &str) -> Option<ProfileRecord> {
        self.profiles.read().await.get(subject).cloned()
    }

    /// Number of stored profiles.
    pub async fn count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn profile_exists(&self, subject: &str) -> AppResult<bool> {
        Ok(self.profiles.read().await.contains_key(subject))
    }

    async fn create_profile(&self, input: CreateProfileInput) -> AppResult<ProfileRecord> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(input.subject.as_str()) {
            return Err(AppError::Conflict(format!(
                "profile for subject '{}' already exists",
                input.subject
            )));
        }

        let record = ProfileRecord {
            id: Uuid::new_v4(),
            subject: input.subject,
            user_id: input.user_id,
            preferred_name: input.preferred_name,
            email: input.email,
            picture_url: input.picture_url,
            created_at: Utc::now(),
        };
        profiles.insert(record.subject.clone(), record.clone());

        Ok(record)
    }
}
