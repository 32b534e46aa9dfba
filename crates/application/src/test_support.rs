use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use authstream_core::{AppError, AppResult};
use authstream_domain::{StreamFields, StreamRecordId};

use crate::{CreateProfileInput, EventStreamAppender, ProfileRecord, ProfileStore};

/// Profile store fake that records every call and enforces subject uniqueness.
#[derive(Default)]
pub(crate) struct FakeProfileStore {
    pub(crate) profiles: Mutex<HashMap<String, ProfileRecord>>,
    pub(crate) exists_calls: Mutex<Vec<String>>,
    pub(crate) create_calls: Mutex<Vec<CreateProfileInput>>,
    pub(crate) fail_exists: bool,
    pub(crate) fail_create: bool,
    /// Reports "missing" from the existence check even when the profile is stored.
    pub(crate) stale_exists: bool,
}

impl FakeProfileStore {
    pub(crate) async fn seed(&self, subject: &str) {
        self.profiles.lock().await.insert(
            subject.to_owned(),
            ProfileRecord {
                id: Uuid::new_v4(),
                subject: subject.to_owned(),
                user_id: None,
                preferred_name: subject.to_owned(),
                email: None,
                picture_url: None,
                created_at: Utc::now(),
            },
        );
    }

    pub(crate) async fn interaction_count(&self) -> usize {
        self.exists_calls.lock().await.len() + self.create_calls.lock().await.len()
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn profile_exists(&self, subject: &str) -> AppResult<bool> {
        self.exists_calls.lock().await.push(subject.to_owned());
        if self.fail_exists {
            return Err(AppError::Internal("profile lookup failed".to_owned()));
        }

        if self.stale_exists {
            return Ok(false);
        }

        Ok(self.profiles.lock().await.contains_key(subject))
    }

    async fn create_profile(&self, input: CreateProfileInput) -> AppResult<ProfileRecord> {
        self.create_calls.lock().await.push(input.clone());
        if self.fail_create {
            return Err(AppError::Internal("profile store unavailable".to_owned()));
        }

        let mut profiles = self.profiles.lock().await;
        if profiles.contains_key(input.subject.as_str()) {
            return Err(AppError::Conflict(format!(
                "profile already exists for subject '{}'",
                input.subject
            )));
        }

        let record = ProfileRecord {
            id: Uuid::new_v4(),
            subject: input.subject.clone(),
            user_id: input.user_id,
            preferred_name: input.preferred_name,
            email: input.email,
            picture_url: input.picture_url,
            created_at: Utc::now(),
        };
        profiles.insert(input.subject, record.clone());
        Ok(record)
    }
}

/// Appender fake that records appends and trims.
#[derive(Default)]
pub(crate) struct RecordingAppender {
    pub(crate) appended: Mutex<Vec<(String, StreamFields)>>,
    pub(crate) trims: Mutex<Vec<(String, u64)>>,
    pub(crate) fail_append: bool,
    pub(crate) fail_trim: bool,
    pub(crate) append_delay: Option<Duration>,
}

#[async_trait]
impl EventStreamAppender for RecordingAppender {
    async fn append(&self, stream: &str, fields: &StreamFields) -> AppResult<StreamRecordId> {
        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_append {
            return Err(AppError::Internal("connection refused".to_owned()));
        }

        let mut appended = self.appended.lock().await;
        appended.push((stream.to_owned(), fields.clone()));
        let sequence = u64::try_from(appended.len()).unwrap_or(u64::MAX);
        Ok(StreamRecordId::new(1, sequence))
    }

    async fn trim_approx(&self, stream: &str, max_length: u64) -> AppResult<()> {
        if self.fail_trim {
            return Err(AppError::Internal("trim rejected".to_owned()));
        }

        self.trims.lock().await.push((stream.to_owned(), max_length));
        Ok(())
    }
}
