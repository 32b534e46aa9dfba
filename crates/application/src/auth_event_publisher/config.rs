use std::time::Duration;

/// Publisher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStreamPublisherConfig {
    /// Whether events are published at all.
    pub enabled: bool,
    /// Stream key events are appended to.
    pub stream_name: String,
    /// Approximate stream length bound. Zero or negative disables trimming.
    pub max_length: i64,
    /// Upper bound for each append and trim call.
    pub append_timeout: Duration,
}

impl EventStreamPublisherConfig {
    /// Returns the trim bound, or `None` when trimming is disabled.
    #[must_use]
    pub fn trim_length(&self) -> Option<u64> {
        u64::try_from(self.max_length)
            .ok()
            .filter(|max_length| *max_length > 0)
    }
}

impl Default for EventStreamPublisherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stream_name: "auth:events".to_owned(),
            max_length: 1000,
            append_timeout: Duration::from_millis(250),
        }
    }
}
