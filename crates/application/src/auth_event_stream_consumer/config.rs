use std::str::FromStr;
use std::time::Duration;

use authstream_core::AppError;

use crate::GroupStart;

use super::MessageOutcome;

const MAX_BLOCK_MARGIN: Duration = Duration::from_millis(500);
const FALLBACK_BLOCK: Duration = Duration::from_secs(1);

/// When a delivered record is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckPolicy {
    /// Acknowledge every record whatever the outcome. A failed side effect is
    /// lost, and a poison record can never stall the group.
    #[default]
    Always,
    /// Leave failed records pending. They are replayed only when a new
    /// connection opens, after a stream error or a process restart; a
    /// healthy long-lived connection leaves them pending until then.
    RetainFailed,
}

impl AckPolicy {
    /// Returns the configuration value of this policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::RetainFailed => "retain-failed",
        }
    }

    /// Whether a record with this outcome gets acknowledged.
    #[must_use]
    pub fn should_ack(&self, outcome: &MessageOutcome) -> bool {
        match self {
            Self::Always => true,
            Self::RetainFailed => !matches!(outcome, MessageOutcome::Failed(_)),
        }
    }
}

impl FromStr for AckPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "retain-failed" | "retain_failed" => Ok(Self::RetainFailed),
            other => Err(AppError::Validation(format!(
                "ack policy must be 'always' or 'retain-failed', got '{other}'"
            ))),
        }
    }
}

/// Consumer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStreamConsumerConfig {
    /// Whether polling runs at all.
    pub enabled: bool,
    /// Stream key to read.
    pub stream: String,
    /// Consumer group name.
    pub group: String,
    /// This consumer's name inside the group.
    pub consumer_name: String,
    /// Maximum records per poll.
    pub batch_size: usize,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Create the group (and stream) when it is missing.
    pub create_group_if_missing: bool,
    /// Where a group created by this consumer starts reading.
    pub group_start: GroupStart,
    /// Acknowledgment policy.
    pub ack_policy: AckPolicy,
}

impl EventStreamConsumerConfig {
    /// How long one read may block: a little under the poll interval so a
    /// tick returns before the next one is due.
    #[must_use]
    pub fn block_duration(&self) -> Duration {
        if self.poll_interval.is_zero() {
            return FALLBACK_BLOCK;
        }

        let margin = MAX_BLOCK_MARGIN.min(self.poll_interval / 2);
        self.poll_interval.saturating_sub(margin)
    }
}

impl Default for EventStreamConsumerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stream: "auth:events".to_owned(),
            group: "profile-service".to_owned(),
            consumer_name: "profile-service-1".to_owned(),
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            create_group_if_missing: true,
            group_start: GroupStart::Beginning,
            ack_policy: AckPolicy::Always,
        }
    }
}
