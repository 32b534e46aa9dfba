//! Ports onto the durable auth event stream.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use authstream_core::{AppError, AppResult};
use authstream_domain::{StreamFields, StreamRecord, StreamRecordId};

/// Where a newly created consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupStart {
    /// From the first record still in the stream.
    #[default]
    Beginning,
    /// Only records appended after the group exists.
    Latest,
}

impl GroupStart {
    /// Returns the configuration value of this start position.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginning => "beginning",
            Self::Latest => "latest",
        }
    }
}

impl FromStr for GroupStart {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginning" => Ok(Self::Beginning),
            "latest" => Ok(Self::Latest),
            other => Err(AppError::Validation(format!(
                "group start must be 'beginning' or 'latest', got '{other}'"
            ))),
        }
    }
}

/// Result of an idempotent consumer group creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCreation {
    /// The group was created by this call.
    Created,
    /// The group was already there. Treated as success.
    AlreadyExists,
}

/// Which entries a group read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCursor {
    /// Records never delivered to any consumer of the group.
    New,
    /// This consumer's own delivered-but-unacknowledged records with an id
    /// greater than the given one.
    OwnPendingAfter(StreamRecordId),
}

/// Parameters of one consumer group read.
#[derive(Debug, Clone, Copy)]
pub struct ReadGroupRequest<'a> {
    /// Stream key.
    pub stream: &'a str,
    /// Consumer group name.
    pub group: &'a str,
    /// Consumer name within the group.
    pub consumer: &'a str,
    /// Longest time to wait for new records.
    pub block: Duration,
    /// Maximum number of records returned.
    pub count: usize,
    /// Entries to read.
    pub cursor: ReadCursor,
}

/// Append side of the stream, used by publishers.
#[async_trait]
pub trait EventStreamAppender: Send + Sync {
    /// Appends one record and returns its log-assigned id.
    async fn append(&self, stream: &str, fields: &StreamFields) -> AppResult<StreamRecordId>;

    /// Trims the stream to approximately `max_length` records.
    async fn trim_approx(&self, stream: &str, max_length: u64) -> AppResult<()>;
}

/// Opens consumer connections to the stream.
#[async_trait]
pub trait EventStreamConnector: Send + Sync {
    /// Opens one connection.
    async fn connect(&self) -> AppResult<Box<dyn EventStreamConnection>>;
}

/// One open consumer connection.
#[async_trait]
pub trait EventStreamConnection: Send {
    /// Creates a consumer group. An existing group yields
    /// [`GroupCreation::AlreadyExists`], not an error.
    async fn create_group(
        &mut self,
        stream: &str,
        group: &str,
        start: GroupStart,
        create_stream: bool,
    ) -> AppResult<GroupCreation>;

    /// Reads a batch of records for one consumer of a group.
    async fn read_group(&mut self, request: ReadGroupRequest<'_>) -> AppResult<Vec<StreamRecord>>;

    /// Acknowledges one record for a group.
    async fn ack(&mut self, stream: &str, group: &str, record_id: StreamRecordId) -> AppResult<()>;

    /// Releases the connection. Further calls are not expected.
    async fn close(&mut self) -> AppResult<()>;
}
