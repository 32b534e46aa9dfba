//! Consumer-group worker that drains the auth event stream and bootstraps
//! profiles on successful logins.
//!
//! The consumer moves between [`ConsumerState::Disconnected`] and
//! [`ConsumerState::Connected`]; a connection starts with its group
//! unprepared and any stream error during a poll drops back to
//! `Disconnected`. The next poll reconnects. Connection and group state live
//! behind one async mutex, so overlapping polls are serialized.

use std::sync::Arc;

use tokio::sync::Mutex;

use authstream_domain::StreamRecordId;

use crate::{EventStreamConnection, EventStreamConnector, ProfileBootstrapService};

mod config;
mod connection;
mod dispatch;
mod poll;

pub use config::{AckPolicy, EventStreamConsumerConfig};

/// Observable connection state of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// No open connection.
    Disconnected,
    /// Connection open.
    Connected {
        /// Whether the consumer group is known to exist.
        group_prepared: bool,
    },
}

/// Result of handling one delivered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The record triggered its side effect.
    Processed,
    /// The record needed no side effect.
    Skipped,
    /// The side effect failed.
    Failed(String),
}

/// Identifies one delivery for logging. Passed explicitly into handlers.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryContext<'a> {
    /// Stream key.
    pub stream: &'a str,
    /// Consumer group.
    pub group: &'a str,
    /// Consumer name.
    pub consumer: &'a str,
    /// Delivered record id.
    pub record_id: StreamRecordId,
}

/// Counters for one poll tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Records returned by the read.
    pub delivered: usize,
    /// Records whose side effect ran.
    pub processed: usize,
    /// Records that needed no side effect.
    pub skipped: usize,
    /// Records whose side effect failed.
    pub failed: usize,
    /// Records acknowledged successfully.
    pub acknowledged: usize,
}

impl PollSummary {
    fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Processed => self.processed += 1,
            MessageOutcome::Skipped => self.skipped += 1,
            MessageOutcome::Failed(_) => self.failed += 1,
        }
    }
}

struct StreamSession {
    connection: Box<dyn EventStreamConnection>,
    group_prepared: bool,
    /// Highest own-pending id already replayed; `None` once the backlog is drained.
    pending_after: Option<StreamRecordId>,
}

impl StreamSession {
    fn new(connection: Box<dyn EventStreamConnection>) -> Self {
        Self {
            connection,
            group_prepared: false,
            pending_after: Some(StreamRecordId::new(0, 0)),
        }
    }
}

/// Polls the auth event stream as one named consumer of a group.
pub struct AuthEventStreamConsumer {
    connector: Arc<dyn EventStreamConnector>,
    bootstrap_service: ProfileBootstrapService,
    config: EventStreamConsumerConfig,
    session: Mutex<Option<StreamSession>>,
}

impl AuthEventStreamConsumer {
    /// Creates a disconnected consumer.
    #[must_use]
    pub fn new(
        connector: Arc<dyn EventStreamConnector>,
        bootstrap_service: ProfileBootstrapService,
        config: EventStreamConsumerConfig,
    ) -> Self {
        Self {
            connector,
            bootstrap_service,
            config,
            session: Mutex::new(None),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &EventStreamConsumerConfig {
        &self.config
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConsumerState {
        match self.session.lock().await.as_ref() {
            Some(session) => ConsumerState::Connected {
                group_prepared: session.group_prepared,
            },
            None => ConsumerState::Disconnected,
        }
    }
}
