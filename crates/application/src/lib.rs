//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_event_publisher;
mod auth_event_stream_consumer;
mod event_stream_ports;
mod profile_bootstrap_service;
mod profile_ports;
mod security_audit_service;

#[cfg(test)]
mod test_support;

pub use auth_event_publisher::{AuthEventPublisher, EventStreamPublisherConfig};
pub use auth_event_stream_consumer::{
    AckPolicy, AuthEventStreamConsumer, ConsumerState, DeliveryContext, EventStreamConsumerConfig,
    MessageOutcome, PollSummary,
};
pub use event_stream_ports::{
    EventStreamAppender, EventStreamConnection, EventStreamConnector, GroupCreation, GroupStart,
    ReadCursor, ReadGroupRequest,
};
pub use profile_bootstrap_service::{BootstrapOutcome, ProfileBootstrapService};
pub use profile_ports::{CreateProfileInput, ProfileRecord, ProfileStore};
pub use security_audit_service::{RequestMetadata, SecurityAuditRepository, SecurityAuditService};
