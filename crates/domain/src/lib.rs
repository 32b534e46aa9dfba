//! Domain types for the auth event stream: audit events, their stream wire
//! form and the views consumers derive from them.

#![forbid(unsafe_code)]

mod audit_event;
mod auth_activity;
mod profile_seed;
mod stream;

pub use audit_event::{
    AuditEvent, AuditEventCategory, AuditEventInput, AuditEventResult, AuditEventType,
};
pub use auth_activity::AuthActivityEvent;
pub use profile_seed::ProfileBootstrapSeed;
pub use stream::{StreamFields, StreamRecord, StreamRecordId, field};
