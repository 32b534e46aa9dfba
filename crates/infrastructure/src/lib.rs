//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_event_stream;
mod in_memory_profile_store;
mod postgres_profile_store;
mod postgres_security_audit_repository;
mod redis_event_stream;

pub use in_memory_event_stream::InMemoryEventStream;
pub use in_memory_profile_store::InMemoryProfileStore;
pub use postgres_profile_store::PostgresProfileStore;
pub use postgres_security_audit_repository::PostgresSecurityAuditRepository;
pub use redis_event_stream::{
    RedisEventStreamAppender, RedisEventStreamConnection, RedisEventStreamConnector,
};

/// Embedded SQL migrations for the profile and audit tables.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
