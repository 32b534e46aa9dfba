use std::sync::Arc;

use authstream_application::SecurityAuditService;
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub audit_service: SecurityAuditService,
    pub ingest_token: Arc<str>,
    pub postgres_pool: PgPool,
    /// Present when stream publishing is enabled.
    pub redis_client: Option<redis::Client>,
}
