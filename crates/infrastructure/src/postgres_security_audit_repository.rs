use async_trait::async_trait;
use sqlx::PgPool;

use authstream_application::SecurityAuditRepository;
use authstream_core::{AppError, AppResult};
use authstream_domain::AuditEvent;

/// PostgreSQL-backed append-only security audit log.
#[derive(Clone)]
pub struct PostgresSecurityAuditRepository {
    pool: PgPool,
}

impl PostgresSecurityAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityAuditRepository for PostgresSecurityAuditRepository {
    async fn append_event(&self, event: &AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_audit_events (
                event_id,
                event_type,
                event_category,
                event_timestamp,
                principal,
                principal_type,
                user_id,
                client_id,
                result,
                grant_type,
                token_type,
                scopes,
                authorization_code_id,
                correlation_id,
                ip_address,
                user_agent,
                request_uri,
                request_method,
                session_id,
                details
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            "#,
        )
        .bind(event.event_id())
        .bind(event.event_type().as_str())
        .bind(event.event_category())
        .bind(event.event_timestamp())
        .bind(event.principal())
        .bind(event.principal_type())
        .bind(event.user_id())
        .bind(event.client_id())
        .bind(event.result().map(|result| result.as_str()))
        .bind(event.grant_type())
        .bind(event.token_type())
        .bind(event.scopes())
        .bind(event.authorization_code_id())
        .bind(event.correlation_id())
        .bind(event.ip_address())
        .bind(event.user_agent())
        .bind(event.request_uri())
        .bind(event.request_method())
        .bind(event.session_id())
        .bind(event.details())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to append security audit event: {error}"))
        })?;

        Ok(())
    }
}
