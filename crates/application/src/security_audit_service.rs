use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error};

use authstream_core::AppResult;
use authstream_domain::{AuditEvent, AuditEventInput, AuditEventResult, AuditEventType};

use crate::AuthEventPublisher;

const USER_PRINCIPAL: &str = "USER";
const FEDERATED_USER_PRINCIPAL: &str = "FEDERATED_USER";

/// Port for the authoritative, append-only security audit log.
#[async_trait]
pub trait SecurityAuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: &AuditEvent) -> AppResult<()>;
}

/// Request attributes copied onto recorded events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
    /// Request path.
    pub request_uri: Option<String>,
    /// Request method.
    pub request_method: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Correlation identifier.
    pub correlation_id: Option<String>,
}

impl RequestMetadata {
    /// Resolves the client address: the first `X-Forwarded-For` hop, then
    /// `X-Real-IP`, then the socket peer.
    #[must_use]
    pub fn client_ip(
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
        remote_addr: Option<&str>,
    ) -> Option<String> {
        forwarded_for
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| real_ip.map(str::trim).filter(|value| !value.is_empty()))
            .or(remote_addr)
            .map(str::to_owned)
    }
}

/// Records security events in the audit log and forwards them to the stream.
#[derive(Clone)]
pub struct SecurityAuditService {
    repository: Arc<dyn SecurityAuditRepository>,
    publisher: AuthEventPublisher,
}

impl SecurityAuditService {
    /// Creates a new audit service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SecurityAuditRepository>,
        publisher: AuthEventPublisher,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Persists an event, then publishes it. Persistence errors propagate;
    /// publishing never fails the caller.
    pub async fn record_event(&self, event: AuditEvent) -> AppResult<AuditEvent> {
        if let Err(error) = self.repository.append_event(&event).await {
            error!(
                event_id = %event.event_id(),
                event_type = event.event_type().as_str(),
                error = %error,
                "failed to record audit event"
            );
            return Err(error);
        }

        debug!(
            event_type = event.event_type().as_str(),
            principal = event.principal().unwrap_or_default(),
            result = event.result().map(|result| result.as_str()).unwrap_or_default(),
            "recorded audit event"
        );

        self.publisher.publish(&event).await;
        Ok(event)
    }

    /// Records a successful interactive login.
    pub async fn record_login_success(
        &self,
        principal: &str,
        user_id: Option<i64>,
        request: RequestMetadata,
        details: Map<String, Value>,
    ) -> AppResult<AuditEvent> {
        let mut input = base_input(
            AuditEventType::LoginSuccess,
            AuditEventResult::Success,
            request,
        );
        input.principal = Some(principal.to_owned());
        input.principal_type = Some(USER_PRINCIPAL.to_owned());
        input.user_id = user_id;
        input.details = details_value(details);

        self.record_event(AuditEvent::new(input)?).await
    }

    /// Records a failed interactive login. The reason is kept under the
    /// `error` detail.
    pub async fn record_login_failure(
        &self,
        principal: &str,
        reason: &str,
        request: RequestMetadata,
        mut details: Map<String, Value>,
    ) -> AppResult<AuditEvent> {
        let mut input = base_input(
            AuditEventType::LoginFailure,
            AuditEventResult::Failure,
            request,
        );
        input.principal = Some(principal.to_owned());
        input.principal_type = Some(USER_PRINCIPAL.to_owned());
        details.insert("error".to_owned(), Value::String(reason.to_owned()));
        input.details = details_value(details);

        self.record_event(AuditEvent::new(input)?).await
    }

    /// Records a successful login through an external identity provider.
    pub async fn record_federated_login_success(
        &self,
        principal: &str,
        provider: &str,
        user_id: Option<i64>,
        request: RequestMetadata,
        mut details: Map<String, Value>,
    ) -> AppResult<AuditEvent> {
        let mut input = base_input(
            AuditEventType::FederatedLoginSuccess,
            AuditEventResult::Success,
            request,
        );
        input.principal = Some(principal.to_owned());
        input.principal_type = Some(FEDERATED_USER_PRINCIPAL.to_owned());
        input.user_id = user_id;
        details.insert("provider".to_owned(), Value::String(provider.to_owned()));
        input.details = details_value(details);

        self.record_event(AuditEvent::new(input)?).await
    }
}

fn base_input(
    event_type: AuditEventType,
    result: AuditEventResult,
    request: RequestMetadata,
) -> AuditEventInput {
    AuditEventInput {
        event_type: Some(event_type),
        result: Some(result),
        ip_address: request.ip_address,
        user_agent: request.user_agent,
        request_uri: request.request_uri,
        request_method: request.request_method,
        session_id: request.session_id,
        correlation_id: request.correlation_id,
        ..AuditEventInput::default()
    }
}

fn details_value(details: Map<String, Value>) -> Option<Value> {
    if details.is_empty() {
        None
    } else {
        Some(Value::Object(details))
    }
}

#[cfg(test)]
mod tests;
