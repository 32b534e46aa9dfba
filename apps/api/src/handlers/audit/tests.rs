use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use authstream_application::{
    AuthEventPublisher, EventStreamPublisherConfig, SecurityAuditRepository, SecurityAuditService,
};
use authstream_core::{AppError, AppResult};
use authstream_domain::{AuditEvent, AuditEventResult, AuditEventType};
use authstream_infrastructure::InMemoryEventStream;
use serde_json::{Map, Value, json};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;

use crate::dto::{
    LoginFailureRequest, LoginSuccessRequest, RecordAuditEventRequest, RequestContextDto,
};
use crate::state::AppState;

use super::{
    record_audit_event_handler, record_login_failure_handler, record_login_success_handler,
    request_metadata,
};

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
    fail: bool,
}

#[async_trait]
impl SecurityAuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: &AuditEvent) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("audit table unavailable".to_owned()));
        }

        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

fn test_state(repository: Arc<FakeAuditRepository>, stream: &InMemoryEventStream) -> AppState {
    let publisher = AuthEventPublisher::new(
        Arc::new(stream.clone()),
        EventStreamPublisherConfig::default(),
    );
    let Ok(postgres_pool) = PgPoolOptions::new().connect_lazy("postgres://localhost/unused") else {
        panic!("lazy pool should not connect");
    };

    AppState {
        audit_service: SecurityAuditService::new(repository, publisher),
        ingest_token: Arc::from("ingest-token-0123456789"),
        postgres_pool,
        redis_client: None,
    }
}

fn remote() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 40100)))
}

#[tokio::test]
async fn login_success_is_recorded_and_published() {
    let repository = Arc::new(FakeAuditRepository::default());
    let stream = InMemoryEventStream::new();
    let state = test_state(repository.clone(), &stream);

    let mut details = Map::new();
    details.insert("email".to_owned(), json!("alice@example.com"));
    let response = record_login_success_handler(
        State(state),
        remote(),
        HeaderMap::new(),
        Json(LoginSuccessRequest {
            principal: "alice".to_owned(),
            user_id: Some(42),
            details,
            request: RequestContextDto::default(),
        }),
    )
    .await;

    let Ok((status, Json(event))) = response else {
        panic!("login success should be recorded");
    };
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event.event_type(), AuditEventType::LoginSuccess);
    assert_eq!(event.ip_address(), Some("10.0.0.7"));
    assert_eq!(repository.events.lock().await.len(), 1);
    assert_eq!(stream.len("auth:events").await, 1);
}

#[tokio::test]
async fn login_failure_keeps_reason_and_forwarded_address() {
    let repository = Arc::new(FakeAuditRepository::default());
    let stream = InMemoryEventStream::new();
    let state = test_state(repository.clone(), &stream);
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
    );

    let response = record_login_failure_handler(
        State(state),
        remote(),
        headers,
        Json(LoginFailureRequest {
            principal: "mallory".to_owned(),
            reason: "bad credentials".to_owned(),
            details: Map::new(),
            request: RequestContextDto::default(),
        }),
    )
    .await;

    let Ok((_, Json(event))) = response else {
        panic!("login failure should be recorded");
    };
    assert_eq!(event.result(), Some(AuditEventResult::Failure));
    assert_eq!(event.ip_address(), Some("203.0.113.9"));
    assert_eq!(event.details(), Some(&json!({"error": "bad credentials"})));
}

#[tokio::test]
async fn unknown_event_type_is_a_validation_error() {
    let repository = Arc::new(FakeAuditRepository::default());
    let stream = InMemoryEventStream::new();
    let state = test_state(repository.clone(), &stream);

    let response = record_audit_event_handler(
        State(state),
        remote(),
        HeaderMap::new(),
        Json(RecordAuditEventRequest {
            event_type: "PASSWORD_SPRAYED".to_owned(),
            result: None,
            principal: Some("alice".to_owned()),
            principal_type: None,
            user_id: None,
            client_id: None,
            grant_type: None,
            token_type: None,
            scopes: None,
            authorization_code_id: None,
            details: None,
            request: RequestContextDto::default(),
        }),
    )
    .await;

    assert!(matches!(response, Err(ref error) if matches!(error.0, AppError::Validation(_))));
    assert!(repository.events.lock().await.is_empty());
    assert_eq!(stream.len("auth:events").await, 0);
}

#[tokio::test]
async fn failed_persistence_is_not_published() {
    let repository = Arc::new(FakeAuditRepository {
        fail: true,
        ..FakeAuditRepository::default()
    });
    let stream = InMemoryEventStream::new();
    let state = test_state(repository, &stream);

    let response = record_audit_event_handler(
        State(state),
        remote(),
        HeaderMap::new(),
        Json(RecordAuditEventRequest {
            event_type: "TOKEN_ISSUED".to_owned(),
            result: Some("SUCCESS".to_owned()),
            principal: Some("svc-reports".to_owned()),
            principal_type: Some("CLIENT".to_owned()),
            user_id: None,
            client_id: Some("reports".to_owned()),
            grant_type: Some("client_credentials".to_owned()),
            token_type: Some("access_token".to_owned()),
            scopes: Some("reports.read".to_owned()),
            authorization_code_id: None,
            details: Some(Value::Null),
            request: RequestContextDto::default(),
        }),
    )
    .await;

    assert!(matches!(response, Err(ref error) if matches!(error.0, AppError::Internal(_))));
    assert_eq!(stream.len("auth:events").await, 0);
}

#[test]
fn submitted_context_wins_over_ingest_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
    headers.insert("user-agent", HeaderValue::from_static("auth-server/1.0"));
    headers.insert("x-correlation-id", HeaderValue::from_static("corr-1"));

    let ConnectInfo(remote) = remote();
    let merged = request_metadata(
        &headers,
        remote,
        RequestContextDto {
            user_agent: Some("Mozilla/5.0".to_owned()),
            session_id: Some("sess-9".to_owned()),
            ..RequestContextDto::default()
        },
    );

    assert_eq!(merged.ip_address.as_deref(), Some("198.51.100.4"));
    assert_eq!(merged.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(merged.session_id.as_deref(), Some("sess-9"));
    assert_eq!(merged.correlation_id.as_deref(), Some("corr-1"));
}
