use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use authstream_core::{AppError, AppResult};
use authstream_domain::{AuditEvent, AuditEventResult, AuditEventType, field};

use crate::test_support::RecordingAppender;
use crate::{AuthEventPublisher, EventStreamPublisherConfig};

use super::{RequestMetadata, SecurityAuditRepository, SecurityAuditService};

#[derive(Default)]
struct FakeSecurityAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
    fail: bool,
}

#[async_trait]
impl SecurityAuditRepository for FakeSecurityAuditRepository {
    async fn append_event(&self, event: &AuditEvent) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("audit table unavailable".to_owned()));
        }

        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

fn service(
    repository: Arc<FakeSecurityAuditRepository>,
    appender: Arc<RecordingAppender>,
) -> SecurityAuditService {
    SecurityAuditService::new(
        repository,
        AuthEventPublisher::new(appender, EventStreamPublisherConfig::default()),
    )
}

fn request() -> RequestMetadata {
    RequestMetadata {
        ip_address: Some("203.0.113.7".to_owned()),
        user_agent: Some("curl/8.5".to_owned()),
        request_uri: Some("/login".to_owned()),
        request_method: Some("POST".to_owned()),
        ..RequestMetadata::default()
    }
}

fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn login_success_is_persisted_then_published() {
    let repository = Arc::new(FakeSecurityAuditRepository::default());
    let appender = Arc::new(RecordingAppender::default());
    let service = service(repository.clone(), appender.clone());

    let recorded = service
        .record_login_success(
            "alice",
            Some(42),
            request(),
            details(json!({"email": "alice@example.com"})),
        )
        .await;

    let Ok(event) = recorded else {
        panic!("login success should be recorded");
    };
    assert_eq!(event.event_type(), AuditEventType::LoginSuccess);
    assert_eq!(event.result(), Some(AuditEventResult::Success));
    assert_eq!(event.principal_type(), Some("USER"));
    assert_eq!(event.ip_address(), Some("203.0.113.7"));
    assert_eq!(repository.events.lock().await.len(), 1);

    let appended = appender.appended.lock().await;
    assert_eq!(appended.len(), 1);
    let fields = &appended[0].1;
    assert_eq!(fields.get(field::PRINCIPAL).map(String::as_str), Some("alice"));
    assert_eq!(fields.get(field::USER_ID).map(String::as_str), Some("42"));
    assert_eq!(
        fields.get(field::EVENT_ID),
        Some(&event.event_id().to_string())
    );
}

#[tokio::test]
async fn persistence_failure_propagates_and_skips_publishing() {
    let repository = Arc::new(FakeSecurityAuditRepository {
        fail: true,
        ..FakeSecurityAuditRepository::default()
    });
    let appender = Arc::new(RecordingAppender::default());
    let service = service(repository, appender.clone());

    let recorded = service
        .record_login_success("alice", None, request(), Map::new())
        .await;

    assert!(matches!(recorded, Err(AppError::Internal(_))));
    assert!(appender.appended.lock().await.is_empty());
}

#[tokio::test]
async fn publish_failure_does_not_fail_recording() {
    let repository = Arc::new(FakeSecurityAuditRepository::default());
    let appender = Arc::new(RecordingAppender {
        fail_append: true,
        ..RecordingAppender::default()
    });
    let service = service(repository.clone(), appender);

    let recorded = service
        .record_login_failure("mallory", "bad credentials", request(), Map::new())
        .await;

    let Ok(event) = recorded else {
        panic!("login failure should be recorded");
    };
    assert_eq!(event.event_type(), AuditEventType::LoginFailure);
    assert_eq!(event.result(), Some(AuditEventResult::Failure));
    assert_eq!(event.details(), Some(&json!({"error": "bad credentials"})));
    assert_eq!(repository.events.lock().await.len(), 1);
}

#[tokio::test]
async fn federated_login_records_provider_detail() {
    let repository = Arc::new(FakeSecurityAuditRepository::default());
    let appender = Arc::new(RecordingAppender::default());
    let service = service(repository, appender.clone());

    let recorded = service
        .record_federated_login_success(
            "github:grace",
            "github",
            None,
            RequestMetadata::default(),
            details(json!({"avatar_url": "https://img/grace"})),
        )
        .await;

    let Ok(event) = recorded else {
        panic!("federated login should be recorded");
    };
    assert_eq!(event.principal_type(), Some("FEDERATED_USER"));
    assert_eq!(
        event.details(),
        Some(&json!({"avatar_url": "https://img/grace", "provider": "github"}))
    );

    let appended = appender.appended.lock().await;
    let fields = &appended[0].1;
    assert_eq!(
        fields.get(field::EVENT_TYPE).map(String::as_str),
        Some("FEDERATED_LOGIN_SUCCESS")
    );
    assert!(!fields.contains_key(field::IP_ADDRESS));
}

#[tokio::test]
async fn empty_details_are_left_out() {
    let repository = Arc::new(FakeSecurityAuditRepository::default());
    let appender = Arc::new(RecordingAppender::default());
    let service = service(repository, appender.clone());

    let recorded = service
        .record_login_success("alice", None, RequestMetadata::default(), Map::new())
        .await;

    assert!(recorded.is_ok_and(|event| event.details().is_none()));
    assert!(!appender.appended.lock().await[0].1.contains_key(field::DETAILS));
}

#[test]
fn client_ip_prefers_first_forwarded_hop() {
    assert_eq!(
        RequestMetadata::client_ip(
            Some(" 198.51.100.1 , 10.0.0.1"),
            Some("10.0.0.2"),
            Some("10.0.0.3")
        ),
        Some("198.51.100.1".to_owned())
    );
    assert_eq!(
        RequestMetadata::client_ip(Some(""), Some("10.0.0.2"), Some("10.0.0.3")),
        Some("10.0.0.2".to_owned())
    );
    assert_eq!(
        RequestMetadata::client_ip(None, None, Some("10.0.0.3")),
        Some("10.0.0.3".to_owned())
    );
    assert_eq!(RequestMetadata::client_ip(None, None, None), None);
}
