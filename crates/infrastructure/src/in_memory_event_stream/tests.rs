use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use authstream_application::{
    AuthEventPublisher, AuthEventStreamConsumer, EventStreamAppender, EventStreamConnection,
    EventStreamConnector, EventStreamConsumerConfig, EventStreamPublisherConfig, GroupCreation,
    GroupStart, ProfileBootstrapService, ReadCursor, ReadGroupRequest,
};
use authstream_domain::{
    AuditEvent, AuditEventInput, AuditEventType, StreamFields, StreamRecordId,
};

use crate::InMemoryProfileStore;

use super::InMemoryEventStream;

const STREAM: &str = "auth:events";
const GROUP: &str = "profile-service";

fn fields(principal: &str) -> StreamFields {
    [
        ("eventType".to_owned(), "LOGIN_SUCCESS".to_owned()),
        ("principal".to_owned(), principal.to_owned()),
    ]
    .into_iter()
    .collect()
}

fn read(consumer: &str, cursor: ReadCursor, block: Duration) -> ReadGroupRequest<'_> {
    ReadGroupRequest {
        stream: STREAM,
        group: GROUP,
        consumer,
        block,
        count: 10,
        cursor,
    }
}

async fn connected(stream: &InMemoryEventStream) -> Box<dyn EventStreamConnection> {
    let Ok(mut connection) = stream.connect().await else {
        panic!("in-memory stream should accept connections");
    };
    let created = connection
        .create_group(STREAM, GROUP, GroupStart::Beginning, true)
        .await;
    assert!(created.is_ok());
    connection
}

#[tokio::test]
async fn ids_increase_monotonically() {
    let stream = InMemoryEventStream::new();
    let mut previous = StreamRecordId::default();

    for index in 0..50 {
        let appended = stream
            .append(STREAM, &fields(format!("user-{index}").as_str()))
            .await;
        let Ok(id) = appended else {
            panic!("append should succeed");
        };
        assert!(id > previous);
        previous = id;
    }
}

#[tokio::test]
async fn group_creation_reports_existing_group() {
    let stream = InMemoryEventStream::new();
    let mut connection = connected(&stream).await;

    let again = connection
        .create_group(STREAM, GROUP, GroupStart::Beginning, true)
        .await;

    assert!(matches!(again, Ok(GroupCreation::AlreadyExists)));
}

#[tokio::test]
async fn consumers_in_one_group_split_the_entries() {
    let stream = InMemoryEventStream::new();
    for index in 0..4 {
        assert!(stream
            .append(STREAM, &fields(format!("user-{index}").as_str()))
            .await
            .is_ok());
    }
    let mut first = connected(&stream).await;
    let mut second = connected(&stream).await;

    let mut request = read("a", ReadCursor::New, Duration::ZERO);
    request.count = 2;
    let first_batch = first.read_group(request).await.unwrap_or_default();
    let second_batch = second
        .read_group(read("b", ReadCursor::New, Duration::ZERO))
        .await
        .unwrap_or_default();

    let first_ids: BTreeSet<_> = first_batch.iter().map(|record| record.id).collect();
    let second_ids: BTreeSet<_> = second_batch.iter().map(|record| record.id).collect();
    assert_eq!(first_ids.len(), 2);
    assert_eq!(second_ids.len(), 2);
    assert!(first_ids.is_disjoint(&second_ids));
    assert_eq!(stream.pending(STREAM, GROUP).await.len(), 4);
}

#[tokio::test]
async fn pending_entries_belong_to_their_consumer() {
    let stream = InMemoryEventStream::new();
    let mut connection = connected(&stream).await;
    assert!(stream.append(STREAM, &fields("alice")).await.is_ok());

    let delivered = connection
        .read_group(read("a", ReadCursor::New, Duration::ZERO))
        .await
        .unwrap_or_default();
    assert_eq!(delivered.len(), 1);

    let pending_for_a = connection
        .read_group(read(
            "a",
            ReadCursor::OwnPendingAfter(StreamRecordId::default()),
            Duration::ZERO,
        ))
        .await
        .unwrap_or_default();
    let pending_for_b = connection
        .read_group(read(
            "b",
            ReadCursor::OwnPendingAfter(StreamRecordId::default()),
            Duration::ZERO,
        ))
        .await
        .unwrap_or_default();
    assert_eq!(pending_for_a.len(), 1);
    assert!(pending_for_b.is_empty());

    assert!(connection.ack(STREAM, GROUP, delivered[0].id).await.is_ok());
    assert!(stream.pending(STREAM, GROUP).await.is_empty());
}

#[tokio::test]
async fn blocking_read_wakes_on_append() {
    let stream = InMemoryEventStream::new();
    let mut connection = connected(&stream).await;
    let appender = stream.clone();

    let append = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        appender.append(STREAM, &fields("late")).await
    });
    let started = std::time::Instant::now();
    let delivered = connection
        .read_group(read("a", ReadCursor::New, Duration::from_secs(5)))
        .await
        .unwrap_or_default();

    assert_eq!(delivered.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(append.await, Ok(Ok(_))));
}

#[tokio::test]
async fn trimmed_pending_entry_comes_back_without_fields() {
    let stream = InMemoryEventStream::new();
    let mut connection = connected(&stream).await;
    assert!(stream.append(STREAM, &fields("alice")).await.is_ok());
    let delivered = connection
        .read_group(read("a", ReadCursor::New, Duration::ZERO))
        .await
        .unwrap_or_default();

    for index in 0..5 {
        assert!(stream
            .append(STREAM, &fields(format!("user-{index}").as_str()))
            .await
            .is_ok());
    }
    assert!(stream.trim_approx(STREAM, 3).await.is_ok());
    assert_eq!(stream.len(STREAM).await, 3);

    let pending = connection
        .read_group(read(
            "a",
            ReadCursor::OwnPendingAfter(StreamRecordId::default()),
            Duration::ZERO,
        ))
        .await
        .unwrap_or_default();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, delivered[0].id);
    assert!(pending[0].fields.is_empty());
}

#[tokio::test]
async fn unavailable_stream_rejects_connections_and_appends() {
    let stream = InMemoryEventStream::new();
    let mut connection = connected(&stream).await;
    stream.set_available(false);

    assert!(stream.connect().await.is_err());
    assert!(stream.append(STREAM, &fields("alice")).await.is_err());
    assert!(connection
        .read_group(read("a", ReadCursor::New, Duration::ZERO))
        .await
        .is_err());

    stream.set_available(true);
    assert!(stream.append(STREAM, &fields("alice")).await.is_ok());
}

#[tokio::test]
async fn published_login_bootstraps_a_profile_end_to_end() {
    let stream = InMemoryEventStream::new();
    let store = Arc::new(InMemoryProfileStore::new());
    let publisher = AuthEventPublisher::new(
        Arc::new(stream.clone()),
        EventStreamPublisherConfig::default(),
    );
    let consumer = AuthEventStreamConsumer::new(
        Arc::new(stream.clone()),
        ProfileBootstrapService::new(store.clone()),
        EventStreamConsumerConfig {
            poll_interval: Duration::from_millis(200),
            ..EventStreamConsumerConfig::default()
        },
    );

    let event = AuditEvent::new(AuditEventInput {
        event_type: Some(AuditEventType::LoginSuccess),
        principal: Some("alice".to_owned()),
        user_id: Some(42),
        details: Some(json!({"email": "alice@example.com", "name": "Alice"})),
        ..AuditEventInput::default()
    });
    let Ok(event) = event else {
        panic!("login event should build");
    };

    assert!(consumer.ensure_connection().await);
    assert!(consumer.ensure_group().await);
    publisher.publish(&event).await;
    let summary = consumer.poll_stream().await;
    consumer.shutdown().await;

    assert_eq!(summary.processed, 1);
    let Some(profile) = store.find("alice").await else {
        panic!("profile should have been created");
    };
    assert_eq!(profile.user_id, Some(42));
    assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
    assert!(stream.pending(STREAM, GROUP).await.is_empty());
}
