//! Best-effort publisher of audit events onto the auth event stream.
//!
//! Publishing is at-most-once: a failed or timed-out append drops the event
//! with a warning. There is no retry and no local buffer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use authstream_core::{AppError, AppResult};
use authstream_domain::AuditEvent;

use crate::EventStreamAppender;

mod config;

pub use config::EventStreamPublisherConfig;

/// Appends audit events to the configured stream without ever failing the caller.
#[derive(Clone)]
pub struct AuthEventPublisher {
    appender: Arc<dyn EventStreamAppender>,
    config: EventStreamPublisherConfig,
}

impl AuthEventPublisher {
    /// Creates a publisher over an appender implementation.
    #[must_use]
    pub fn new(appender: Arc<dyn EventStreamAppender>, config: EventStreamPublisherConfig) -> Self {
        Self { appender, config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &EventStreamPublisherConfig {
        &self.config
    }

    /// Publishes one event. Failures are logged and swallowed.
    pub async fn publish(&self, event: &AuditEvent) {
        if !self.config.enabled {
            return;
        }

        let stream = self.config.stream_name.as_str();
        let fields = event.to_stream_fields();

        let record_id = match bounded(
            self.config.append_timeout,
            "append",
            self.appender.append(stream, &fields),
        )
        .await
        {
            Ok(record_id) => record_id,
            Err(error) => {
                warn!(
                    event_id = %event.event_id(),
                    event_type = event.event_type().as_str(),
                    stream,
                    error = %error,
                    "failed to publish auth event"
                );
                return;
            }
        };

        if let Some(max_length) = self.config.trim_length()
            && let Err(error) = bounded(
                self.config.append_timeout,
                "trim",
                self.appender.trim_approx(stream, max_length),
            )
            .await
        {
            warn!(
                stream,
                max_length,
                error = %error,
                "failed to trim auth event stream"
            );
        }

        debug!(
            event_id = %event.event_id(),
            event_type = event.event_type().as_str(),
            stream,
            record_id = %record_id,
            "published auth event"
        );
    }
}

async fn bounded<T>(
    limit: Duration,
    operation: &str,
    future: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::time::timeout(limit, future).await.map_err(|_| {
        AppError::Unavailable(format!(
            "auth event stream {operation} timed out after {} ms",
            limit.as_millis()
        ))
    })?
}
