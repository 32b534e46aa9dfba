use tracing::{debug, info, warn};

use authstream_domain::{AuthActivityEvent, StreamFields};

use crate::BootstrapOutcome;

use super::{AuthEventStreamConsumer, DeliveryContext, MessageOutcome};

impl AuthEventStreamConsumer {
    /// Decodes one record and bootstraps a profile when it is a successful login.
    pub async fn handle_message(
        &self,
        context: DeliveryContext<'_>,
        fields: &StreamFields,
    ) -> MessageOutcome {
        let event = AuthActivityEvent::from_stream_fields(fields);
        if !event.is_login_success() {
            return MessageOutcome::Skipped;
        }

        match self.bootstrap_service.bootstrap_from_activity(&event).await {
            Ok(BootstrapOutcome::Created(profile)) => {
                info!(
                    stream = context.stream,
                    record_id = %context.record_id,
                    subject = %profile.subject,
                    event_type = event.event_type.as_deref().unwrap_or_default(),
                    "created profile from auth event"
                );
                MessageOutcome::Processed
            }
            Ok(BootstrapOutcome::AlreadyExists) => MessageOutcome::Skipped,
            Ok(BootstrapOutcome::MissingPrincipal) => {
                debug!(
                    stream = context.stream,
                    record_id = %context.record_id,
                    "login event without principal"
                );
                MessageOutcome::Skipped
            }
            Err(error) => {
                warn!(
                    stream = context.stream,
                    group = context.group,
                    consumer = context.consumer,
                    record_id = %context.record_id,
                    error = %error,
                    "failed to process auth event"
                );
                MessageOutcome::Failed(error.to_string())
            }
        }
    }
}
