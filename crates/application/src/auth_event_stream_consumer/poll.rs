use tracing::{debug, warn};

use authstream_domain::StreamRecord;

use crate::{ReadCursor, ReadGroupRequest};

use super::{AuthEventStreamConsumer, DeliveryContext, MessageOutcome, PollSummary, StreamSession};

impl AuthEventStreamConsumer {
    /// Runs one poll tick: connect, prepare the group, read one batch, handle
    /// and acknowledge each record.
    ///
    /// Never fails. Stream errors are logged and close the connection so the
    /// next tick reconnects. A fresh connection first replays this consumer's
    /// own unacknowledged records before reading new ones.
    pub async fn poll_stream(&self) -> PollSummary {
        let mut summary = PollSummary::default();
        if !self.config.enabled {
            return summary;
        }

        let mut slot = self.session.lock().await;
        if !self.connect_if_needed(&mut slot).await {
            return summary;
        }

        let Some(session) = slot.as_mut() else {
            return summary;
        };

        if !self.prepare_group(session).await {
            return summary;
        }

        let records = match self.read_batch(session).await {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    stream = %self.config.stream,
                    group = %self.config.group,
                    error = %error,
                    "auth event stream polling failed"
                );
                self.close_session(&mut slot).await;
                return summary;
            }
        };

        summary.delivered = records.len();
        for record in &records {
            let context = DeliveryContext {
                stream: self.config.stream.as_str(),
                group: self.config.group.as_str(),
                consumer: self.config.consumer_name.as_str(),
                record_id: record.id,
            };

            let outcome = self.handle_record(context, record).await;
            summary.record(&outcome);

            if !self.config.ack_policy.should_ack(&outcome) {
                debug!(
                    stream = context.stream,
                    record_id = %context.record_id,
                    "leaving failed auth event pending"
                );
                continue;
            }

            match session
                .connection
                .ack(context.stream, context.group, context.record_id)
                .await
            {
                Ok(()) => summary.acknowledged += 1,
                Err(error) => {
                    warn!(
                        stream = context.stream,
                        record_id = %context.record_id,
                        error = %error,
                        "failed to acknowledge auth event"
                    );
                }
            }
        }

        summary
    }

    /// Reads the next batch, replaying own pending records until that backlog
    /// comes back empty and then switching to new records.
    async fn read_batch(
        &self,
        session: &mut StreamSession,
    ) -> authstream_core::AppResult<Vec<StreamRecord>> {
        loop {
            let cursor = match session.pending_after {
                Some(after) => ReadCursor::OwnPendingAfter(after),
                None => ReadCursor::New,
            };

            let records = session
                .connection
                .read_group(ReadGroupRequest {
                    stream: self.config.stream.as_str(),
                    group: self.config.group.as_str(),
                    consumer: self.config.consumer_name.as_str(),
                    block: self.config.block_duration(),
                    count: self.config.batch_size,
                    cursor,
                })
                .await?;

            if session.pending_after.is_none() {
                return Ok(records);
            }

            match records.iter().map(|record| record.id).max() {
                Some(last) => {
                    debug!(
                        stream = %self.config.stream,
                        replayed = records.len(),
                        "replaying pending auth events"
                    );
                    session.pending_after = Some(last);
                    return Ok(records);
                }
                None => session.pending_after = None,
            }
        }
    }

    async fn handle_record(
        &self,
        context: DeliveryContext<'_>,
        record: &StreamRecord,
    ) -> MessageOutcome {
        // Pending entries whose payload was trimmed out of the stream come back empty.
        if record.fields.is_empty() {
            debug!(
                stream = context.stream,
                record_id = %context.record_id,
                "auth event payload no longer in stream"
            );
            return MessageOutcome::Skipped;
        }

        self.handle_message(context, &record.fields).await
    }
}
