//! Process-local event stream with consumer groups, for tests and
//! single-process deployments.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use authstream_application::{
    EventStreamAppender, EventStreamConnection, EventStreamConnector, GroupCreation, GroupStart,
    ReadCursor, ReadGroupRequest,
};
use authstream_core::{AppError, AppResult};
use authstream_domain::{StreamFields, StreamRecord, StreamRecordId};

#[derive(Default)]
struct GroupLog {
    last_delivered: StreamRecordId,
    pending: BTreeMap<StreamRecordId, String>,
}

#[derive(Default)]
struct StreamLog {
    entries: Vec<StreamRecord>,
    groups: HashMap<String, GroupLog>,
}

#[derive(Default)]
struct StreamsState {
    streams: HashMap<String, StreamLog>,
    last_id: StreamRecordId,
}

impl StreamsState {
    fn next_id(&mut self) -> StreamRecordId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let next = if now > self.last_id.millis() {
            StreamRecordId::new(now, 0)
        } else {
            StreamRecordId::new(self.last_id.millis(), self.last_id.sequence() + 1)
        };
        self.last_id = next;
        next
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<StreamsState>,
    appended: Notify,
    unavailable: AtomicBool,
}

/// In-memory stream log shared by every handle cloned from it.
///
/// Trimming is exact rather than approximate. Group reads follow the Redis
/// model: new entries are delivered to one consumer and stay pending until
/// acknowledged.
#[derive(Clone, Default)]
pub struct InMemoryEventStream {
    shared: Arc<Shared>,
}

impl InMemoryEventStream {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the log going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.shared.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of entries currently held for a stream.
    pub async fn len(&self, stream: &str) -> usize {
        self.shared
            .state
            .lock()
            .await
            .streams
            .get(stream)
            .map_or(0, |log| log.entries.len())
    }

    /// Ids delivered to a group but not yet acknowledged.
    pub async fn pending(&self, stream: &str, group: &str) -> Vec<StreamRecordId> {
        self.shared
            .state
            .lock()
            .await
            .streams
            .get(stream)
            .and_then(|log| log.groups.get(group))
            .map(|group| group.pending.keys().copied().collect())
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> AppResult<()> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable(
                "in-memory event stream is unavailable".to_owned(),
            ));
        }

        Ok(())
    }

    async fn try_read(&self, request: &ReadGroupRequest<'_>) -> AppResult<Vec<StreamRecord>> {
        let mut state = self.shared.state.lock().await;
        let no_group = || {
            AppError::Internal(format!(
                "NOGROUP no consumer group '{}' on '{}'",
                request.group, request.stream
            ))
        };
        let log = state.streams.get_mut(request.stream).ok_or_else(no_group)?;
        let StreamLog { entries, groups } = log;
        let group = groups.get_mut(request.group).ok_or_else(no_group)?;

        match request.cursor {
            ReadCursor::New => {
                let batch: Vec<StreamRecord> = entries
                    .iter()
                    .filter(|record| record.id > group.last_delivered)
                    .take(request.count)
                    .cloned()
                    .collect();
                for record in &batch {
                    group.last_delivered = record.id;
                    group
                        .pending
                        .insert(record.id, request.consumer.to_owned());
                }
                Ok(batch)
            }
            ReadCursor::OwnPendingAfter(after) => Ok(group
                .pending
                .range(after..)
                .filter(|(id, owner)| **id > after && owner.as_str() == request.consumer)
                .take(request.count)
                .map(|(id, _)| {
                    let fields = entries
                        .iter()
                        .find(|record| record.id == *id)
                        .map(|record| record.fields.clone())
                        .unwrap_or_default();
                    StreamRecord::new(*id, fields)
                })
                .collect()),
        }
    }
}

#[async_trait]
impl EventStreamAppender for InMemoryEventStream {
    async fn append(&self, stream: &str, fields: &StreamFields) -> AppResult<StreamRecordId> {
        self.ensure_available()?;

        let id = {
            let mut state = self.shared.state.lock().await;
            let id = state.next_id();
            state
                .streams
                .entry(stream.to_owned())
                .or_default()
                .entries
                .push(StreamRecord::new(id, fields.clone()));
            id
        };

        self.shared.appended.notify_waiters();
        Ok(id)
    }

    async fn trim_approx(&self, stream: &str, max_length: u64) -> AppResult<()> {
        self.ensure_available()?;

        let max_length = usize::try_from(max_length).unwrap_or(usize::MAX);
        let mut state = self.shared.state.lock().await;
        if let Some(log) = state.streams.get_mut(stream)
            && log.entries.len() > max_length
        {
            let excess = log.entries.len() - max_length;
            log.entries.drain(..excess);
        }

        Ok(())
    }
}

#[async_trait]
impl EventStreamConnector for InMemoryEventStream {
    async fn connect(&self) -> AppResult<Box<dyn EventStreamConnection>> {
        self.ensure_available()?;

        Ok(Box::new(InMemoryEventStreamConnection {
            stream: self.clone(),
            closed: false,
        }))
    }
}

struct InMemoryEventStreamConnection {
    stream: InMemoryEventStream,
    closed: bool,
}

impl InMemoryEventStreamConnection {
    fn ensure_open(&self) -> AppResult<()> {
        if self.closed {
            return Err(AppError::Unavailable(
                "in-memory event stream connection is closed".to_owned(),
            ));
        }

        self.stream.ensure_available()
    }
}

#[async_trait]
impl EventStreamConnection for InMemoryEventStreamConnection {
    async fn create_group(
        &mut self,
        stream: &str,
        group: &str,
        start: GroupStart,
        create_stream: bool,
    ) -> AppResult<GroupCreation> {
        self.ensure_open()?;

        let mut state = self.stream.shared.state.lock().await;
        if !create_stream && !state.streams.contains_key(stream) {
            return Err(AppError::NotFound(format!("stream '{stream}' does not exist")));
        }

        let log = state.streams.entry(stream.to_owned()).or_default();
        if log.groups.contains_key(group) {
            return Ok(GroupCreation::AlreadyExists);
        }

        let last_delivered = match start {
            GroupStart::Beginning => StreamRecordId::default(),
            GroupStart::Latest => log
                .entries
                .last()
                .map(|record| record.id)
                .unwrap_or_default(),
        };
        log.groups.insert(
            group.to_owned(),
            GroupLog {
                last_delivered,
                pending: BTreeMap::new(),
            },
        );

        Ok(GroupCreation::Created)
    }

    async fn read_group(&mut self, request: ReadGroupRequest<'_>) -> AppResult<Vec<StreamRecord>> {
        self.ensure_open()?;

        if matches!(request.cursor, ReadCursor::OwnPendingAfter(_)) {
            return self.stream.try_read(&request).await;
        }

        let deadline = Instant::now() + request.block;
        loop {
            let appended = self.stream.shared.appended.notified();
            tokio::pin!(appended);
            appended.as_mut().enable();

            let batch = self.stream.try_read(&request).await?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline
                || tokio::time::timeout(deadline - now, appended).await.is_err()
            {
                return Ok(batch);
            }
            self.ensure_open()?;
        }
    }

    async fn ack(&mut self, stream: &str, group: &str, record_id: StreamRecordId) -> AppResult<()> {
        self.ensure_open()?;

        let mut state = self.stream.shared.state.lock().await;
        if let Some(group) = state
            .streams
            .get_mut(stream)
            .and_then(|log| log.groups.get_mut(group))
        {
            group.pending.remove(&record_id);
        }

        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
