//! Redis stream adapters for publishing and consuming auth events.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, AsyncConnectionConfig};
use tokio::sync::Mutex;

use authstream_application::{
    EventStreamAppender, EventStreamConnection, EventStreamConnector, GroupCreation, GroupStart,
    ReadCursor, ReadGroupRequest,
};
use authstream_core::{AppError, AppResult};
use authstream_domain::{StreamFields, StreamRecord, StreamRecordId};

const NEW_ENTRIES_ID: &str = ">";
const BUSYGROUP: &str = "BUSYGROUP";
/// Extra time a blocking read may take on the wire beyond its block duration.
const RESPONSE_TIMEOUT_SLACK: Duration = Duration::from_secs(2);

/// Appends events with `XADD` and trims with `XTRIM MAXLEN ~`.
///
/// One multiplexed connection is cached and replaced after a failure.
pub struct RedisEventStreamAppender {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisEventStreamAppender {
    /// Creates an appender. No connection is opened until the first append.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            connection: Mutex::new(None),
        }
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        let mut cached = self.connection.lock().await;
        if let Some(connection) = cached.as_ref() {
            return Ok(connection.clone());
        }

        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Unavailable(format!("failed to connect to redis: {error}")))?;
        *cached = Some(connection.clone());
        Ok(connection)
    }

    async fn discard_connection(&self) {
        self.connection.lock().await.take();
    }
}

#[async_trait]
impl EventStreamAppender for RedisEventStreamAppender {
    async fn append(&self, stream: &str, fields: &StreamFields) -> AppResult<StreamRecordId> {
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let mut connection = self.connection().await?;

        let record_id: String = match connection.xadd(stream, "*", &items).await {
            Ok(record_id) => record_id,
            Err(error) => {
                self.discard_connection().await;
                return Err(AppError::Internal(format!(
                    "failed to append to stream '{stream}': {error}"
                )));
            }
        };

        record_id.parse()
    }

    async fn trim_approx(&self, stream: &str, max_length: u64) -> AppResult<()> {
        let max_length = usize::try_from(max_length).unwrap_or(usize::MAX);
        let mut connection = self.connection().await?;

        if let Err(error) = connection
            .xtrim::<_, i64>(stream, StreamMaxlen::Approx(max_length))
            .await
        {
            self.discard_connection().await;
            return Err(AppError::Internal(format!(
                "failed to trim stream '{stream}': {error}"
            )));
        }

        Ok(())
    }
}

/// Opens dedicated consumer connections whose response timeout outlasts a
/// blocking read.
#[derive(Clone)]
pub struct RedisEventStreamConnector {
    client: redis::Client,
    response_timeout: Duration,
}

impl RedisEventStreamConnector {
    /// Creates a connector for reads that block up to `block_duration`.
    #[must_use]
    pub fn new(client: redis::Client, block_duration: Duration) -> Self {
        Self {
            client,
            response_timeout: block_duration + RESPONSE_TIMEOUT_SLACK,
        }
    }
}

#[async_trait]
impl EventStreamConnector for RedisEventStreamConnector {
    async fn connect(&self) -> AppResult<Box<dyn EventStreamConnection>> {
        let config =
            AsyncConnectionConfig::new().set_response_timeout(Some(self.response_timeout));
        let connection = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(|error| AppError::Unavailable(format!("failed to connect to redis: {error}")))?;

        Ok(Box::new(RedisEventStreamConnection {
            connection: Some(connection),
        }))
    }
}

/// One consumer connection.
pub struct RedisEventStreamConnection {
    connection: Option<MultiplexedConnection>,
}

impl RedisEventStreamConnection {
    fn connection(&mut self) -> AppResult<&mut MultiplexedConnection> {
        self.connection
            .as_mut()
            .ok_or_else(|| AppError::Unavailable("redis stream connection is closed".to_owned()))
    }
}

#[async_trait]
impl EventStreamConnection for RedisEventStreamConnection {
    async fn create_group(
        &mut self,
        stream: &str,
        group: &str,
        start: GroupStart,
        create_stream: bool,
    ) -> AppResult<GroupCreation> {
        let start_id = match start {
            GroupStart::Beginning => "0-0",
            GroupStart::Latest => "$",
        };
        let connection = self.connection()?;

        let created = if create_stream {
            connection
                .xgroup_create_mkstream::<_, _, _, ()>(stream, group, start_id)
                .await
        } else {
            connection
                .xgroup_create::<_, _, _, ()>(stream, group, start_id)
                .await
        };

        match created {
            Ok(()) => Ok(GroupCreation::Created),
            Err(error) if is_busy_group(&error) => Ok(GroupCreation::AlreadyExists),
            Err(error) => Err(AppError::Internal(format!(
                "failed to create consumer group '{group}' on '{stream}': {error}"
            ))),
        }
    }

    async fn read_group(&mut self, request: ReadGroupRequest<'_>) -> AppResult<Vec<StreamRecord>> {
        let mut options = StreamReadOptions::default()
            .group(request.group, request.consumer)
            .count(request.count);

        // Own-pending reads never block in Redis; only new-entry reads wait.
        let start_id = match request.cursor {
            ReadCursor::New => {
                let block_millis = usize::try_from(request.block.as_millis()).unwrap_or(usize::MAX);
                options = options.block(block_millis);
                NEW_ENTRIES_ID.to_owned()
            }
            ReadCursor::OwnPendingAfter(after) => after.to_string(),
        };

        let reply: Option<StreamReadReply> = self
            .connection()?
            .xread_options(&[request.stream], &[start_id.as_str()], &options)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to read group '{}' on '{}': {error}",
                    request.group, request.stream
                ))
            })?;

        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        reply
            .keys
            .into_iter()
            .filter(|key| key.key == request.stream)
            .flat_map(|key| key.ids)
            .map(|entry| stream_record(&entry))
            .collect()
    }

    async fn ack(&mut self, stream: &str, group: &str, record_id: StreamRecordId) -> AppResult<()> {
        let id = record_id.to_string();
        self.connection()?
            .xack::<_, _, _, i64>(stream, group, &[id.as_str()])
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to acknowledge '{id}' on '{stream}': {error}"
                ))
            })?;

        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        // Dropping the multiplexed handle closes the socket once no clone remains.
        self.connection.take();
        Ok(())
    }
}

fn is_busy_group(error: &redis::RedisError) -> bool {
    error.code() == Some(BUSYGROUP) || error.to_string().contains(BUSYGROUP)
}

fn stream_record(entry: &StreamId) -> AppResult<StreamRecord> {
    let id = entry.id.parse::<StreamRecordId>()?;
    let fields = entry
        .map
        .keys()
        .filter_map(|key| {
            entry
                .get::<String>(key.as_str())
                .map(|value| (key.clone(), value))
        })
        .collect();

    Ok(StreamRecord::new(id, fields))
}
