use tracing::{debug, info, warn};

use crate::GroupCreation;

use super::{AuthEventStreamConsumer, StreamSession};

impl AuthEventStreamConsumer {
    /// Opens a connection when none is open. Returns whether one is available.
    pub async fn ensure_connection(&self) -> bool {
        let mut slot = self.session.lock().await;
        self.connect_if_needed(&mut slot).await
    }

    /// Creates the consumer group when it is not yet known to exist.
    /// Returns whether the group is prepared.
    pub async fn ensure_group(&self) -> bool {
        let mut slot = self.session.lock().await;
        match slot.as_mut() {
            Some(session) => self.prepare_group(session).await,
            None => false,
        }
    }

    /// Closes the open connection, if any.
    pub async fn shutdown(&self) {
        let mut slot = self.session.lock().await;
        self.close_session(&mut slot).await;
    }

    pub(super) async fn connect_if_needed(&self, slot: &mut Option<StreamSession>) -> bool {
        if slot.is_some() {
            return true;
        }

        match self.connector.connect().await {
            Ok(connection) => {
                *slot = Some(StreamSession::new(connection));
                info!(
                    stream = %self.config.stream,
                    group = %self.config.group,
                    consumer = %self.config.consumer_name,
                    "connected to auth event stream"
                );
                true
            }
            Err(error) => {
                debug!(
                    stream = %self.config.stream,
                    error = %error,
                    "auth event stream connection unavailable"
                );
                false
            }
        }
    }

    pub(super) async fn prepare_group(&self, session: &mut StreamSession) -> bool {
        if session.group_prepared {
            return true;
        }

        if !self.config.create_group_if_missing {
            session.group_prepared = true;
            return true;
        }

        match session
            .connection
            .create_group(
                self.config.stream.as_str(),
                self.config.group.as_str(),
                self.config.group_start,
                true,
            )
            .await
        {
            Ok(GroupCreation::Created) => {
                info!(
                    stream = %self.config.stream,
                    group = %self.config.group,
                    start = self.config.group_start.as_str(),
                    "created auth event consumer group"
                );
                session.group_prepared = true;
            }
            Ok(GroupCreation::AlreadyExists) => {
                debug!(
                    stream = %self.config.stream,
                    group = %self.config.group,
                    "auth event consumer group already exists"
                );
                session.group_prepared = true;
            }
            Err(error) => {
                warn!(
                    stream = %self.config.stream,
                    group = %self.config.group,
                    error = %error,
                    "unable to create auth event consumer group"
                );
            }
        }

        session.group_prepared
    }

    pub(super) async fn close_session(&self, slot: &mut Option<StreamSession>) {
        let Some(mut session) = slot.take() else {
            return;
        };

        if let Err(error) = session.connection.close().await {
            debug!(
                stream = %self.config.stream,
                error = %error,
                "error while closing auth event stream connection"
            );
        }
    }
}
