//! Authstream profile bootstrap worker.

#![forbid(unsafe_code)]

mod worker_config;

use std::sync::Arc;

use authstream_application::{AuthEventStreamConsumer, ProfileBootstrapService, ProfileStore};
use authstream_core::{AppError, AppResult};
use authstream_infrastructure::{
    InMemoryProfileStore, MIGRATOR, PostgresProfileStore, RedisEventStreamConnector,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::worker_config::{ProfileStoreConfig, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    if !config.consumer.enabled {
        info!("auth event consumer disabled, exiting");
        return Ok(());
    }

    let redis_client = redis::Client::open(config.redis_url.as_str())
        .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
    let profile_store = build_profile_store(&config.profile_store).await?;
    let consumer = AuthEventStreamConsumer::new(
        Arc::new(RedisEventStreamConnector::new(
            redis_client,
            config.consumer.block_duration(),
        )),
        ProfileBootstrapService::new(profile_store),
        config.consumer.clone(),
    );

    info!(
        stream = %config.consumer.stream,
        group = %config.consumer.group,
        consumer = %config.consumer.consumer_name,
        batch_size = config.consumer.batch_size,
        poll_interval_ms = config.consumer.poll_interval.as_millis(),
        ack_policy = config.consumer.ack_policy.as_str(),
        "authstream-worker started"
    );

    let outcome = tokio::select! {
        () = run_consumer(&consumer) => Ok(()),
        signal = shutdown_signal() => signal,
    };

    consumer.shutdown().await;
    info!("authstream-worker stopped");
    outcome
}

/// Polls with a fixed delay between ticks, so ticks never overlap.
async fn run_consumer(consumer: &AuthEventStreamConsumer) {
    if !consumer.ensure_connection().await {
        warn!("auth event stream unavailable at startup, retrying on each poll");
    }

    loop {
        let summary = consumer.poll_stream().await;
        if summary.delivered > 0 {
            debug!(
                delivered = summary.delivered,
                processed = summary.processed,
                skipped = summary.skipped,
                failed = summary.failed,
                acknowledged = summary.acknowledged,
                "auth event poll finished"
            );
        }

        tokio::time::sleep(consumer.config().poll_interval).await;
    }
}

async fn build_profile_store(config: &ProfileStoreConfig) -> AppResult<Arc<dyn ProfileStore>> {
    match config {
        ProfileStoreConfig::Postgres { database_url } => {
            let pool = connect_pool(database_url.as_str()).await?;
            MIGRATOR
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;
            Ok(Arc::new(PostgresProfileStore::new(pool)))
        }
        ProfileStoreConfig::Memory => {
            warn!("using in-memory profile store, profiles are lost on exit");
            Ok(Arc::new(InMemoryProfileStore::new()))
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

async fn shutdown_signal() -> AppResult<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|error| AppError::Internal(format!("failed to listen for ctrl-c: {error}")))
    };

    #[cfg(unix)]
    let terminate = async {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).map_err(
                |error| AppError::Internal(format!("failed to listen for SIGTERM: {error}")),
            )?;
        terminate.recv().await;
        Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<AppResult<()>>();

    let received = tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    };

    info!("shutdown signal received");
    received
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
