use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use authstream_application::EventStreamPublisherConfig;
use authstream_core::AppError;
use tracing_subscriber::EnvFilter;

const MIN_INGEST_TOKEN_LENGTH: usize = 16;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub redis_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub ingest_token: String,
    pub publisher: EventStreamPublisherConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        let mut config = Self::from_lookup(|name| env::var(name).ok())?;
        config.migrate_only = migrate_only;
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required =
            |name: &str| optional(name).ok_or_else(|| AppError::Validation(format!("{name} is required")));

        let database_url = required("DATABASE_URL")?;
        let redis_url = required("REDIS_URL")?;
        let ingest_token = required("AUDIT_INGEST_TOKEN")?;
        if ingest_token.len() < MIN_INGEST_TOKEN_LENGTH {
            return Err(AppError::Validation(format!(
                "AUDIT_INGEST_TOKEN must be at least {MIN_INGEST_TOKEN_LENGTH} characters"
            )));
        }

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(optional("API_PORT"), "API_PORT", 3001_u16)?;

        let defaults = EventStreamPublisherConfig::default();
        let enabled = parse_flag(
            optional("AUTH_EVENTS_ENABLED"),
            "AUTH_EVENTS_ENABLED",
            defaults.enabled,
        )?;
        let append_timeout_ms = parse_or(
            optional("AUTH_EVENTS_APPEND_TIMEOUT_MS"),
            "AUTH_EVENTS_APPEND_TIMEOUT_MS",
            u64::try_from(defaults.append_timeout.as_millis()).unwrap_or(u64::MAX),
        )?;
        if append_timeout_ms == 0 {
            return Err(AppError::Validation(
                "AUTH_EVENTS_APPEND_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        let publisher = EventStreamPublisherConfig {
            enabled,
            stream_name: optional("AUTH_EVENTS_STREAM_NAME").unwrap_or(defaults.stream_name),
            max_length: parse_or(
                optional("AUTH_EVENTS_MAX_LENGTH"),
                "AUTH_EVENTS_MAX_LENGTH",
                defaults.max_length,
            )?,
            append_timeout: Duration::from_millis(append_timeout_ms),
        };

        Ok(Self {
            migrate_only: false,
            database_url,
            redis_url,
            api_host,
            api_port,
            ingest_token,
            publisher,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn parse_or<T>(value: Option<String>, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, name: &str, default: bool) -> Result<bool, AppError> {
    match value.map(|value| value.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(AppError::Validation(format!(
            "invalid {name} value '{other}': expected true or false"
        ))),
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
