use std::env;
use std::time::Duration;

use authstream_application::{AckPolicy, EventStreamConsumerConfig, GroupStart};
use authstream_core::{AppError, AppResult};

/// Where bootstrapped profiles are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStoreConfig {
    /// PostgreSQL at the given URL.
    Postgres {
        /// Connection string.
        database_url: String,
    },
    /// Process memory; profiles are lost on exit.
    Memory,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub profile_store: ProfileStoreConfig,
    pub consumer: EventStreamConsumerConfig,
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = EventStreamConsumerConfig::default();
        let vars = EnvReader { lookup: &lookup };

        let redis_url = vars.required("REDIS_URL")?;
        let profile_store = match vars.optional("PROFILE_STORE").as_deref() {
            None | Some("postgres") => ProfileStoreConfig::Postgres {
                database_url: vars.required("DATABASE_URL")?,
            },
            Some("memory") => ProfileStoreConfig::Memory,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "PROFILE_STORE must be 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        let batch_size = vars.parse_or("AUTH_EVENTS_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(AppError::Validation(
                "AUTH_EVENTS_BATCH_SIZE must be greater than zero".to_owned(),
            ));
        }

        let poll_interval_ms = vars.parse_or(
            "AUTH_EVENTS_POLL_INTERVAL_MS",
            u64::try_from(defaults.poll_interval.as_millis()).unwrap_or(u64::MAX),
        )?;
        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "AUTH_EVENTS_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        let consumer = EventStreamConsumerConfig {
            enabled: vars.flag_or("AUTH_EVENTS_CONSUMER_ENABLED", defaults.enabled)?,
            stream: vars.optional("AUTH_EVENTS_STREAM").unwrap_or(defaults.stream),
            group: vars.optional("AUTH_EVENTS_GROUP").unwrap_or(defaults.group),
            consumer_name: vars
                .optional("AUTH_EVENTS_CONSUMER_NAME")
                .unwrap_or(defaults.consumer_name),
            batch_size,
            poll_interval: Duration::from_millis(poll_interval_ms),
            create_group_if_missing: vars
                .flag_or("AUTH_EVENTS_CREATE_GROUP", defaults.create_group_if_missing)?,
            group_start: vars
                .parse_or::<GroupStart>("AUTH_EVENTS_GROUP_START", defaults.group_start)?,
            ack_policy: vars.parse_or::<AckPolicy>("AUTH_EVENTS_ACK_POLICY", defaults.ack_policy)?,
        };

        Ok(Self {
            redis_url,
            profile_store,
            consumer,
        })
    }
}

struct EnvReader<'a, F> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<'_, F> {
    /// Trimmed, non-blank value of a variable.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn parse_or<T>(&self, name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value.parse::<T>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn flag_or(&self, name: &str, default: bool) -> AppResult<bool> {
        match self.optional(name).map(|value| value.to_ascii_lowercase()).as_deref() {
            None => Ok(default),
            Some("true" | "1" | "yes") => Ok(true),
            Some("false" | "0" | "no") => Ok(false),
            Some(other) => Err(AppError::Validation(format!(
                "invalid {name} value '{other}': expected true or false"
            ))),
        }
    }
}
