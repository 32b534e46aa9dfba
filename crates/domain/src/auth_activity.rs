//! Typed view of an auth event read back from the stream.
//!
//! Decoding never fails: malformed values are dropped and the remaining
//! fields stay usable. Only the principal and the event type drive dispatch.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::audit_event::AuditEventType;
use crate::stream::{StreamFields, field};

/// Decoded auth activity event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthActivityEvent {
    /// Event id as published.
    pub event_id: Option<String>,
    /// Raw event type name.
    pub event_type: Option<String>,
    /// Event category name.
    pub event_category: Option<String>,
    /// Parsed event time; unset when malformed.
    pub event_timestamp: Option<DateTime<Utc>>,
    /// Authenticated user or client.
    pub principal: Option<String>,
    /// Principal kind.
    pub principal_type: Option<String>,
    /// Parsed numeric user id; unset when malformed.
    pub user_id: Option<i64>,
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// Space-separated scopes.
    pub scopes: Option<String>,
    /// Result name.
    pub result: Option<String>,
    /// OAuth2 grant type.
    pub grant_type: Option<String>,
    /// Issued token type.
    pub token_type: Option<String>,
    /// Request correlation identifier.
    pub correlation_id: Option<String>,
    /// Raw details blob as published.
    pub details_json: Option<String>,
    /// Parsed details; empty when absent or malformed.
    pub details: Map<String, Value>,
}

impl AuthActivityEvent {
    /// Decodes stream fields into a typed view.
    #[must_use]
    pub fn from_stream_fields(fields: &StreamFields) -> Self {
        let text = |key: &str| fields.get(key).cloned();

        let event_timestamp = fields
            .get(field::EVENT_TIMESTAMP)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc));
        let user_id = fields
            .get(field::USER_ID)
            .and_then(|value| value.parse::<i64>().ok());
        let details_json = text(field::DETAILS);
        let details = details_json
            .as_deref()
            .and_then(|value| serde_json::from_str::<Map<String, Value>>(value).ok())
            .unwrap_or_default();

        Self {
            event_id: text(field::EVENT_ID),
            event_type: text(field::EVENT_TYPE),
            event_category: text(field::EVENT_CATEGORY),
            event_timestamp,
            principal: text(field::PRINCIPAL),
            principal_type: text(field::PRINCIPAL_TYPE),
            user_id,
            client_id: text(field::CLIENT_ID),
            scopes: text(field::SCOPES),
            result: text(field::RESULT),
            grant_type: text(field::GRANT_TYPE),
            token_type: text(field::TOKEN_TYPE),
            correlation_id: text(field::CORRELATION_ID),
            details_json,
            details,
        }
    }

    /// Returns the known event type, if the raw name matches one ignoring
    /// case. Surrounding whitespace is not stripped.
    #[must_use]
    pub fn known_event_type(&self) -> Option<AuditEventType> {
        let raw = self.event_type.as_deref()?;
        AuditEventType::from_str(raw.to_ascii_uppercase().as_str()).ok()
    }

    /// True for `LOGIN_SUCCESS` and `FEDERATED_LOGIN_SUCCESS`.
    #[must_use]
    pub fn is_login_success(&self) -> bool {
        self.known_event_type()
            .is_some_and(|event_type| event_type.is_login_success())
    }

    /// Returns the principal verbatim when it is present and not blank.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.principal
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns one detail value as text.
    ///
    /// Strings are returned verbatim, other scalars in their JSON rendering.
    /// `null` and blank strings count as absent.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<String> {
        match self.details.get(key)? {
            Value::Null => None,
            Value::String(value) if value.trim().is_empty() => None,
            Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }
}
