//! Wire form of records exchanged with the durable auth event stream.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use authstream_core::AppError;

/// Flat string-keyed field map carried by one stream record.
pub type StreamFields = BTreeMap<String, String>;

/// Field keys written by the publisher and read by consumers.
pub mod field {
    /// Event identifier (UUID).
    pub const EVENT_ID: &str = "eventId";
    /// Event type name, e.g. `LOGIN_SUCCESS`.
    pub const EVENT_TYPE: &str = "eventType";
    /// Event category name, e.g. `AUTHENTICATION`.
    pub const EVENT_CATEGORY: &str = "eventCategory";
    /// RFC 3339 UTC timestamp.
    pub const EVENT_TIMESTAMP: &str = "eventTimestamp";
    /// Authenticated user or client.
    pub const PRINCIPAL: &str = "principal";
    /// Principal kind, e.g. `USER` or `CLIENT`.
    pub const PRINCIPAL_TYPE: &str = "principalType";
    /// Numeric user id.
    pub const USER_ID: &str = "userId";
    /// OAuth2 client id.
    pub const CLIENT_ID: &str = "clientId";
    /// Event result name.
    pub const RESULT: &str = "result";
    /// OAuth2 grant type.
    pub const GRANT_TYPE: &str = "grantType";
    /// Issued token type.
    pub const TOKEN_TYPE: &str = "tokenType";
    /// Space-separated scopes.
    pub const SCOPES: &str = "scopes";
    /// Authorization code identifier.
    pub const AUTHORIZATION_CODE_ID: &str = "authorizationCodeId";
    /// Request correlation identifier.
    pub const CORRELATION_ID: &str = "correlationId";
    /// Caller IP address.
    pub const IP_ADDRESS: &str = "ipAddress";
    /// Caller user agent.
    pub const USER_AGENT: &str = "userAgent";
    /// Request URI.
    pub const REQUEST_URI: &str = "requestUri";
    /// Request method.
    pub const REQUEST_METHOD: &str = "requestMethod";
    /// Session identifier.
    pub const SESSION_ID: &str = "sessionId";
    /// Opaque JSON details blob.
    pub const DETAILS: &str = "details";
}

/// Log-assigned record identifier (`<millis>-<sequence>`), ordered numerically.
///
/// The default value is `0-0`, which sorts before every appended record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamRecordId {
    millis: u64,
    sequence: u64,
}

impl StreamRecordId {
    /// Creates an identifier from its two numeric parts.
    #[must_use]
    pub fn new(millis: u64, sequence: u64) -> Self {
        Self { millis, sequence }
    }

    /// Returns the millisecond part.
    #[must_use]
    pub fn millis(&self) -> u64 {
        self.millis
    }

    /// Returns the sequence part.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Display for StreamRecordId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}-{}", self.millis, self.sequence)
    }
}

impl FromStr for StreamRecordId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("invalid stream record id '{value}'"));

        let (millis, sequence) = match value.split_once('-') {
            Some((millis, sequence)) => (millis, sequence),
            None => (value, "0"),
        };

        Ok(Self {
            millis: millis.parse::<u64>().map_err(|_| invalid())?,
            sequence: sequence.parse::<u64>().map_err(|_| invalid())?,
        })
    }
}

/// One record read back from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// Identifier used for acknowledgment.
    pub id: StreamRecordId,
    /// Flattened event fields. Empty when the payload was trimmed away.
    pub fields: StreamFields,
}

impl StreamRecord {
    /// Creates a record from its id and fields.
    #[must_use]
    pub fn new(id: StreamRecordId, fields: StreamFields) -> Self {
        Self { id, fields }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::StreamRecordId;

    #[test]
    fn record_ids_order_numerically_not_lexically() {
        let earlier = StreamRecordId::from_str("999-5");
        let later = StreamRecordId::from_str("1000-0");
        assert!(matches!((earlier, later), (Ok(earlier), Ok(later)) if earlier < later));
    }

    #[test]
    fn record_id_without_sequence_defaults_to_zero() {
        let parsed = StreamRecordId::from_str("1700000000000");
        assert_eq!(parsed.ok(), Some(StreamRecordId::new(1_700_000_000_000, 0)));
    }

    #[test]
    fn malformed_record_id_is_rejected() {
        assert!(StreamRecordId::from_str("abc-1").is_err());
        assert!(StreamRecordId::from_str("1-x").is_err());
    }

    #[test]
    fn record_id_displays_in_wire_format() {
        assert_eq!(StreamRecordId::new(42, 7).to_string(), "42-7");
    }
}
