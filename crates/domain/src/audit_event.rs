//! Canonical security audit event produced by the authorization server.

use std::str::FromStr;

use authstream_core::{AppError, AppResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::stream::{StreamFields, field};

/// Coarse grouping of audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventCategory {
    /// Login, logout and session lifecycle.
    Authentication,
    /// Authorization requests, codes and consent.
    Authorization,
    /// Token issuance, refresh, revocation and validation.
    Token,
    /// Device authorization flow.
    Device,
    /// Client registration and client authentication.
    Client,
    /// User account management.
    User,
    /// Administrative configuration changes.
    Admin,
    /// Suspicious or abusive activity.
    Security,
}

impl AuditEventCategory {
    /// Returns the wire value of this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::Token => "TOKEN",
            Self::Device => "DEVICE",
            Self::Client => "CLIENT",
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::Security => "SECURITY",
        }
    }
}

macro_rules! audit_event_types {
    ($($variant:ident => ($wire:literal, $category:ident, $description:literal)),+ $(,)?) => {
        /// Security audit event type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum AuditEventType {
            $(
                #[doc = $description]
                $variant,
            )+
        }

        impl AuditEventType {
            /// Every known event type, in declaration order.
            pub const ALL: &'static [AuditEventType] = &[$(Self::$variant),+];

            /// Returns the wire value of this event type.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            /// Returns the category the event type belongs to.
            #[must_use]
            pub fn category(&self) -> AuditEventCategory {
                match self {
                    $(Self::$variant => AuditEventCategory::$category,)+
                }
            }

            /// Returns a human readable description.
            #[must_use]
            pub fn description(&self) -> &'static str {
                match self {
                    $(Self::$variant => $description,)+
                }
            }
        }

        impl FromStr for AuditEventType {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(AppError::Validation(format!(
                        "unknown audit event type '{value}'"
                    ))),
                }
            }
        }
    };
}

audit_event_types! {
    LoginSuccess => ("LOGIN_SUCCESS", Authentication, "User login successful"),
    LoginFailure => ("LOGIN_FAILURE", Authentication, "User login failed"),
    LoginDenied => ("LOGIN_DENIED", Authentication, "User login denied by policy"),
    Logout => ("LOGOUT", Authentication, "User logged out"),
    FederatedLoginSuccess => ("FEDERATED_LOGIN_SUCCESS", Authentication, "Federated identity login successful"),
    FederatedLoginFailure => ("FEDERATED_LOGIN_FAILURE", Authentication, "Federated identity login failed"),
    FederatedLoginDenied => ("FEDERATED_LOGIN_DENIED", Authentication, "Federated identity login denied by policy"),
    SessionCreated => ("SESSION_CREATED", Authentication, "Session created"),
    SessionExpired => ("SESSION_EXPIRED", Authentication, "Session expired"),
    SessionInvalidated => ("SESSION_INVALIDATED", Authentication, "Session invalidated"),
    AuthorizationRequest => ("AUTHORIZATION_REQUEST", Authorization, "Authorization request initiated"),
    AuthorizationCodeIssued => ("AUTHORIZATION_CODE_ISSUED", Authorization, "Authorization code issued"),
    AuthorizationDenied => ("AUTHORIZATION_DENIED", Authorization, "Authorization denied by user"),
    AuthorizationFailure => ("AUTHORIZATION_FAILURE", Authorization, "Authorization request failed"),
    ConsentGranted => ("CONSENT_GRANTED", Authorization, "User granted consent"),
    ConsentDenied => ("CONSENT_DENIED", Authorization, "User denied consent"),
    TokenIssued => ("TOKEN_ISSUED", Token, "Token issued"),
    AccessTokenIssued => ("ACCESS_TOKEN_ISSUED", Token, "Access token issued"),
    RefreshTokenIssued => ("REFRESH_TOKEN_ISSUED", Token, "Refresh token issued"),
    IdTokenIssued => ("ID_TOKEN_ISSUED", Token, "ID token issued"),
    TokenRefreshed => ("TOKEN_REFRESHED", Token, "Token refreshed"),
    TokenRevoked => ("TOKEN_REVOKED", Token, "Token revoked"),
    TokenIntrospection => ("TOKEN_INTROSPECTION", Token, "Token introspected"),
    TokenIntrospectionActive => ("TOKEN_INTROSPECTION_ACTIVE", Token, "Token introspection - active"),
    TokenIntrospectionInactive => ("TOKEN_INTROSPECTION_INACTIVE", Token, "Token introspection - inactive"),
    TokenValidationSuccess => ("TOKEN_VALIDATION_SUCCESS", Token, "Token validation successful"),
    TokenValidationFailure => ("TOKEN_VALIDATION_FAILURE", Token, "Token validation failed"),
    TokenExpired => ("TOKEN_EXPIRED", Token, "Token expired"),
    ClientCredentialsSuccess => ("CLIENT_CREDENTIALS_SUCCESS", Token, "Client credentials grant successful"),
    ClientCredentialsFailure => ("CLIENT_CREDENTIALS_FAILURE", Token, "Client credentials grant failed"),
    PkceChallengeVerified => ("PKCE_CHALLENGE_VERIFIED", Authorization, "PKCE challenge verified"),
    PkceChallengeFailed => ("PKCE_CHALLENGE_FAILED", Authorization, "PKCE challenge verification failed"),
    DeviceAuthorizationRequest => ("DEVICE_AUTHORIZATION_REQUEST", Device, "Device authorization request"),
    DeviceCodeIssued => ("DEVICE_CODE_ISSUED", Device, "Device code issued"),
    DeviceCodeVerified => ("DEVICE_CODE_VERIFIED", Device, "Device code verified"),
    DeviceCodeDenied => ("DEVICE_CODE_DENIED", Device, "Device code denied"),
    DeviceCodeExpired => ("DEVICE_CODE_EXPIRED", Device, "Device code expired"),
    DeviceCodePolling => ("DEVICE_CODE_POLLING", Device, "Device code polling"),
    ClientRegistered => ("CLIENT_REGISTERED", Client, "Client registered"),
    ClientUpdated => ("CLIENT_UPDATED", Client, "Client updated"),
    ClientDeleted => ("CLIENT_DELETED", Client, "Client deleted"),
    ClientSecretRotated => ("CLIENT_SECRET_ROTATED", Client, "Client secret rotated"),
    ClientAuthenticationSuccess => ("CLIENT_AUTHENTICATION_SUCCESS", Client, "Client authentication successful"),
    ClientAuthenticationFailure => ("CLIENT_AUTHENTICATION_FAILURE", Client, "Client authentication failed"),
    UserCreated => ("USER_CREATED", User, "User created"),
    UserUpdated => ("USER_UPDATED", User, "User updated"),
    UserDeleted => ("USER_DELETED", User, "User deleted"),
    UserLocked => ("USER_LOCKED", User, "User account locked"),
    UserUnlocked => ("USER_UNLOCKED", User, "User account unlocked"),
    PasswordChanged => ("PASSWORD_CHANGED", User, "Password changed"),
    PasswordResetRequested => ("PASSWORD_RESET_REQUESTED", User, "Password reset requested"),
    PasswordResetCompleted => ("PASSWORD_RESET_COMPLETED", User, "Password reset completed"),
    ConfigurationChanged => ("CONFIGURATION_CHANGED", Admin, "Configuration changed"),
    JwkRotated => ("JWK_ROTATED", Admin, "JWK rotated"),
    ScopeCreated => ("SCOPE_CREATED", Admin, "Scope created"),
    ScopeDeleted => ("SCOPE_DELETED", Admin, "Scope deleted"),
    DenyRuleCreated => ("DENY_RULE_CREATED", Admin, "Deny rule created"),
    DenyRuleUpdated => ("DENY_RULE_UPDATED", Admin, "Deny rule updated"),
    DenyRuleDeleted => ("DENY_RULE_DELETED", Admin, "Deny rule deleted"),
    SuspiciousActivity => ("SUSPICIOUS_ACTIVITY", Security, "Suspicious activity detected"),
    RateLimitExceeded => ("RATE_LIMIT_EXCEEDED", Security, "Rate limit exceeded"),
    InvalidRequest => ("INVALID_REQUEST", Security, "Invalid request detected"),
    UnauthorizedAccess => ("UNAUTHORIZED_ACCESS", Security, "Unauthorized access attempt"),
}

impl AuditEventType {
    /// True for interactive or federated logins that completed successfully.
    #[must_use]
    pub fn is_login_success(&self) -> bool {
        matches!(self, Self::LoginSuccess | Self::FederatedLoginSuccess)
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventResult {
    /// The action completed successfully.
    Success,
    /// The action failed due to an error or invalid input.
    Failure,
    /// The action was denied by permissions or policy.
    Denied,
    /// The action awaits a further step, e.g. user approval.
    Pending,
}

impl AuditEventResult {
    /// Returns the wire value of this result.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Denied => "DENIED",
            Self::Pending => "PENDING",
        }
    }
}

impl FromStr for AuditEventResult {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            "DENIED" => Ok(Self::Denied),
            "PENDING" => Ok(Self::Pending),
            _ => Err(AppError::Validation(format!(
                "unknown audit event result '{value}'"
            ))),
        }
    }
}

/// Immutable security audit event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    event_id: Uuid,
    event_type: AuditEventType,
    event_category: String,
    event_timestamp: DateTime<Utc>,
    principal: Option<String>,
    principal_type: Option<String>,
    user_id: Option<i64>,
    client_id: Option<String>,
    result: Option<AuditEventResult>,
    grant_type: Option<String>,
    token_type: Option<String>,
    scopes: Option<String>,
    authorization_code_id: Option<String>,
    correlation_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request_uri: Option<String>,
    request_method: Option<String>,
    session_id: Option<String>,
    details: Option<Value>,
}

/// Input payload used to construct an audit event.
///
/// `event_id`, `event_timestamp` and `event_category` are filled in when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditEventInput {
    /// Explicit event id; a random v4 id is generated when absent.
    pub event_id: Option<Uuid>,
    /// Event type; `None` is rejected.
    pub event_type: Option<AuditEventType>,
    /// Category override; defaults to the event type's category.
    pub event_category: Option<String>,
    /// Event time; defaults to now.
    pub event_timestamp: Option<DateTime<Utc>>,
    /// Authenticated user or client.
    pub principal: Option<String>,
    /// Principal kind.
    pub principal_type: Option<String>,
    /// Numeric user id.
    pub user_id: Option<i64>,
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// Outcome of the action.
    pub result: Option<AuditEventResult>,
    /// OAuth2 grant type.
    pub grant_type: Option<String>,
    /// Issued token type.
    pub token_type: Option<String>,
    /// Space-separated scopes.
    pub scopes: Option<String>,
    /// Authorization code identifier.
    pub authorization_code_id: Option<String>,
    /// Request correlation identifier.
    pub correlation_id: Option<String>,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
    /// Request URI.
    pub request_uri: Option<String>,
    /// Request method.
    pub request_method: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Free-form details.
    pub details: Option<Value>,
}

impl AuditEvent {
    /// Creates an audit event, defaulting id, timestamp and category.
    pub fn new(input: AuditEventInput) -> AppResult<Self> {
        let AuditEventInput {
            event_id,
            event_type,
            event_category,
            event_timestamp,
            principal,
            principal_type,
            user_id,
            client_id,
            result,
            grant_type,
            token_type,
            scopes,
            authorization_code_id,
            correlation_id,
            ip_address,
            user_agent,
            request_uri,
            request_method,
            session_id,
            details,
        } = input;

        let event_type = event_type
            .ok_or_else(|| AppError::Validation("audit event type is required".to_owned()))?;
        let event_category = event_category
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| event_type.category().as_str().to_owned());

        Ok(Self {
            event_id: event_id.unwrap_or_else(Uuid::new_v4),
            event_type,
            event_category,
            event_timestamp: event_timestamp.unwrap_or_else(Utc::now),
            principal,
            principal_type,
            user_id,
            client_id,
            result,
            grant_type,
            token_type,
            scopes,
            authorization_code_id,
            correlation_id,
            ip_address,
            user_agent,
            request_uri,
            request_method,
            session_id,
            details: details.filter(|value| !value.is_null()),
        })
    }

    /// Returns the event id.
    #[must_use]
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> AuditEventType {
        self.event_type
    }

    /// Returns the event category.
    #[must_use]
    pub fn event_category(&self) -> &str {
        self.event_category.as_str()
    }

    /// Returns the event time.
    #[must_use]
    pub fn event_timestamp(&self) -> DateTime<Utc> {
        self.event_timestamp
    }

    /// Returns the principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Returns the principal kind, if any.
    #[must_use]
    pub fn principal_type(&self) -> Option<&str> {
        self.principal_type.as_deref()
    }

    /// Returns the numeric user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Returns the client id, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Returns the result, if any.
    #[must_use]
    pub fn result(&self) -> Option<AuditEventResult> {
        self.result
    }

    /// Returns the grant type, if any.
    #[must_use]
    pub fn grant_type(&self) -> Option<&str> {
        self.grant_type.as_deref()
    }

    /// Returns the token type, if any.
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Returns the space-separated scopes, if any.
    #[must_use]
    pub fn scopes(&self) -> Option<&str> {
        self.scopes.as_deref()
    }

    /// Returns the authorization code id, if any.
    #[must_use]
    pub fn authorization_code_id(&self) -> Option<&str> {
        self.authorization_code_id.as_deref()
    }

    /// Returns the correlation id, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the caller IP address, if any.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Returns the caller user agent, if any.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the request URI, if any.
    #[must_use]
    pub fn request_uri(&self) -> Option<&str> {
        self.request_uri.as_deref()
    }

    /// Returns the request method, if any.
    #[must_use]
    pub fn request_method(&self) -> Option<&str> {
        self.request_method.as_deref()
    }

    /// Returns the session id, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the details blob, if any.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Flattens the event into stream fields. Absent values produce no key.
    #[must_use]
    pub fn to_stream_fields(&self) -> StreamFields {
        let mut fields = StreamFields::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                fields.insert(key.to_owned(), value);
            }
        };

        put(field::EVENT_ID, Some(self.event_id.to_string()));
        put(field::EVENT_TYPE, Some(self.event_type.as_str().to_owned()));
        put(field::EVENT_CATEGORY, Some(self.event_category.clone()));
        put(
            field::EVENT_TIMESTAMP,
            Some(
                self.event_timestamp
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
        );
        put(field::PRINCIPAL, self.principal.clone());
        put(field::PRINCIPAL_TYPE, self.principal_type.clone());
        put(field::USER_ID, self.user_id.map(|value| value.to_string()));
        put(field::CLIENT_ID, self.client_id.clone());
        put(
            field::RESULT,
            self.result.map(|value| value.as_str().to_owned()),
        );
        put(field::GRANT_TYPE, self.grant_type.clone());
        put(field::TOKEN_TYPE, self.token_type.clone());
        put(field::SCOPES, self.scopes.clone());
        put(
            field::AUTHORIZATION_CODE_ID,
            self.authorization_code_id.clone(),
        );
        put(field::CORRELATION_ID, self.correlation_id.clone());
        put(field::IP_ADDRESS, self.ip_address.clone());
        put(field::USER_AGENT, self.user_agent.clone());
        put(field::REQUEST_URI, self.request_uri.clone());
        put(field::REQUEST_METHOD, self.request_method.clone());
        put(field::SESSION_ID, self.session_id.clone());
        put(
            field::DETAILS,
            self.details.as_ref().map(|value| value.to_string()),
        );

        fields
    }
}
