use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// Status of one backing service.
#[derive(Debug, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Attributes of the audited end-user request. Missing client address and
/// user agent fall back to the ingest request's own headers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContextDto {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_uri: Option<String>,
    pub request_method: Option<String>,
    pub session_id: Option<String>,
    pub correlation_id: Option<String>,
}

/// Generic audit event submission.
#[derive(Debug, Deserialize)]
pub struct RecordAuditEventRequest {
    pub event_type: String,
    pub result: Option<String>,
    pub principal: Option<String>,
    pub principal_type: Option<String>,
    pub user_id: Option<i64>,
    pub client_id: Option<String>,
    pub grant_type: Option<String>,
    pub token_type: Option<String>,
    pub scopes: Option<String>,
    pub authorization_code_id: Option<String>,
    pub details: Option<Value>,
    #[serde(default)]
    pub request: RequestContextDto,
}

#[derive(Debug, Deserialize)]
pub struct LoginSuccessRequest {
    pub principal: String,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub request: RequestContextDto,
}

#[derive(Debug, Deserialize)]
pub struct LoginFailureRequest {
    pub principal: String,
    pub reason: String,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub request: RequestContextDto,
}

#[derive(Debug, Deserialize)]
pub struct FederatedLoginRequest {
    pub principal: String,
    pub provider: String,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub request: RequestContextDto,
}
