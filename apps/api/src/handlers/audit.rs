use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use authstream_application::RequestMetadata;
use authstream_domain::{AuditEvent, AuditEventInput, AuditEventResult, AuditEventType};

use crate::dto::{
    FederatedLoginRequest, LoginFailureRequest, LoginSuccessRequest, RecordAuditEventRequest,
    RequestContextDto,
};
use crate::error::ApiResult;
use crate::state::AppState;

const CORRELATION_ID_HEADER: &str = "x-correlation-id";

pub async fn record_audit_event_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RecordAuditEventRequest>,
) -> ApiResult<(StatusCode, Json<AuditEvent>)> {
    let event_type = payload.event_type.parse::<AuditEventType>()?;
    let result = payload
        .result
        .as_deref()
        .map(str::parse::<AuditEventResult>)
        .transpose()?;
    let request = request_metadata(&headers, remote, payload.request);

    let event = AuditEvent::new(AuditEventInput {
        event_type: Some(event_type),
        result,
        principal: payload.principal,
        principal_type: payload.principal_type,
        user_id: payload.user_id,
        client_id: payload.client_id,
        grant_type: payload.grant_type,
        token_type: payload.token_type,
        scopes: payload.scopes,
        authorization_code_id: payload.authorization_code_id,
        correlation_id: request.correlation_id,
        ip_address: request.ip_address,
        user_agent: request.user_agent,
        request_uri: request.request_uri,
        request_method: request.request_method,
        session_id: request.session_id,
        details: payload.details,
        ..AuditEventInput::default()
    })?;

    let recorded = state.audit_service.record_event(event).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn record_login_success_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginSuccessRequest>,
) -> ApiResult<(StatusCode, Json<AuditEvent>)> {
    let request = request_metadata(&headers, remote, payload.request);
    let recorded = state
        .audit_service
        .record_login_success(
            payload.principal.as_str(),
            payload.user_id,
            request,
            payload.details,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn record_login_failure_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginFailureRequest>,
) -> ApiResult<(StatusCode, Json<AuditEvent>)> {
    let request = request_metadata(&headers, remote, payload.request);
    let recorded = state
        .audit_service
        .record_login_failure(
            payload.principal.as_str(),
            payload.reason.as_str(),
            request,
            payload.details,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn record_federated_login_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<FederatedLoginRequest>,
) -> ApiResult<(StatusCode, Json<AuditEvent>)> {
    let request = request_metadata(&headers, remote, payload.request);
    let recorded = state
        .audit_service
        .record_federated_login_success(
            payload.principal.as_str(),
            payload.provider.as_str(),
            payload.user_id,
            request,
            payload.details,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

/// Merges the submitted request context with the ingest call's own headers.
fn request_metadata(
    headers: &HeaderMap,
    remote: SocketAddr,
    context: RequestContextDto,
) -> RequestMetadata {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    let remote_ip = remote.ip().to_string();

    RequestMetadata {
        ip_address: context.ip_address.or_else(|| {
            RequestMetadata::client_ip(
                header_value("x-forwarded-for").as_deref(),
                header_value("x-real-ip").as_deref(),
                Some(remote_ip.as_str()),
            )
        }),
        user_agent: context
            .user_agent
            .or_else(|| header_value(header::USER_AGENT.as_str())),
        request_uri: context.request_uri,
        request_method: context.request_method,
        session_id: context.session_id,
        correlation_id: context
            .correlation_id
            .or_else(|| header_value(CORRELATION_ID_HEADER)),
    }
}

#[cfg(test)]
mod tests;
