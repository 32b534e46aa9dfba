use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use authstream_core::AppError;
use subtle::ConstantTimeEq;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn require_ingest_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    authorize_ingest(request.headers(), &state.ingest_token)?;
    Ok(next.run(request).await)
}

pub(crate) fn authorize_ingest(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("bearer token required".to_owned()))?;

    if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        return Err(AppError::Unauthorized("invalid ingest token".to_owned()));
    }

    Ok(())
}
