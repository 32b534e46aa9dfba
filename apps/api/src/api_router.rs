use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let ingest_routes = Router::new()
        .route(
            "/api/audit/events",
            post(handlers::audit::record_audit_event_handler),
        )
        .route(
            "/api/audit/logins/success",
            post(handlers::audit::record_login_success_handler),
        )
        .route(
            "/api/audit/logins/failure",
            post(handlers::audit::record_login_failure_handler),
        )
        .route(
            "/api/audit/logins/federated",
            post(handlers::audit::record_federated_login_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_ingest_token,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(ingest_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
