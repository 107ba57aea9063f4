use axum::{
    Router,
    extract::State,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use tower::ServiceBuilder;

use repassia_core::health::{healthz, readiness};
use repassia_core::middleware::{
    cors_layer, propagate_request_id_layer, request_id_layer, trace_layer,
};

use crate::domain::repository::CredentialStore;
use crate::gateway::require_identity;
use crate::handlers::{
    auth_code::{request_code, verify_code},
    session::{me, revoke_all},
    token::{refresh, revoke, validate_token},
};
use crate::rate_limit::throttle_by_ip;
use crate::state::AppState;

pub fn build_router<S: CredentialStore>(state: AppState<S>, allowed_origins: &[String]) -> Router {
    let public = Router::new()
        // Code issuer
        .route("/auth/request-code", post(request_code::<S>))
        .route("/auth/verify-code", post(verify_code::<S>))
        // Token service
        .route("/auth/validate-token", post(validate_token::<S>))
        .route("/auth/refresh", post(refresh::<S>))
        .route("/auth/revoke", post(revoke::<S>))
        .route_layer(from_fn_with_state(state.throttle.clone(), throttle_by_ip));

    let protected = Router::new()
        .route("/auth/me", get(me::<S>))
        .route("/auth/revoke-all", post(revoke_all::<S>))
        .route_layer(from_fn_with_state(state.gateway.clone(), require_identity));

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<S>))
        .merge(public)
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(trace_layer())
                .layer(propagate_request_id_layer())
                .layer(cors_layer(allowed_origins)),
        )
        .with_state(state)
}

async fn readyz<S: CredentialStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    readiness(state.store.ping().await)
}
