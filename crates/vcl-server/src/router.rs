use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all VCL endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/certificates", post(handler::issue_certificate))
        .route("/v1/certificates/:id", get(handler::get_certificate))
        .route("/v1/certificates/:id/verify", get(handler::verify_certificate))
        .route(
            "/v1/certificates/:id/verify-recording",
            post(handler::verify_recording),
        )
        .route(
            "/v1/cameras/:camera_id/certificates",
            get(handler::camera_certificates),
        )
        .route(
            "/v1/cameras/:camera_id/certificates/count",
            get(handler::camera_certificate_count),
        )
        .route(
            "/v1/cameras/:camera_id/certificates/latest",
            get(handler::camera_latest_certificate),
        )
        .route("/v1/chain/verify", get(handler::verify_chain))
        .route("/v1/blocks/:block_number", get(handler::get_block))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
