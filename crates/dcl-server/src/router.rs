use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with every ledger endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route(
            "/v1/representatives/:id",
            put(handler::put_representative).get(handler::get_representative),
        )
        .route(
            "/v1/representatives/:id/balance/:month",
            get(handler::get_balance),
        )
        .route("/v1/representatives/:id/usage", post(handler::post_usage))
        .route(
            "/v1/representatives/:id/cessions",
            get(handler::get_cessions),
        )
        .route("/v1/usage/:usage_id/approve", post(handler::approve_usage))
        .route("/v1/usage/:usage_id/correct", post(handler::correct_usage))
        .route("/v1/cessions", post(handler::post_cession))
        .route(
            "/v1/cessions/:cession_id/reverse",
            post(handler::reverse_cession),
        )
        .route("/v1/periods/:month/rollover", post(handler::post_rollover))
        .route("/v1/audit", get(handler::get_audit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
