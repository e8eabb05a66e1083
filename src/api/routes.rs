//! Router construction

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::middleware::rate_limit::RateLimitLayer;
use crate::AppState;

/// Build the HTTP router with all routes and layers
pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = &state.settings;
    let request_timeout = Duration::from_secs(settings.server.request_timeout_secs);

    let mut router = Router::new()
        .route("/generate-image", post(handlers::generate_image))
        .route("/job/:job_id", get(handlers::get_job))
        .route("/health", get(handlers::health));

    if settings.rate_limit.enabled {
        router = router.layer(RateLimitLayer::new(
            settings.rate_limit.requests_per_second,
            settings.rate_limit.burst_size,
        ));
    }

    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
