use crate::api::{handlers, AppState};
use crate::config::ServerConfig;
use crate::metrics::track_metrics;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, server: &ServerConfig, metrics_enabled: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        // Health endpoint
        .route("/api/health", get(handlers::health_check))
        // Prediction
        .route("/api/predict", post(handlers::predict))
        .route("/api/soil-types", get(handlers::soil_types))
        // Model administration
        .route("/api/model/info", get(handlers::model_info))
        .route("/api/model/retrain", post(handlers::retrain_model));

    if metrics_enabled {
        router = router
            .route("/metrics", get(handlers::metrics))
            .route_layer(middleware::from_fn(track_metrics));
    }

    router
        // Add state
        .with_state(state)
        // Add middleware
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
}
