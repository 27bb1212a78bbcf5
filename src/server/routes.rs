use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::{handlers, types::AppState};

pub fn create_router(state: AppState) -> Router {
    // Wide-open CORS, as a development posture: any origin, method, header.
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/caption", post(handlers::generate_caption))
        // No upload size cap; the image decoder is the only gatekeeper.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}
