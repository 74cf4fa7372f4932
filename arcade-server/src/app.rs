//! Router setup

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use arcade_config::ServerConfig;
use arcade_web::middleware::{cors_layer_with_origins, request_id_middleware};

use crate::{context::AppState, handlers};

/// Build the control API router
pub fn create_app(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/workers", get(handlers::list_workers))
        .route("/workers/stop-all", post(handlers::stop_all_workers))
        .route("/workers/{name}/start", post(handlers::start_worker))
        .route("/workers/{name}/stop", post(handlers::stop_worker))
        .route("/workers/{name}/logs", get(handlers::worker_logs))
        .fallback(handlers::not_found)
        .with_state(state);

    // Add middleware layers (applied in reverse order)
    if config.enable_tracing {
        app = app.layer(TraceLayer::new_for_http());
    }

    if config.enable_request_id {
        app = app.layer(middleware::from_fn(request_id_middleware));
    }

    if config.enable_cors {
        app = app.layer(cors_layer_with_origins(&config.cors_origins));
    }

    app
}
