//! Main application router.

use crate::{
    controllers::{health_controller, jobs_controller},
    middleware::logging_middleware,
    openapi::ApiDoc,
    state::AppState,
};
use axum::{middleware, routing::get, Router};
use gridmatch_config::ServerConfig;
use gridmatch_matcher::di::MatcherServiceInterface;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Creates the main application router, wiring the matcher service into the
/// handful of operational endpoints this service exposes over HTTP.
pub fn create_router(matcher: Arc<dyn MatcherServiceInterface>, server_config: &ServerConfig) -> Router {
    let cors = create_cors_layer(server_config);
    let state = AppState::new(matcher);

    let api_router = Router::new()
        .nest("/jobs", jobs_controller::router())
        .with_state(state);

    let router = Router::new()
        // Health/readiness endpoints, no version prefix.
        .merge(health_controller::router())
        .nest("/api/v1", api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(root))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware));

    info!("Router created with REST endpoints and Swagger UI at /swagger-ui");
    router
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if server_config.cors_enabled {
        if server_config.cors_origins.contains(&"*".to_string()) {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    }
}

/// Root endpoint handler.
async fn root() -> &'static str {
    "GridMatch API v1"
}
