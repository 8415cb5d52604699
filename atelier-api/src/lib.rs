//! Atelier API - HTTP layer
//!
//! Axum router over the tool layer: an API-key-authenticated read-only query
//! endpoint for third parties, and a JWT-authenticated chat surface that
//! binds the full tool registry to the conversational model.

use axum::http::{header, Method};
use axum::{middleware as axum_middleware, routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use auth::AuthConfig;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Build the application router.
///
/// Rate limiting is layered on in `main` because it needs the connection's
/// socket address; everything else lives here so tests can drive the full
/// router with `tower::ServiceExt::oneshot`.
pub fn app(state: AppState) -> Router {
    // The query endpoint is built for wildcard-origin access from third
    // party sites; only POST and the preflight are allowed, with a fixed
    // header allow-list.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-api-key")]);

    let chat_routes = Router::new()
        .route("/api/v1/chat", post(routes::chat::chat))
        .layer(axum_middleware::from_fn_with_state(
            middleware::AuthMiddlewareState {
                auth_config: state.auth_config.clone(),
            },
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/v1/query",
            post(routes::query::query).options(routes::query::preflight),
        )
        .merge(chat_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
