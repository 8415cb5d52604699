//! Atelier API server binary.

use atelier_api::{app, ApiConfig, AppState, AuthConfig};
use atelier_llm::build_chat_model;
use atelier_store::MemoryStore;
use axum::middleware as axum_middleware;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();

    if auth_config.jwt_secret.is_insecure_default() {
        tracing::warn!("ATELIER_JWT_SECRET not set; using the insecure default secret");
    }
    if auth_config.api_keys.is_empty() {
        tracing::warn!("ATELIER_API_KEYS not set; the external query endpoint will reject all calls");
    }

    let chat_model = match config.chat_provider.as_ref() {
        Some(provider) => {
            let model = build_chat_model(provider)?;
            tracing::info!(provider = %provider.provider_type, model = %provider.model,
                "chat model configured");
            Some(model)
        }
        None => {
            tracing::warn!("no chat provider configured; chat surface disabled");
            None
        }
    };

    // Development store. A deployment swaps in its relational-store adapter
    // behind the same trait.
    let store = Arc::new(MemoryStore::new());

    let bind_addr = config.bind_addr.clone();
    let rate_limit_state = atelier_api::middleware::RateLimitState::new(config.clone());
    let router = app(AppState::new(store, auth_config, config, chat_model)).layer(
        axum_middleware::from_fn_with_state(
            rate_limit_state,
            atelier_api::middleware::rate_limit_middleware,
        ),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "atelier-api listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
