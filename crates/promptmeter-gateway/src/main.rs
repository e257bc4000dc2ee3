//! Promptmeter Gateway - Service Entry Point
//!
//! Wires the tokenizer, provider, cache, and per-user stores into the HTTP
//! router and serves it.

use std::net::SocketAddr;
use std::sync::Arc;

use promptmeter_cache::{InMemoryTtlCache, ResponseCache};
use promptmeter_gateway::{build_routes, AppState, GatewayConfig};
use promptmeter_runtime::OpenRouterProvider;
use promptmeter_tokenizer::Cl100kCounter;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "promptmeter_gateway=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Promptmeter Gateway v{}", env!("CARGO_PKG_VERSION"));
    promptmeter_gateway::metrics::init_metrics();

    let config = GatewayConfig::from_env()?;
    let addr: SocketAddr = config.bind_addr.parse()?;

    let counter = Arc::new(Cl100kCounter::new()?);
    let provider = Arc::new(OpenRouterProvider::from_env());
    let cache = build_cache().await?;

    let state = AppState::new(config, counter, provider, cache)?;

    let app = build_routes(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "redis-backend")]
async fn build_cache() -> anyhow::Result<Arc<dyn ResponseCache>> {
    if let Ok(url) = std::env::var("PROMPTMETER_REDIS_URL") {
        tracing::info!("Using Redis response cache at {}", url);
        let cache = promptmeter_cache::RedisCache::connect(&url).await?;
        return Ok(Arc::new(cache));
    }
    Ok(Arc::new(InMemoryTtlCache::new()))
}

#[cfg(not(feature = "redis-backend"))]
async fn build_cache() -> anyhow::Result<Arc<dyn ResponseCache>> {
    Ok(Arc::new(InMemoryTtlCache::new()))
}
