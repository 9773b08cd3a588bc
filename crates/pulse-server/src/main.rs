mod api;
mod config;
mod error;
mod pipeline;
mod providers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use pulse_core::ProviderKind;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::providers::{BalanceSource, IndexerClient, PositionSource, SubgraphClient};

pub use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<AppConfig>,
}

fn credential_state(api_key: &str) -> &'static str {
    if api_key.trim().is_empty() {
        "EMPTY"
    } else {
        "set"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info,pulse_core=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false),
        )
        .init();

    println!("================================================");
    println!("           UNI PULSE - Starting Up              ");
    println!("================================================");

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let primary_kind = config.pipeline.primary_kind()?;

    println!("[CONFIG] Server: {}:{}", config.server.host, config.server.port);
    println!("[CONFIG] Primary provider: {}", primary_kind);
    println!(
        "[CONFIG] Indexer: {} (api key {})",
        config.indexer.base_url,
        credential_state(&config.indexer.api_key)
    );
    println!(
        "[CONFIG] Subgraph: {} (api key {})",
        if config.subgraph.endpoint.is_empty() { "-" } else { config.subgraph.endpoint.as_str() },
        credential_state(&config.subgraph.api_key)
    );
    if !config.indexer.is_configured() && !config.subgraph.is_configured() {
        println!("[CONFIG] *** No provider configured - responses will be illustrative ***");
        tracing::warn!("No provider credentials configured; positions will fall back to illustrative data");
    }

    let indexer = Arc::new(IndexerClient::new(&config.indexer)?);
    let primary: Arc<dyn PositionSource> = match primary_kind {
        ProviderKind::Indexer => indexer.clone(),
        ProviderKind::Subgraph => Arc::new(SubgraphClient::new(&config.subgraph)?),
    };
    let balances: Option<Arc<dyn BalanceSource>> = if config.pipeline.balances_enabled {
        Some(indexer)
    } else {
        None
    };

    let pipeline = Pipeline::new(primary, balances, config.pipeline.strict_invariants);

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        primary = %primary_kind,
        strict_invariants = %config.pipeline.strict_invariants,
        "Starting Uni Pulse"
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config.clone()),
    };

    let app = Router::new()
        .merge(api::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    println!("[ROUTER] Routes configured: /, /health, /api/{{positions,portfolio,tokens,wallet-info,wallet-analysis,pools}}");

    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("================================================");
    println!("  Server listening on http://{}", addr);
    println!("================================================");

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
