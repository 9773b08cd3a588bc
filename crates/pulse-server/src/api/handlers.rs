use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    Json,
};
use chrono::Utc;
use pulse_core::{illustrative_pools, Diagnostics, NativeBalance, PoolInfo, Position, WalletSnapshot};
use std::time::Instant;
use uuid::Uuid;

use super::dto::*;
use crate::error::{AppError, AppResult};
use crate::pipeline::{FetchPlan, PipelineOutput};
use crate::AppState;

/// Pull the wallet out of the query string, rejecting a missing or empty value.
///
/// The value is passed on untouched; padding fails address validation.
fn require_wallet(query: &WalletQuery) -> AppResult<&str> {
    match query.wallet.as_deref() {
        Some(wallet) if !wallet.is_empty() => Ok(wallet),
        _ => Err(AppError::InvalidParam("wallet is required".to_string())),
    }
}

fn log_response(route: &str, output: &PipelineOutput, start: Instant) {
    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] GET {} -> 200 OK ({}ms) state={:?} positions={}",
        route,
        duration,
        output.diagnostics.state,
        output.positions.len()
    );
    tracing::info!(
        wallet = %output.wallet,
        request_id = %output.diagnostics.request_id,
        duration_ms = %duration,
        state = ?output.diagnostics.state,
        "Request completed"
    );
}

/// Run the pipeline for a wallet query, logging the request the same way for
/// every wallet route.
async fn run_for(
    state: &AppState,
    route: &str,
    query: &WalletQuery,
    plan: FetchPlan,
) -> AppResult<(PipelineOutput, Instant)> {
    let start = Instant::now();
    println!(
        "[REQUEST] GET {} wallet={}",
        route,
        query.wallet.as_deref().unwrap_or("-")
    );

    let wallet = require_wallet(query).inspect_err(|_| {
        println!("[RESPONSE] GET {} -> 400 Bad Request (missing wallet)", route);
    })?;
    tracing::info!(wallet = %wallet, route = %route, "Processing wallet request");

    let output = state.pipeline.run(wallet, plan).await.map_err(|e| {
        println!("[RESPONSE] GET {} -> error ({})", route, e.code());
        AppError::from(e)
    })?;

    Ok((output, start))
}

pub async fn index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        name: "uni-pulse",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    println!("[REQUEST] GET /health");

    let primary = state.pipeline.primary();
    let mut providers = vec![ProviderHealth {
        name: primary.kind().to_string(),
        configured: primary.is_configured(),
    }];
    if let Some(balances) = state.pipeline.balances() {
        if balances.name() != providers[0].name {
            providers.push(ProviderHealth {
                name: balances.name().to_string(),
                configured: balances.is_configured(),
            });
        }
    }

    tracing::info!(
        primary = %primary.kind(),
        primary_configured = %primary.is_configured(),
        "Health check"
    );

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        primary_provider: primary.kind(),
        providers,
        timestamp: Utc::now(),
    })
}

pub async fn get_positions(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> AppResult<Json<Envelope<Vec<Position>>>> {
    let (output, start) = run_for(&state, "/api/positions", &query, FetchPlan::positions()).await?;
    log_response("/api/positions", &output, start);

    Ok(Json(Envelope::new(output.positions, output.diagnostics)))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> AppResult<Json<Envelope<PortfolioData>>> {
    let plan = FetchPlan {
        balances: state.config.pipeline.balances_enabled,
        native: state.config.pipeline.balances_enabled,
        ..FetchPlan::portfolio()
    };
    let (output, start) = run_for(&state, "/api/portfolio", &query, plan).await?;
    log_response("/api/portfolio", &output, start);

    let data = PortfolioData {
        wallet: output.wallet.to_string(),
        summary: output.summary,
        native: output.native,
    };
    Ok(Json(Envelope::new(data, output.diagnostics)))
}

pub async fn get_tokens(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> AppResult<Json<Envelope<WalletSnapshot>>> {
    let (output, start) = run_for(&state, "/api/tokens", &query, FetchPlan::tokens()).await?;
    log_response("/api/tokens", &output, start);

    Ok(Json(Envelope::new(output.snapshot, output.diagnostics)))
}

pub async fn get_wallet_info(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> AppResult<Json<Envelope<Option<NativeBalance>>>> {
    let (output, start) = run_for(&state, "/api/wallet-info", &query, FetchPlan::native()).await?;
    log_response("/api/wallet-info", &output, start);

    Ok(Json(Envelope::new(output.native, output.diagnostics)))
}

pub async fn get_wallet_analysis(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> AppResult<Json<Envelope<WalletAnalysis>>> {
    let plan = FetchPlan {
        balances: state.config.pipeline.balances_enabled,
        native: state.config.pipeline.balances_enabled,
        ..FetchPlan::full()
    };
    let (output, start) = run_for(&state, "/api/wallet-analysis", &query, plan).await?;
    log_response("/api/wallet-analysis", &output, start);

    let data = WalletAnalysis {
        wallet: output.wallet.to_string(),
        positions: output.positions,
        summary: output.summary,
        tokens: output.snapshot,
        native: output.native,
    };
    Ok(Json(Envelope::new(data, output.diagnostics)))
}

pub async fn get_pools(Query(query): Query<PoolsQuery>) -> AppResult<Json<Envelope<Vec<PoolInfo>>>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/pools limit={:?}", query.limit);

    let limit = match query.limit.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_POOL_LIMIT,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::InvalidParam(format!("limit must be a non-negative integer, got \"{}\"", raw)))?,
    };

    let pools: Vec<PoolInfo> = illustrative_pools().into_iter().take(limit).collect();
    let diagnostics = Diagnostics::illustrative(Uuid::new_v4().to_string());

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/pools -> 200 OK ({}ms) pools={}", duration, pools.len());
    tracing::info!(limit = %limit, count = pools.len(), duration_ms = %duration, "Pools served");

    Ok(Json(Envelope::new(pools, diagnostics)))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<NotFoundResponse>) {
    println!("[RESPONSE] {} -> 404 Not Found", uri.path());
    tracing::debug!(path = %uri.path(), "Route not found");

    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            success: false,
            error: format!("No route for {}", uri.path()),
            code: "NOT_FOUND",
            endpoints: ENDPOINTS,
        }),
    )
}
