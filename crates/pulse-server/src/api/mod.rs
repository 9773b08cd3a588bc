pub mod dto;
pub mod handlers;

use axum::{routing::get, Router};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        // Wallet endpoints
        .route("/api/positions", get(handlers::get_positions))
        .route("/api/portfolio", get(handlers::get_portfolio))
        .route("/api/tokens", get(handlers::get_tokens))
        .route("/api/wallet-info", get(handlers::get_wallet_info))
        .route("/api/wallet-analysis", get(handlers::get_wallet_analysis))
        // Pool directory
        .route("/api/pools", get(handlers::get_pools))
        .fallback(handlers::not_found)
}
