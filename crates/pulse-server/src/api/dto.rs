use chrono::{DateTime, Utc};
use pulse_core::{
    Diagnostics, NativeBalance, PortfolioSummary, Position, ProviderKind, WalletSnapshot,
};
use serde::{Deserialize, Serialize};

/// Routes advertised by `/` and by the 404 body.
pub const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/positions?wallet=",
    "GET /api/portfolio?wallet=",
    "GET /api/tokens?wallet=",
    "GET /api/wallet-info?wallet=",
    "GET /api/wallet-analysis?wallet=",
    "GET /api/pools?limit=",
];

// ============================================================================
// Response envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub diagnostics: Diagnostics,
    pub timestamp: DateTime<Utc>,
}

impl<T> Envelope<T> {
    pub fn new(data: T, diagnostics: Diagnostics) -> Self {
        Self {
            success: true,
            data,
            diagnostics,
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Query parameters
// ============================================================================

/// `?wallet=`; optional here so a missing value maps to `INVALID_PARAM`.
#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub wallet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PoolsQuery {
    pub limit: Option<String>,
}

pub const DEFAULT_POOL_LIMIT: usize = 10;

// ============================================================================
// GET / and GET /health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub primary_provider: ProviderKind,
    pub providers: Vec<ProviderHealth>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub configured: bool,
}

// ============================================================================
// Wallet data
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PortfolioData {
    pub wallet: String,
    pub summary: PortfolioSummary,
    #[serde(rename = "walletInfo")]
    pub native: Option<NativeBalance>,
}

#[derive(Debug, Serialize)]
pub struct WalletAnalysis {
    pub wallet: String,
    pub positions: Vec<Position>,
    pub summary: PortfolioSummary,
    pub tokens: WalletSnapshot,
    #[serde(rename = "walletInfo")]
    pub native: Option<NativeBalance>,
}

#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    pub endpoints: &'static [&'static str],
}
