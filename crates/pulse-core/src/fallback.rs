//! Degradation policy: decides whether a response carries live, partial or
//! illustrative data, and records why.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::PulseError;
use crate::models::{Position, PriceRange, ProviderKind, RangeStatus, TokenPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackState {
    /// Every requested adapter succeeded
    Live,
    /// A secondary adapter failed; position data is live
    Partial,
    /// Position data is the illustrative dataset
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    PrimaryUnconfigured,
    PrimaryFailed,
    /// The provider answered with zero positions
    NoPositions,
    /// The provider answered, but no record was usable
    AllRecordsDropped,
}

/// Which logical fetch a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Positions,
    Balances,
    NativeBalance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub source: FetchSource,
    pub code: String,
    pub message: String,
    /// Upstream fault worth retrying later, as opposed to a config gap
    pub transient: bool,
}

impl FetchFailure {
    pub fn new(source: FetchSource, error: &PulseError) -> Self {
        Self {
            source,
            code: error.code().to_string(),
            message: error.to_string(),
            transient: error.is_transient(),
        }
    }
}

/// What the primary position fetch produced, as seen by the policy.
#[derive(Debug, Clone, Copy)]
pub enum PrimaryStatus<'a> {
    Fetched { positions: usize, dropped: usize },
    Failed(&'a PulseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: FallbackState,
    pub reason: Option<FallbackReason>,
}

/// Decide the response state.
///
/// `primary` is `None` when the request did not ask for positions; the state
/// then depends only on the secondary fetches.
pub fn decide(primary: Option<PrimaryStatus<'_>>, secondary_failed: bool) -> Decision {
    let reason = match primary {
        Some(PrimaryStatus::Failed(PulseError::ProviderUnconfigured(_))) => {
            Some(FallbackReason::PrimaryUnconfigured)
        }
        Some(PrimaryStatus::Failed(_)) => Some(FallbackReason::PrimaryFailed),
        Some(PrimaryStatus::Fetched { positions: 0, dropped: 0 }) => Some(FallbackReason::NoPositions),
        Some(PrimaryStatus::Fetched { positions: 0, .. }) => Some(FallbackReason::AllRecordsDropped),
        _ => None,
    };

    let state = match (reason, secondary_failed) {
        (Some(_), _) => FallbackState::Fallback,
        (None, true) => FallbackState::Partial,
        (None, false) => FallbackState::Live,
    };

    Decision { state, reason }
}

/// Completeness report attached to every response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub request_id: String,
    pub state: FallbackState,
    /// True when position data could not be served live
    pub fallback: bool,
    /// True when `data` is built from the illustrative dataset
    pub illustrative: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    /// True when any requested fetch did not complete
    pub degraded: bool,
    pub dropped_records: usize,
    pub failed_fetches: Vec<FetchFailure>,
    pub invariant_clamped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_provider: Option<ProviderKind>,
}

impl Diagnostics {
    pub fn new(request_id: impl Into<String>, decision: Decision) -> Self {
        Self {
            request_id: request_id.into(),
            state: decision.state,
            fallback: decision.state == FallbackState::Fallback,
            illustrative: decision.state == FallbackState::Fallback,
            reason: decision.reason,
            degraded: decision.state != FallbackState::Live,
            dropped_records: 0,
            failed_fetches: Vec::new(),
            invariant_clamped: false,
            primary_provider: None,
        }
    }

    /// Diagnostics for responses that are illustrative by construction.
    pub fn illustrative(request_id: impl Into<String>) -> Self {
        Self::new(
            request_id,
            Decision {
                state: FallbackState::Fallback,
                reason: None,
            },
        )
    }
}

// =============================================================================
// Illustrative dataset
// =============================================================================

/// The fixed dataset served in the `FALLBACK` state.
pub fn illustrative_positions() -> Vec<Position> {
    vec![Position {
        id: "illustrative-1".to_string(),
        provider: ProviderKind::Indexer,
        pair: TokenPair::new("ETH", "USDC"),
        pool: None,
        fee_tier_bps: Some(5),
        price_range: PriceRange::prices(dec!(2200.00), dec!(2600.00)).with_current(Some(dec!(2387.45))),
        in_range: RangeStatus::OutOfRange,
        liquidity_usd: dec!(8450.23),
        unclaimed_fees_usd: dec!(127.50),
        apr_percent: dec!(18.2),
        impermanent_loss_percent: dec!(-2.3),
    }]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub id: String,
    pub pair: TokenPair,
    pub fee_tier_bps: u32,
    pub tvl_usd: Decimal,
    pub volume_24h_usd: Decimal,
    pub apr_percent: Decimal,
}

/// Fixed pool directory; no live pool source is wired in.
pub fn illustrative_pools() -> Vec<PoolInfo> {
    vec![
        PoolInfo {
            id: "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640".to_string(),
            pair: TokenPair::new("USDC", "WETH"),
            fee_tier_bps: 5,
            tvl_usd: dec!(142500000),
            volume_24h_usd: dec!(45200000),
            apr_percent: dec!(12.4),
        },
        PoolInfo {
            id: "0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8".to_string(),
            pair: TokenPair::new("USDC", "WETH"),
            fee_tier_bps: 30,
            tvl_usd: dec!(98100000),
            volume_24h_usd: dec!(32100000),
            apr_percent: dec!(8.7),
        },
    ]
}
