//! Canonical data models for liquidity analytics
//!
//! Every provider record is converted into these structures before any
//! analytics run, so consumers never see provider-specific units or field names.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Providers
// =============================================================================

/// Upstream source a raw record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Indexer-style REST API (wallet DeFi positions, token balances)
    Indexer,
    /// Graph-query API over a DEX subgraph
    Subgraph,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Indexer => write!(f, "indexer"),
            ProviderKind::Subgraph => write!(f, "subgraph"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indexer" | "moralis" | "rest" => Ok(ProviderKind::Indexer),
            "subgraph" | "graph" | "thegraph" => Ok(ProviderKind::Subgraph),
            other => Err(format!("unknown provider \"{}\"", other)),
        }
    }
}

// =============================================================================
// Position
// =============================================================================

/// Units of a [`PriceRange`]'s bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// Pool tick indices
    Tick,
    /// Decimal prices of token1 in token0
    Price,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub lower: Decimal,
    pub upper: Decimal,
    /// Current pool price or tick, in the same units as the bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Decimal>,
    pub range_kind: RangeKind,
}

impl PriceRange {
    pub fn ticks(lower: Decimal, upper: Decimal) -> Self {
        Self {
            lower,
            upper,
            current: None,
            range_kind: RangeKind::Tick,
        }
    }

    pub fn prices(lower: Decimal, upper: Decimal) -> Self {
        Self {
            lower,
            upper,
            current: None,
            range_kind: RangeKind::Price,
        }
    }

    pub fn with_current(mut self, current: Option<Decimal>) -> Self {
        self.current = current;
        self
    }
}

/// Whether a position's bounds bracket the current pool price.
///
/// Serialized as `true`, `false` or `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    InRange,
    OutOfRange,
    Unknown,
}

impl RangeStatus {
    pub fn from_bool(in_range: bool) -> Self {
        if in_range {
            RangeStatus::InRange
        } else {
            RangeStatus::OutOfRange
        }
    }
}

impl Serialize for RangeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RangeStatus::InRange => serializer.serialize_bool(true),
            RangeStatus::OutOfRange => serializer.serialize_bool(false),
            RangeStatus::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Token symbols in the order the provider returned them.
///
/// Pairs are not canonically sorted, so the same pool may appear as
/// `USDC/WETH` from one provider and `WETH/USDC` from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub token0: String,
    pub token1: String,
}

impl TokenPair {
    pub const UNKNOWN_SYMBOL: &'static str = "Unknown";

    pub fn new(token0: impl Into<String>, token1: impl Into<String>) -> Self {
        Self {
            token0: token0.into(),
            token1: token1.into(),
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0, self.token1)
    }
}

/// A single liquidity position, canonicalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Provider-assigned identifier (NFT token id, subgraph entity id)
    pub id: String,

    /// Provider the record was normalized from
    pub provider: ProviderKind,

    pub pair: TokenPair,

    /// Pool contract address, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,

    /// Fee tier in basis points (30 = 0.30%)
    pub fee_tier_bps: Option<u32>,

    pub price_range: PriceRange,

    pub in_range: RangeStatus,

    pub liquidity_usd: Decimal,

    /// `fees0 * price0 + fees1 * price1`
    pub unclaimed_fees_usd: Decimal,

    pub apr_percent: Decimal,

    pub impermanent_loss_percent: Decimal,
}

// =============================================================================
// Wallet balances
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub balance_formatted: Decimal,
    pub usd_price: Decimal,
    pub usd_value: Decimal,
}

/// Token balances of a wallet, ordered by USD value, largest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WalletSnapshot {
    tokens: Vec<TokenBalance>,
}

impl WalletSnapshot {
    pub fn new(mut tokens: Vec<TokenBalance>) -> Self {
        // Stable sort keeps provider order among equal values
        tokens.sort_by(|a, b| b.usd_value.cmp(&a.usd_value));
        Self { tokens }
    }

    pub fn tokens(&self) -> &[TokenBalance] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn total_usd(&self) -> Decimal {
        self.tokens
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.usd_value))
    }
}

/// Native coin balance of a wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBalance {
    pub address: String,
    /// Raw balance in wei, as reported
    pub balance_wei: String,
    /// Balance in whole ether, 4 decimal places
    pub eth_balance_formatted: Decimal,
}

// =============================================================================
// Portfolio summary
// =============================================================================

/// Liquidity summed per fee-tier label, in first-occurrence order.
///
/// Serialized as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeTierBreakdown {
    entries: Vec<(String, Decimal)>,
}

impl FeeTierBreakdown {
    pub fn add(&mut self, label: &str, liquidity_usd: Decimal) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, total)) => *total = total.saturating_add(liquidity_usd),
            None => self.entries.push((label.to_string(), liquidity_usd)),
        }
    }

    pub fn get(&self, label: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, total)| *total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Decimal> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

impl Serialize for FeeTierBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, total) in &self.entries {
            map.serialize_entry(label, total)?;
        }
        map.end()
    }
}

/// Portfolio-level statistics derived from a set of positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value_locked_usd: Decimal,
    pub total_unclaimed_fees_usd: Decimal,
    pub average_apr_percent: Decimal,
    pub position_count: usize,
    pub in_range_count: usize,
    /// Includes positions whose range status is unknown
    pub out_of_range_count: usize,
    /// The part of `out_of_range_count` with unknown status
    pub unknown_range_count: usize,
    pub health_score_percent: Decimal,
    pub fee_tier_breakdown: FeeTierBreakdown,
    /// Sum of token balance values, 0 without a balance snapshot
    pub wallet_value_usd: Decimal,
    pub token_count: usize,
}
