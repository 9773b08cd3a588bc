pub mod http;
pub mod indexer;
pub mod subgraph;

use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{ProviderKind, PulseResult, WalletAddress};
use serde_json::Value;

pub use indexer::IndexerClient;
pub use subgraph::SubgraphClient;

/// An upstream source of raw liquidity position records.
///
/// Implementations issue exactly one outbound request per call and never
/// retry. A source missing its credentials returns `ProviderUnconfigured`
/// without touching the network.
#[async_trait]
pub trait PositionSource: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn is_configured(&self) -> bool;

    /// Upper bound for a single fetch.
    fn timeout(&self) -> Duration;

    async fn fetch_positions(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>>;
}

/// An upstream source of wallet token balances.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    fn timeout(&self) -> Duration;

    /// Raw ERC-20 balance records.
    async fn fetch_balances(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>>;

    /// Raw native balance object (`{"balance": "<wei>"}`).
    async fn fetch_native_balance(&self, wallet: &WalletAddress) -> PulseResult<Value>;
}
