use std::time::{Duration, Instant};

use async_trait::async_trait;
use pulse_core::{ProviderKind, PulseError, PulseResult, WalletAddress};
use reqwest::Client;
use serde_json::{json, Value};

use super::http::{build_client, json_type, read_json, transport_error};
use super::PositionSource;
use crate::config::SubgraphConfig;

// ============================================================================
// Subgraph Client - Positions via a GraphQL endpoint
// ============================================================================

const NAME: &str = "subgraph";

/// Open positions for one owner, plus the ETH/USD price needed to value them.
const POSITIONS_QUERY: &str = r#"query WalletPositions($owner: String!) {
  bundle(id: "1") { ethPriceUSD }
  positions(where: { owner: $owner, liquidity_gt: "0" }, first: 100) {
    id
    liquidity
    depositedToken0
    depositedToken1
    withdrawnToken0
    withdrawnToken1
    pool { id feeTier tick }
    token0 { symbol derivedETH }
    token1 { symbol derivedETH }
    tickLower { tickIdx }
    tickUpper { tickIdx }
  }
}"#;

#[derive(Clone)]
pub struct SubgraphClient {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl SubgraphClient {
    pub fn new(config: &SubgraphConfig) -> reqwest::Result<Self> {
        println!(
            "[SUBGRAPH] Initializing client endpoint={}",
            if config.endpoint.is_empty() { "EMPTY" } else { config.endpoint.as_str() }
        );

        Ok(Self {
            client: build_client(config.timeout())?,
            api_key: config.api_key.trim().to_string(),
            endpoint: config.endpoint.trim().to_string(),
            timeout: config.timeout(),
        })
    }

    async fn query(&self, variables: Value) -> PulseResult<Value> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": POSITIONS_QUERY, "variables": variables }))
            .send()
            .await
            .map_err(|e| transport_error(NAME, self.timeout, e))?;

        let body = read_json(NAME, self.timeout, response).await?;
        tracing::debug!(duration_ms = %start.elapsed().as_millis(), "Subgraph query completed");
        Ok(body)
    }
}

/// Pull `data.positions` out of a GraphQL response and attach the price
/// bundle to every record.
fn extract_positions(mut body: Value) -> PulseResult<Vec<Value>> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors[0]
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            tracing::error!(errors = errors.len(), message = %message, "Subgraph returned errors");
            return Err(PulseError::unavailable(NAME, format!("query error: {}", message)));
        }
    }

    let data = match body.get_mut("data").map(Value::take) {
        Some(data @ Value::Object(_)) => data,
        _ => return Err(PulseError::malformed(NAME, "response has no data object")),
    };

    let bundle = data.get("bundle").cloned().unwrap_or(Value::Null);
    let positions = match data.get("positions") {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(PulseError::malformed(
                NAME,
                format!("data.positions is {} instead of an array", json_type(other)),
            ))
        }
        None => return Err(PulseError::malformed(NAME, "data.positions is missing")),
    };

    Ok(positions
        .into_iter()
        .map(|mut position| {
            if let Some(obj) = position.as_object_mut() {
                obj.insert("bundle".to_string(), bundle.clone());
            }
            position
        })
        .collect())
}

#[async_trait]
impl PositionSource for SubgraphClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Subgraph
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_positions(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>> {
        if !self.is_configured() {
            tracing::warn!("Subgraph endpoint or API key not configured, skipping request");
            return Err(PulseError::ProviderUnconfigured(NAME.to_string()));
        }

        // Owners are stored lowercase
        let body = self
            .query(json!({ "owner": wallet.to_lowercase_hex() }))
            .await?;
        let records = extract_positions(body)?;

        tracing::info!(wallet = %wallet.short(), count = records.len(), "Fetched subgraph positions");
        Ok(records)
    }
}
