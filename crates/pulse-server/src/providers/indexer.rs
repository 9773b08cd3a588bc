use std::time::{Duration, Instant};

use async_trait::async_trait;
use pulse_core::{ProviderKind, PulseError, PulseResult, WalletAddress};
use reqwest::Client;
use serde_json::Value;

use super::http::{build_client, json_type, read_json, record_list, transport_error};
use super::{BalanceSource, PositionSource};
use crate::config::IndexerConfig;

// ============================================================================
// Indexer Client - Wallet DeFi positions and balances over REST
// ============================================================================

const NAME: &str = "indexer";

#[derive(Clone)]
pub struct IndexerClient {
    client: Client,
    api_key: String,
    base_url: String,
    chain: String,
    timeout: Duration,
}

impl IndexerClient {
    pub fn new(config: &IndexerConfig) -> reqwest::Result<Self> {
        let key_state = if config.api_key.trim().is_empty() { "EMPTY" } else { "set" };
        println!("[INDEXER] Initializing client base_url={} api_key={}", config.base_url, key_state);
        tracing::debug!(base_url = %config.base_url, chain = %config.chain, "Creating indexer client");

        Ok(Self {
            client: build_client(config.timeout())?,
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain: config.chain.clone(),
            timeout: config.timeout(),
        })
    }

    fn ensure_configured(&self) -> PulseResult<()> {
        if self.api_key.is_empty() || self.base_url.is_empty() {
            tracing::warn!("Indexer API key not configured, skipping request");
            return Err(PulseError::ProviderUnconfigured(NAME.to_string()));
        }
        Ok(())
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> PulseResult<Value> {
        self.ensure_configured()?;

        let start = Instant::now();
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Calling indexer API");

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(NAME, self.timeout, e))?;

        let body = read_json(NAME, self.timeout, response).await?;
        tracing::debug!(
            path = %path,
            duration_ms = %start.elapsed().as_millis(),
            "Indexer API responded"
        );
        Ok(body)
    }
}

#[async_trait]
impl PositionSource for IndexerClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Indexer
    }

    fn is_configured(&self) -> bool {
        self.ensure_configured().is_ok()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_positions(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>> {
        let path = format!("/wallets/{}/defi/uniswap-v3/positions", wallet);
        let body = self.get_json(&path, &[("chain", self.chain.as_str())]).await?;
        let records = record_list(NAME, body, "result")?;

        tracing::info!(wallet = %wallet.short(), count = records.len(), "Fetched indexer positions");
        Ok(records)
    }
}

#[async_trait]
impl BalanceSource for IndexerClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.ensure_configured().is_ok()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_balances(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>> {
        let path = format!("/{}/erc20", wallet);
        let body = self.get_json(&path, &[("chain", self.chain.as_str())]).await?;
        let records = record_list(NAME, body, "result")?;

        tracing::info!(wallet = %wallet.short(), count = records.len(), "Fetched token balances");
        Ok(records)
    }

    async fn fetch_native_balance(&self, wallet: &WalletAddress) -> PulseResult<Value> {
        let path = format!("/{}/balance", wallet);
        let body = self.get_json(&path, &[("chain", self.chain.as_str())]).await?;

        if !body.is_object() {
            return Err(PulseError::malformed(
                NAME,
                format!("native balance is {} instead of an object", json_type(&body)),
            ));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

    fn client_for(server: &MockServer, api_key: &str, timeout_seconds: u64) -> IndexerClient {
        IndexerClient::new(&IndexerConfig {
            api_key: api_key.to_string(),
            base_url: server.uri(),
            chain: "0x1".to_string(),
            timeout_seconds,
        })
        .unwrap()
    }

    fn wallet() -> WalletAddress {
        WalletAddress::parse(WALLET).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_positions_sends_key_and_unwraps_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/wallets/{}/defi/uniswap-v3/positions", WALLET)))
            .and(header("X-API-Key", "secret"))
            .and(query_param("chain", "0x1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "token_id": "1", "token0_symbol": "ETH", "token1_symbol": "USDC" },
                    { "token_id": "2", "token0_symbol": "WBTC", "token1_symbol": "ETH" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = client_for(&server, "secret", 5).fetch_positions(&wallet()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["token_id"], "1");
    }

    #[tokio::test]
    async fn test_unconfigured_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, "", 5);
        assert!(!PositionSource::is_configured(&client));

        let err = client.fetch_positions(&wallet()).await.unwrap_err();
        assert_eq!(err, PulseError::ProviderUnconfigured("indexer".to_string()));
        let err = client.fetch_balances(&wallet()).await.unwrap_err();
        assert_eq!(err.code(), "PROVIDER_UNCONFIGURED");
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = client_for(&server, "secret", 5).fetch_positions(&wallet()).await.unwrap_err();
        assert_eq!(err.code(), "PROVIDER_UNAVAILABLE");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": { "oops": 1 } })))
            .mount(&server)
            .await;

        let err = client_for(&server, "secret", 5).fetch_positions(&wallet()).await.unwrap_err();
        assert_eq!(err.code(), "PROVIDER_MALFORMED_RESPONSE");
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, "secret", 5).fetch_positions(&wallet()).await.unwrap_err();
        assert_eq!(err.code(), "PROVIDER_MALFORMED_RESPONSE");
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "result": [] }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, "secret", 1).fetch_positions(&wallet()).await.unwrap_err();
        assert!(matches!(err, PulseError::ProviderTimeout { after_ms: 1000, .. }));
    }

    #[tokio::test]
    async fn test_balances_accept_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}/erc20", WALLET)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "symbol": "USDC", "balance_formatted": "100", "usd_price": "1" }
            ])))
            .mount(&server)
            .await;

        let records = client_for(&server, "secret", 5).fetch_balances(&wallet()).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_native_balance_requires_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}/balance", WALLET)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "balance": "1500000000000000000" })))
            .mount(&server)
            .await;

        let body = client_for(&server, "secret", 5).fetch_native_balance(&wallet()).await.unwrap();
        assert_eq!(body["balance"], "1500000000000000000");
    }
}
