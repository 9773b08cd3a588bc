//! Conversion of raw provider records into canonical models.
//!
//! Records are read leniently from `serde_json::Value`: a field that is
//! missing or fails to parse takes its documented default instead of failing
//! the record. Only records with no identifiable pool or pair are dropped.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::address::WalletAddress;
use crate::models::{
    NativeBalance, Position, PriceRange, ProviderKind, RangeStatus, TokenBalance, TokenPair,
    WalletSnapshot,
};

/// Output of normalizing a batch of provider records.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    /// Records that were structurally unusable and left out of `items`
    pub dropped: usize,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            dropped: 0,
        }
    }
}

/// Normalize one raw position record.
///
/// Returns `None` only when the record has no identifiable pool or pair.
pub fn normalize(raw: &Value, kind: ProviderKind) -> Option<Position> {
    if !raw.is_object() {
        return None;
    }
    match kind {
        ProviderKind::Indexer => normalize_indexer(raw),
        ProviderKind::Subgraph => normalize_subgraph(raw),
    }
}

pub fn normalize_all(records: &[Value], kind: ProviderKind) -> Normalized<Position> {
    let mut out = Normalized {
        items: Vec::with_capacity(records.len()),
        dropped: 0,
    };

    for (index, record) in records.iter().enumerate() {
        match normalize(record, kind) {
            Some(position) => out.items.push(position),
            None => {
                tracing::debug!(
                    provider = %kind,
                    index = %index,
                    "Dropping position record without pool or pair"
                );
                out.dropped += 1;
            }
        }
    }

    out
}

// -----------------------------------------------------------------------------
// Indexer REST records
// -----------------------------------------------------------------------------

fn normalize_indexer(raw: &Value) -> Option<Position> {
    let pool = text_at(raw, &["pool_address"]);
    let pair = pair_from(text_at(raw, &["token0_symbol"]), text_at(raw, &["token1_symbol"]));
    let pair = match (pool.as_ref(), pair) {
        (None, None) => return None,
        (_, pair) => pair.unwrap_or_else(unknown_pair),
    };

    let id = text_at(raw, &["token_id"])
        .or_else(|| text_at(raw, &["position_id"]))
        .or_else(|| pool.clone())
        .unwrap_or_else(|| pair.to_string());

    // Fee tier is a percentage: 0.3 means 30 bps
    let fee_tier_bps = decimal_opt(at(raw, &["fee_tier"]))
        .and_then(|pct| pct.checked_mul(dec!(100)))
        .and_then(to_bps);

    let price_range = PriceRange::prices(
        decimal_at(raw, &["price_lower"]),
        decimal_at(raw, &["price_upper"]),
    )
    .with_current(decimal_opt(at(raw, &["current_price"])));

    let unclaimed_fees_usd = weighted_sum(&[
        (
            decimal_at(raw, &["unclaimed_fee_token_0_human"]),
            decimal_at(raw, &["token0_price_usd"]),
        ),
        (
            decimal_at(raw, &["unclaimed_fee_token_1_human"]),
            decimal_at(raw, &["token1_price_usd"]),
        ),
    ]);

    Some(Position {
        id,
        provider: ProviderKind::Indexer,
        pair,
        pool,
        fee_tier_bps,
        price_range,
        in_range: range_status(at(raw, &["in_range"])),
        liquidity_usd: decimal_at(raw, &["liquidity_usd"]),
        unclaimed_fees_usd,
        apr_percent: decimal_at(raw, &["apr"]),
        impermanent_loss_percent: decimal_at(raw, &["il_percentage"]),
    })
}

// -----------------------------------------------------------------------------
// Subgraph records
// -----------------------------------------------------------------------------

fn normalize_subgraph(raw: &Value) -> Option<Position> {
    let pool = text_at(raw, &["pool", "id"]);
    let pair = pair_from(
        text_at(raw, &["token0", "symbol"]),
        text_at(raw, &["token1", "symbol"]),
    );
    let pair = match (pool.as_ref(), pair) {
        (None, None) => return None,
        (_, pair) => pair.unwrap_or_else(unknown_pair),
    };

    let id = text_at(raw, &["id"])
        .or_else(|| pool.clone())
        .unwrap_or_else(|| pair.to_string());

    // Hundredths of a basis point: 3000 means 30 bps
    let fee_tier_bps =
        decimal_opt(at(raw, &["pool", "feeTier"])).and_then(|tier| to_bps(tier / dec!(100)));

    let lower = decimal_opt(at(raw, &["tickLower", "tickIdx"]));
    let upper = decimal_opt(at(raw, &["tickUpper", "tickIdx"]));
    let tick = decimal_opt(at(raw, &["pool", "tick"]));

    let in_range = match (lower, upper, tick) {
        (Some(lower), Some(upper), Some(tick)) => RangeStatus::from_bool(lower <= tick && tick < upper),
        _ => RangeStatus::Unknown,
    };

    let eth_price = decimal_at(raw, &["bundle", "ethPriceUSD"]);
    let price0 = mul_or_zero(decimal_at(raw, &["token0", "derivedETH"]), eth_price);
    let price1 = mul_or_zero(decimal_at(raw, &["token1", "derivedETH"]), eth_price);

    let amount0 = net_amount(raw, "depositedToken0", "withdrawnToken0");
    let amount1 = net_amount(raw, "depositedToken1", "withdrawnToken1");
    let liquidity_usd = weighted_sum(&[(amount0, price0), (amount1, price1)]).max(Decimal::ZERO);

    let unclaimed_fees_usd = weighted_sum(&[
        (decimal_at(raw, &["uncollectedFeesToken0"]), price0),
        (decimal_at(raw, &["uncollectedFeesToken1"]), price1),
    ]);

    Some(Position {
        id,
        provider: ProviderKind::Subgraph,
        pair,
        pool,
        fee_tier_bps,
        price_range: PriceRange::ticks(lower.unwrap_or_default(), upper.unwrap_or_default())
            .with_current(tick),
        in_range,
        liquidity_usd,
        unclaimed_fees_usd,
        apr_percent: Decimal::ZERO,
        impermanent_loss_percent: Decimal::ZERO,
    })
}

// -----------------------------------------------------------------------------
// Balances
// -----------------------------------------------------------------------------

/// Normalize one token balance record from the indexer.
pub fn normalize_balance(raw: &Value) -> Option<TokenBalance> {
    if !raw.is_object() {
        return None;
    }

    let balance_formatted = decimal_at(raw, &["balance_formatted"]);
    let usd_price = decimal_at(raw, &["usd_price"]);
    let usd_value = decimal_opt(at(raw, &["usd_value"]))
        .unwrap_or_else(|| mul_or_zero(balance_formatted, usd_price));

    Some(TokenBalance {
        symbol: text_at(raw, &["symbol"]).unwrap_or_else(|| TokenPair::UNKNOWN_SYMBOL.to_string()),
        name: text_at(raw, &["name"]),
        address: text_at(raw, &["token_address"]),
        balance_formatted,
        usd_price,
        usd_value,
    })
}

pub fn normalize_balances(records: &[Value]) -> Normalized<TokenBalance> {
    let mut out = Normalized::default();
    for record in records {
        match normalize_balance(record) {
            Some(balance) => out.items.push(balance),
            None => out.dropped += 1,
        }
    }
    out
}

impl Normalized<TokenBalance> {
    pub fn into_snapshot(self) -> WalletSnapshot {
        WalletSnapshot::new(self.items)
    }
}

/// Normalize a native balance response (`{"balance": "<wei>"}`).
pub fn normalize_native_balance(wallet: &WalletAddress, raw: &Value) -> NativeBalance {
    let balance_wei = text_at(raw, &["balance"]).unwrap_or_else(|| "0".to_string());
    let eth = Decimal::from_str(&balance_wei)
        .ok()
        .and_then(|wei| wei.checked_div(Decimal::from(1_000_000_000_000_000_000u64)))
        .unwrap_or_default()
        .round_dp(4);

    NativeBalance {
        address: wallet.as_str().to_string(),
        balance_wei,
        eth_balance_formatted: eth,
    }
}

// -----------------------------------------------------------------------------
// Field helpers
// -----------------------------------------------------------------------------

fn at<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = raw;
    for key in path {
        current = current.get(key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn text_at(raw: &Value, path: &[&str]) -> Option<String> {
    match at(raw, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal_at(raw: &Value, path: &[&str]) -> Decimal {
    decimal_opt(at(raw, path)).unwrap_or_default()
}

/// Parse a JSON number or numeric string; `None` when absent or unparseable.
pub fn decimal_opt(value: Option<&Value>) -> Option<Decimal> {
    let text = match value? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Parse a JSON bool or boolean-like string into a range status.
pub fn range_status(value: Option<&Value>) -> RangeStatus {
    match value {
        Some(Value::Bool(b)) => RangeStatus::from_bool(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => RangeStatus::InRange,
            "false" | "0" | "no" => RangeStatus::OutOfRange,
            _ => RangeStatus::Unknown,
        },
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => RangeStatus::InRange,
            Some(0) => RangeStatus::OutOfRange,
            _ => RangeStatus::Unknown,
        },
        _ => RangeStatus::Unknown,
    }
}

fn pair_from(token0: Option<String>, token1: Option<String>) -> Option<TokenPair> {
    if token0.is_none() && token1.is_none() {
        return None;
    }
    Some(TokenPair::new(
        token0.unwrap_or_else(|| TokenPair::UNKNOWN_SYMBOL.to_string()),
        token1.unwrap_or_else(|| TokenPair::UNKNOWN_SYMBOL.to_string()),
    ))
}

fn unknown_pair() -> TokenPair {
    TokenPair::new(TokenPair::UNKNOWN_SYMBOL, TokenPair::UNKNOWN_SYMBOL)
}

fn to_bps(value: Decimal) -> Option<u32> {
    if value.is_sign_negative() {
        return None;
    }
    value.round().to_u32()
}

fn net_amount(raw: &Value, deposited: &str, withdrawn: &str) -> Decimal {
    decimal_at(raw, &[deposited])
        .checked_sub(decimal_at(raw, &[withdrawn]))
        .unwrap_or_default()
}

fn mul_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or_default()
}

/// `Σ amount * price`, treating any overflowing term as 0.
fn weighted_sum(terms: &[(Decimal, Decimal)]) -> Decimal {
    terms
        .iter()
        .map(|(amount, price)| mul_or_zero(*amount, *price))
        .fold(Decimal::ZERO, |acc, term| acc.checked_add(term).unwrap_or(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RangeKind;
    use serde_json::json;

    fn indexer_record() -> Value {
        json!({
            "token_id": "481516",
            "token0_symbol": "WETH",
            "token1_symbol": "USDC",
            "pool_address": "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640",
            "fee_tier": "0.05",
            "price_lower": "2200.00",
            "price_upper": 2600,
            "in_range": true,
            "liquidity_usd": "5000",
            "unclaimed_fee_token_0_human": "0.01",
            "unclaimed_fee_token_1_human": "12.5",
            "token0_price_usd": "2387.45",
            "token1_price_usd": 1,
            "apr": 18.2,
            "il_percentage": "-2.3"
        })
    }

    fn subgraph_record() -> Value {
        json!({
            "id": "481516",
            "pool": {
                "id": "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640",
                "feeTier": "500",
                "tick": "201000"
            },
            "token0": { "symbol": "WETH", "derivedETH": "1" },
            "token1": { "symbol": "USDC", "derivedETH": "0.0005" },
            "tickLower": { "tickIdx": "200000" },
            "tickUpper": { "tickIdx": "202000" },
            "depositedToken0": "1.5",
            "withdrawnToken0": "0.5",
            "depositedToken1": "3000",
            "withdrawnToken1": "0",
            "uncollectedFeesToken0": "0.01",
            "uncollectedFeesToken1": "4",
            "bundle": { "ethPriceUSD": "2000" }
        })
    }

    #[test]
    fn test_indexer_record_fully_populated() {
        let position = normalize(&indexer_record(), ProviderKind::Indexer).unwrap();

        assert_eq!(position.id, "481516");
        assert_eq!(position.pair, TokenPair::new("WETH", "USDC"));
        assert_eq!(position.fee_tier_bps, Some(5));
        assert_eq!(position.price_range.range_kind, RangeKind::Price);
        assert_eq!(position.price_range.lower, dec!(2200));
        assert_eq!(position.price_range.upper, dec!(2600));
        assert_eq!(position.in_range, RangeStatus::InRange);
        assert_eq!(position.liquidity_usd, dec!(5000));
        // 0.01 * 2387.45 + 12.5 * 1
        assert_eq!(position.unclaimed_fees_usd, dec!(36.3745));
        assert_eq!(position.apr_percent, dec!(18.2));
        assert_eq!(position.impermanent_loss_percent, dec!(-2.3));
    }

    #[test]
    fn test_unclaimed_fees_are_price_weighted() {
        let raw = json!({
            "token_id": 1,
            "token0_symbol": "DAI",
            "token1_symbol": "USDC",
            "unclaimed_fee_token_0_human": "100",
            "unclaimed_fee_token_1_human": "50",
            "token0_price_usd": "0.999",
            "token1_price_usd": "1.001"
        });
        let position = normalize(&raw, ProviderKind::Indexer).unwrap();
        assert_eq!(position.unclaimed_fees_usd, dec!(149.95));
    }

    #[test]
    fn test_missing_and_malformed_fields_take_defaults() {
        let raw = json!({
            "token_id": 7,
            "token0_symbol": "WETH",
            "fee_tier": "n/a",
            "liquidity_usd": "lots",
            "in_range": "maybe",
            "apr": null,
            "unclaimed_fee_token_0_human": "3"
        });
        let position = normalize(&raw, ProviderKind::Indexer).unwrap();

        assert_eq!(position.id, "7");
        assert_eq!(position.pair, TokenPair::new("WETH", "Unknown"));
        assert_eq!(position.fee_tier_bps, None);
        assert_eq!(position.liquidity_usd, Decimal::ZERO);
        assert_eq!(position.in_range, RangeStatus::Unknown);
        assert_eq!(position.apr_percent, Decimal::ZERO);
        // Fee without a price contributes nothing
        assert_eq!(position.unclaimed_fees_usd, Decimal::ZERO);
    }

    #[test]
    fn test_unidentifiable_records_are_dropped_and_counted() {
        let records = vec![
            indexer_record(),
            json!({ "liquidity_usd": "100" }),
            json!("not an object"),
            json!({ "pool_address": "0xabc" }),
        ];
        let normalized = normalize_all(&records, ProviderKind::Indexer);

        assert_eq!(normalized.items.len(), 2);
        assert_eq!(normalized.dropped, 2);
        let pool_only = &normalized.items[1];
        assert_eq!(pool_only.id, "0xabc");
        assert_eq!(pool_only.pair, TokenPair::new("Unknown", "Unknown"));
    }

    #[test]
    fn test_subgraph_record_uses_ticks_and_derived_prices() {
        let position = normalize(&subgraph_record(), ProviderKind::Subgraph).unwrap();

        assert_eq!(position.fee_tier_bps, Some(5));
        assert_eq!(
            position.price_range,
            PriceRange::ticks(dec!(200000), dec!(202000)).with_current(Some(dec!(201000)))
        );
        assert_eq!(position.in_range, RangeStatus::InRange);
        // 1 WETH * 2000 + 3000 USDC * 1
        assert_eq!(position.liquidity_usd, dec!(5000));
        // 0.01 * 2000 + 4 * 1
        assert_eq!(position.unclaimed_fees_usd, dec!(24));
        assert_eq!(position.apr_percent, Decimal::ZERO);
    }

    #[test]
    fn test_subgraph_tick_at_upper_bound_is_out_of_range() {
        let mut raw = subgraph_record();
        raw["pool"]["tick"] = json!("202000");
        let position = normalize(&raw, ProviderKind::Subgraph).unwrap();
        assert_eq!(position.in_range, RangeStatus::OutOfRange);

        raw["pool"]["tick"] = Value::Null;
        let position = normalize(&raw, ProviderKind::Subgraph).unwrap();
        assert_eq!(position.in_range, RangeStatus::Unknown);
    }

    #[test]
    fn test_cross_provider_consistency() {
        let from_indexer = normalize(&indexer_record(), ProviderKind::Indexer).unwrap();
        let from_subgraph = normalize(&subgraph_record(), ProviderKind::Subgraph).unwrap();

        assert_eq!(from_indexer.pair, from_subgraph.pair);
        assert_eq!(from_indexer.liquidity_usd, from_subgraph.liquidity_usd);
        assert_eq!(from_indexer.in_range, from_subgraph.in_range);
        assert_eq!(from_indexer.fee_tier_bps, from_subgraph.fee_tier_bps);
        assert_ne!(
            from_indexer.price_range.range_kind,
            from_subgraph.price_range.range_kind
        );
    }

    #[test]
    fn test_pair_order_is_preserved() {
        let raw = json!({ "token_id": "1", "token0_symbol": "USDC", "token1_symbol": "WETH" });
        let position = normalize(&raw, ProviderKind::Indexer).unwrap();
        assert_eq!(position.pair.to_string(), "USDC/WETH");
    }

    #[test]
    fn test_balance_value_computed_when_missing() {
        let normalized = normalize_balances(&[
            json!({ "symbol": "LINK", "balance_formatted": "10", "usd_price": "14.2" }),
            json!({ "symbol": "WETH", "balance_formatted": "1", "usd_price": 2400, "usd_value": 2400 }),
            json!(42),
        ]);
        assert_eq!(normalized.dropped, 1);

        let snapshot = normalized.into_snapshot();
        assert_eq!(snapshot.tokens()[0].symbol, "WETH");
        assert_eq!(snapshot.tokens()[1].usd_value, dec!(142.0));
    }

    #[test]
    fn test_native_balance_formatted_to_four_places() {
        let wallet = WalletAddress::parse("0x8ad599c3a0ff1de082011efddc58f1908eb6e6d8").unwrap();
        let native = normalize_native_balance(&wallet, &json!({ "balance": "1234567890000000000" }));
        assert_eq!(native.eth_balance_formatted, dec!(1.2346));
        assert_eq!(native.balance_wei, "1234567890000000000");

        let empty = normalize_native_balance(&wallet, &json!({}));
        assert_eq!(empty.eth_balance_formatted, Decimal::ZERO);
    }

    #[test]
    fn test_numeric_parsing_edge_cases() {
        assert_eq!(decimal_opt(Some(&json!("1e3"))), Some(dec!(1000)));
        assert_eq!(decimal_opt(Some(&json!(" 42.5 "))), Some(dec!(42.5)));
        assert_eq!(decimal_opt(Some(&json!(true))), None);
        assert_eq!(decimal_opt(Some(&json!(""))), None);
        assert_eq!(range_status(Some(&json!("TRUE"))), RangeStatus::InRange);
        assert_eq!(range_status(Some(&json!(0))), RangeStatus::OutOfRange);
    }
}
