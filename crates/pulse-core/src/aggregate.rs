//! Portfolio-level statistics over normalized positions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{PulseError, PulseResult};
use crate::models::{PortfolioSummary, Position, RangeStatus, WalletSnapshot};

/// Label used for positions whose provider did not report a fee tier.
pub const UNKNOWN_FEE_TIER: &str = "unknown";

/// Reduce positions (and optionally wallet balances) into a summary.
///
/// Empty input yields an all-zero summary. Averages and the health score are
/// rounded to 2 decimal places; USD totals are exact.
pub fn aggregate(positions: &[Position], balances: Option<&WalletSnapshot>) -> PortfolioSummary {
    let mut summary = PortfolioSummary {
        position_count: positions.len(),
        ..PortfolioSummary::default()
    };
    let mut apr_sum = Decimal::ZERO;

    for position in positions {
        summary.total_value_locked_usd = summary
            .total_value_locked_usd
            .saturating_add(position.liquidity_usd);
        summary.total_unclaimed_fees_usd = summary
            .total_unclaimed_fees_usd
            .saturating_add(position.unclaimed_fees_usd);
        apr_sum = apr_sum.saturating_add(position.apr_percent);

        match position.in_range {
            RangeStatus::InRange => summary.in_range_count += 1,
            RangeStatus::OutOfRange => summary.out_of_range_count += 1,
            RangeStatus::Unknown => {
                summary.out_of_range_count += 1;
                summary.unknown_range_count += 1;
            }
        }

        summary
            .fee_tier_breakdown
            .add(&fee_tier_label(position.fee_tier_bps), position.liquidity_usd);
    }

    if !positions.is_empty() {
        summary.average_apr_percent = (apr_sum / Decimal::from(positions.len())).round_dp(2);
    }

    let denominator = Decimal::from(positions.len().max(1));
    summary.health_score_percent =
        (Decimal::from(summary.in_range_count) * dec!(100) / denominator).round_dp(2);

    if let Some(snapshot) = balances {
        summary.wallet_value_usd = snapshot.total_usd();
        summary.token_count = snapshot.len();
    }

    summary
}

/// `"<percent>%"` for a fee tier in basis points, e.g. 5 → `"0.05%"`.
pub fn fee_tier_label(fee_tier_bps: Option<u32>) -> String {
    match fee_tier_bps {
        Some(bps) => format!("{}%", Decimal::new(i64::from(bps), 2).normalize()),
        None => UNKNOWN_FEE_TIER.to_string(),
    }
}

/// Verify that a summary is internally consistent.
pub fn check_invariants(summary: &PortfolioSummary) -> PulseResult<()> {
    let totals = [
        ("total_value_locked_usd".to_string(), summary.total_value_locked_usd),
        ("total_unclaimed_fees_usd".to_string(), summary.total_unclaimed_fees_usd),
        ("wallet_value_usd".to_string(), summary.wallet_value_usd),
    ];
    let tiers = summary
        .fee_tier_breakdown
        .iter()
        .map(|(label, value)| (format!("fee tier {}", label), value));

    let negative = totals
        .into_iter()
        .chain(tiers)
        .find(|(_, value)| value.is_sign_negative() && !value.is_zero());

    if let Some((field, value)) = negative {
        return Err(PulseError::AggregationInvariantViolation(format!(
            "{} is negative ({})",
            field, value
        )));
    }

    if summary.health_score_percent < Decimal::ZERO || summary.health_score_percent > dec!(100) {
        return Err(PulseError::AggregationInvariantViolation(format!(
            "health score {} outside [0, 100]",
            summary.health_score_percent
        )));
    }

    if summary.in_range_count + summary.out_of_range_count != summary.position_count
        || summary.unknown_range_count > summary.out_of_range_count
    {
        return Err(PulseError::AggregationInvariantViolation(format!(
            "range counts ({} in, {} out, {} unknown) do not partition {} positions",
            summary.in_range_count,
            summary.out_of_range_count,
            summary.unknown_range_count,
            summary.position_count
        )));
    }

    Ok(())
}

/// Clamp negative totals to zero. Returns true if anything was changed.
pub fn clamp_invariants(summary: &mut PortfolioSummary) -> bool {
    let mut clamped = false;

    for value in [
        &mut summary.total_value_locked_usd,
        &mut summary.total_unclaimed_fees_usd,
        &mut summary.wallet_value_usd,
    ]
    .into_iter()
    .chain(summary.fee_tier_breakdown.values_mut())
    {
        if value.is_sign_negative() && !value.is_zero() {
            *value = Decimal::ZERO;
            clamped = true;
        }
    }

    let bounded = summary.health_score_percent.clamp(Decimal::ZERO, dec!(100));
    if bounded != summary.health_score_percent {
        summary.health_score_percent = bounded;
        clamped = true;
    }

    clamped
}
