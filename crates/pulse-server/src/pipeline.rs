//! Per-request orchestration: fetch, normalize, aggregate, decide.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::OptionFuture;
use pulse_core::{
    aggregate, check_invariants, clamp_invariants, decide, illustrative_positions, normalize_all,
    normalize_balances, normalize_native_balance, Diagnostics, FallbackState, FetchFailure,
    FetchSource, NativeBalance, Normalized, PortfolioSummary, Position, PrimaryStatus, PulseError,
    PulseResult, WalletAddress, WalletSnapshot,
};
use serde_json::Value;
use uuid::Uuid;

use crate::providers::{BalanceSource, PositionSource};

/// Which adapters a request needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchPlan {
    pub positions: bool,
    pub balances: bool,
    pub native: bool,
}

impl FetchPlan {
    pub fn positions() -> Self {
        Self { positions: true, ..Self::default() }
    }

    pub fn portfolio() -> Self {
        Self::full()
    }

    pub fn tokens() -> Self {
        Self { balances: true, ..Self::default() }
    }

    pub fn native() -> Self {
        Self { native: true, ..Self::default() }
    }

    pub fn full() -> Self {
        Self { positions: true, balances: true, native: true }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub wallet: WalletAddress,
    /// Live positions, or the illustrative dataset in the `FALLBACK` state
    pub positions: Vec<Position>,
    pub snapshot: WalletSnapshot,
    pub native: Option<NativeBalance>,
    pub summary: PortfolioSummary,
    pub diagnostics: Diagnostics,
}

pub struct Pipeline {
    primary: Arc<dyn PositionSource>,
    balances: Option<Arc<dyn BalanceSource>>,
    strict_invariants: bool,
}

impl Pipeline {
    pub fn new(
        primary: Arc<dyn PositionSource>,
        balances: Option<Arc<dyn BalanceSource>>,
        strict_invariants: bool,
    ) -> Self {
        Self {
            primary,
            balances,
            strict_invariants,
        }
    }

    pub fn primary(&self) -> &dyn PositionSource {
        self.primary.as_ref()
    }

    pub fn balances(&self) -> Option<&dyn BalanceSource> {
        self.balances.as_deref()
    }

    /// Run one request.
    ///
    /// Fails only on an invalid address (before any adapter is called) or, in
    /// strict mode, on an invariant violation. Provider faults are reported in
    /// the returned diagnostics.
    pub async fn run(&self, wallet: &str, plan: FetchPlan) -> PulseResult<PipelineOutput> {
        let start = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let wallet = WalletAddress::parse(wallet)?;

        tracing::debug!(
            request_id = %request_id,
            wallet = %wallet,
            plan = ?plan,
            "Running pipeline"
        );

        let (positions, balances, native) = futures::join!(
            OptionFuture::from(plan.positions.then(|| self.fetch_positions(&wallet))),
            OptionFuture::from(plan.balances.then(|| self.fetch_balances(&wallet))),
            OptionFuture::from(plan.native.then(|| self.fetch_native(&wallet)))
        );

        let mut failures = Vec::new();
        let mut dropped_records = 0;

        let snapshot = match balances {
            Some(Ok(records)) => {
                let normalized = normalize_balances(&records);
                dropped_records += normalized.dropped;
                normalized.into_snapshot()
            }
            Some(Err(e)) => {
                failures.push(FetchFailure::new(FetchSource::Balances, &e));
                WalletSnapshot::default()
            }
            None => WalletSnapshot::default(),
        };

        let native = match native {
            Some(Ok(raw)) => Some(normalize_native_balance(&wallet, &raw)),
            Some(Err(e)) => {
                failures.push(FetchFailure::new(FetchSource::NativeBalance, &e));
                None
            }
            None => None,
        };

        let kind = self.primary.kind();
        let primary: Option<PulseResult<Normalized<Position>>> =
            positions.map(|result| result.map(|records| normalize_all(&records, kind)));

        let status = match &primary {
            Some(Ok(normalized)) => Some(PrimaryStatus::Fetched {
                positions: normalized.items.len(),
                dropped: normalized.dropped,
            }),
            Some(Err(e)) => Some(PrimaryStatus::Failed(e)),
            None => None,
        };
        let decision = decide(status, !failures.is_empty());

        let positions = if decision.state == FallbackState::Fallback {
            match &primary {
                Some(Err(e)) => failures.insert(0, FetchFailure::new(FetchSource::Positions, e)),
                Some(Ok(normalized)) => dropped_records += normalized.dropped,
                None => {}
            }
            illustrative_positions()
        } else {
            match primary {
                Some(Ok(normalized)) => {
                    dropped_records += normalized.dropped;
                    normalized.items
                }
                _ => Vec::new(),
            }
        };

        let mut summary = aggregate(&positions, plan.balances.then_some(&snapshot));

        let mut diagnostics = Diagnostics::new(request_id, decision);
        diagnostics.dropped_records = dropped_records;
        diagnostics.failed_fetches = failures;
        diagnostics.primary_provider = plan.positions.then_some(kind);

        if let Err(violation) = check_invariants(&summary) {
            if self.strict_invariants {
                tracing::error!(
                    request_id = %diagnostics.request_id,
                    error = %violation,
                    "Rejecting summary that violates invariants"
                );
                return Err(violation);
            }
            tracing::warn!(
                request_id = %diagnostics.request_id,
                error = %violation,
                "Clamping summary that violates invariants"
            );
            diagnostics.invariant_clamped = clamp_invariants(&mut summary);
        }

        tracing::info!(
            request_id = %diagnostics.request_id,
            wallet = %wallet,
            state = ?diagnostics.state,
            reason = ?diagnostics.reason,
            positions = positions.len(),
            tokens = snapshot.len(),
            dropped = diagnostics.dropped_records,
            failed = diagnostics.failed_fetches.len(),
            duration_ms = %start.elapsed().as_millis(),
            "Pipeline completed"
        );

        Ok(PipelineOutput {
            wallet,
            positions,
            snapshot,
            native,
            summary,
            diagnostics,
        })
    }

    async fn fetch_positions(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>> {
        let source = self.primary.as_ref();
        let provider = source.kind().to_string();
        bounded(&provider, source.timeout(), source.fetch_positions(wallet)).await
    }

    async fn fetch_balances(&self, wallet: &WalletAddress) -> PulseResult<Vec<Value>> {
        let source = self.balance_source()?;
        bounded(source.name(), source.timeout(), source.fetch_balances(wallet)).await
    }

    async fn fetch_native(&self, wallet: &WalletAddress) -> PulseResult<Value> {
        let source = self.balance_source()?;
        bounded(source.name(), source.timeout(), source.fetch_native_balance(wallet)).await
    }

    fn balance_source(&self) -> PulseResult<&dyn BalanceSource> {
        self.balances
            .as_deref()
            .ok_or_else(|| PulseError::ProviderUnconfigured("balances".to_string()))
    }
}

/// Await `fetch`, giving up after `limit`.
async fn bounded<T>(
    provider: &str,
    limit: Duration,
    fetch: impl Future<Output = PulseResult<T>>,
) -> PulseResult<T> {
    match tokio::time::timeout(limit, fetch).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(provider = %provider, timeout_ms = %limit.as_millis(), "Fetch timed out");
            Err(PulseError::ProviderTimeout {
                provider: provider.to_string(),
                after_ms: limit.as_millis() as u64,
            })
        }
    }
}
