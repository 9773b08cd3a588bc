//! Error types for Pulse Core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PulseError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Provider not configured: {0}")]
    ProviderUnconfigured(String),

    #[error("Provider {provider} timed out after {after_ms}ms")]
    ProviderTimeout { provider: String, after_ms: u64 },

    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("Provider {provider} returned a malformed response: {reason}")]
    ProviderMalformedResponse { provider: String, reason: String },

    #[error("Aggregation invariant violated: {0}")]
    AggregationInvariantViolation(String),
}

impl PulseError {
    /// Stable machine-readable code, used in diagnostics and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PulseError::InvalidAddress(_) => "INVALID_ADDRESS",
            PulseError::ProviderUnconfigured(_) => "PROVIDER_UNCONFIGURED",
            PulseError::ProviderTimeout { .. } => "PROVIDER_TIMEOUT",
            PulseError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            PulseError::ProviderMalformedResponse { .. } => "PROVIDER_MALFORMED_RESPONSE",
            PulseError::AggregationInvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    /// Upstream faults that a caller could reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PulseError::ProviderTimeout { .. }
                | PulseError::ProviderUnavailable { .. }
                | PulseError::ProviderMalformedResponse { .. }
        )
    }

    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        PulseError::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        PulseError::ProviderMalformedResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

pub type PulseResult<T> = Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_for_provider_faults() {
        let timeout = PulseError::ProviderTimeout {
            provider: "indexer".into(),
            after_ms: 10_000,
        };
        let unavailable = PulseError::unavailable("indexer", "502 Bad Gateway");
        let unconfigured = PulseError::ProviderUnconfigured("indexer".into());

        assert_eq!(timeout.code(), "PROVIDER_TIMEOUT");
        assert_eq!(unavailable.code(), "PROVIDER_UNAVAILABLE");
        assert_eq!(unconfigured.code(), "PROVIDER_UNCONFIGURED");
        assert!(timeout.is_transient());
        assert!(!unconfigured.is_transient());
        assert!(!PulseError::InvalidAddress("0xZZZ".into()).is_transient());
    }
}
