use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{PulseError, PulseResult};

/// A validated 20-byte EVM account address.
///
/// Provider adapters only accept this type, so an address that failed
/// validation can never reach a network call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress {
    raw: String,
    bytes: [u8; 20],
}

impl WalletAddress {
    pub fn parse(input: &str) -> PulseResult<Self> {
        let digits = input
            .strip_prefix("0x")
            .ok_or_else(|| PulseError::InvalidAddress(input.to_string()))?;

        if digits.len() != 40 {
            return Err(PulseError::InvalidAddress(input.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| PulseError::InvalidAddress(input.to_string()))?;

        Ok(Self {
            raw: input.to_string(),
            bytes,
        })
    }

    /// The address exactly as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn to_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        &self.raw[..10]
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
