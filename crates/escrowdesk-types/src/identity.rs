//! Identity types for EscrowDesk
//!
//! Deals are keyed by a dense sequential `DealId`. Parties are 20-byte
//! account addresses written as `0x`-prefixed hex.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{EscrowError, Result};

/// Sequential identifier of a deal, assigned at creation and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(pub u64);

impl DealId {
    /// The raw sequence number
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Position of this deal in the ledger's record list
    ///
    /// Fails with `NotFound` when the id does not fit the platform's
    /// `usize`, since no such deal can be stored.
    pub fn index(&self) -> Result<usize> {
        usize::try_from(self.0).map_err(|_| EscrowError::NotFound { deal_id: *self })
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deal_{}", self.0)
    }
}

impl From<u64> for DealId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Length of an account address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Account address of a deal party (buyer, seller, or any other caller)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartyId([u8; ADDRESS_LEN]);

impl PartyId {
    /// The all-zero address, never accepted as a deal party
    pub const ZERO: PartyId = PartyId([0u8; ADDRESS_LEN]);

    /// Create from raw address bytes
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a `0x`-prefixed, 40-hex-digit address (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| EscrowError::invalid_argument("address", "missing 0x prefix"))?;

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(EscrowError::invalid_argument(
                "address",
                format!("expected {} hex digits, got {}", ADDRESS_LEN * 2, digits.len()),
            ));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| EscrowError::invalid_argument("address", e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartyId({})", self)
    }
}

impl FromStr for PartyId {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PartyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
