//! Amount types with 18-decimal precision
//!
//! Deal amounts are stored as an unsigned count of base units (like wei).
//! Parsing and display go through exact decimal strings so that `0.3`
//! locks exactly `300_000_000_000_000_000` base units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{EscrowError, Result};

/// Number of decimal places carried by every amount
pub const DECIMALS: u32 = 18;

/// Base units per whole coin
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Non-negative fixed-point amount in base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    /// The zero amount
    pub const ZERO: Amount = Amount(0);

    /// Create from base units
    pub fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Raw base units
    pub fn base_units(&self) -> u128 {
        self.0
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parse a non-negative decimal string such as `"1"`, `"0.3"` or `".5"`
    ///
    /// At most 18 fractional digits are accepted; anything that would not
    /// be represented exactly is rejected rather than rounded.
    pub fn parse_decimal(text: &str) -> Result<Self> {
        let text = text.trim();
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(EscrowError::invalid_argument("amount", "empty amount"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(EscrowError::invalid_argument(
                "amount",
                format!("'{}' is not a decimal number", text),
            ));
        }
        if frac.len() > DECIMALS as usize {
            return Err(EscrowError::invalid_argument(
                "amount",
                format!("more than {} fractional digits", DECIMALS),
            ));
        }

        let whole_units = if whole.is_empty() {
            0u128
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| EscrowError::AmountOverflow)?
        };

        let frac_units = if frac.is_empty() {
            0u128
        } else {
            let scale = 10u128.pow(DECIMALS - frac.len() as u32);
            frac.parse::<u128>().map_err(|_| EscrowError::AmountOverflow)? * scale
        };

        whole_units
            .checked_mul(UNIT)
            .and_then(|v| v.checked_add(frac_units))
            .map(Self)
            .ok_or(EscrowError::AmountOverflow)
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(EscrowError::AmountOverflow)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(EscrowError::AmountUnderflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_decimal(s)
    }
}

/// Serde adapter writing an [`Amount`] as a base-unit string
///
/// JSON numbers above 2^53 lose precision in many clients, and
/// internally tagged enums cannot buffer `u128`.
pub mod wei_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&amount.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<u128>()
            .map(Amount)
            .map_err(|e| D::Error::custom(format!("invalid base-unit amount '{}': {}", text, e)))
    }
}
