//! Money Conversion Module
//!
//! Conversion between the internal minor-unit representation ([`Amount`])
//! and the decimal strings used on the HTTP boundary. The ledger never sees
//! a decimal or a float; everything past the gateway is an integer.
//!
//! ```rust
//! use money_transfer::money::{format_amount, parse_amount};
//!
//! assert_eq!(parse_amount("12.5", 2).unwrap(), 1250);
//! assert_eq!(format_amount(1250, 2), "12.50");
//! ```

use std::str::FromStr;

use rust_decimal::prelude::*;
use thiserror::Error;

use crate::core_types::Amount;

/// Money conversion errors
#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Parse a client decimal string into minor units.
///
/// Rejects `.5`, `5.`, signs, exponents and anything with more fractional
/// digits than `decimals` (no silent truncation). Zero is accepted; whether
/// zero is meaningful is up to the caller.
pub fn parse_amount(amount_str: &str, decimals: u32) -> Result<Amount, MoneyError> {
    let s = amount_str.trim();
    if s.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    if s.starts_with('-') {
        return Err(MoneyError::Negative);
    }
    if s.starts_with('.') || s.ends_with('.') {
        return Err(MoneyError::InvalidFormat(format!(
            "'{s}' (use 0.5 rather than .5 and 5 rather than 5.)"
        )));
    }
    if !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(MoneyError::InvalidFormat(format!("'{s}'")));
    }

    let value = Decimal::from_str(s).map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
    parse_decimal(value, decimals)
}

/// Scale an already-parsed decimal into minor units.
pub fn parse_decimal(value: Decimal, decimals: u32) -> Result<Amount, MoneyError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MoneyError::Negative);
    }

    let value = value.normalize();
    if value.scale() > decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: value.scale(),
            max: decimals,
        });
    }

    let multiplier = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or(MoneyError::Overflow)?;
    value
        .checked_mul(multiplier)
        .and_then(|scaled| scaled.to_u64())
        .ok_or(MoneyError::Overflow)
}

/// Format minor units as a fixed-point string with exactly `decimals` places.
pub fn format_amount(value: Amount, decimals: u32) -> String {
    let mut decimal = Decimal::from(value);
    // Decimal supports at most 28 fractional digits.
    if decimal.set_scale(decimals.min(28)).is_err() {
        return value.to_string();
    }
    decimal.to_string()
}
