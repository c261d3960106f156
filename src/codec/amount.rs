//! Major/minor unit conversion for token amounts.

use crate::{ClientError, Result};

/// Minor units per major unit (stroops per token).
pub const MINOR_UNITS_PER_UNIT: i128 = 10_000_000;

/// Convert a caller-supplied amount in major units into minor units,
/// truncating toward zero. Non-positive or non-finite amounts, and amounts
/// that truncate to zero, are rejected.
pub fn to_minor_units(major: f64) -> Result<i128> {
    if !major.is_finite() || major <= 0.0 {
        return Err(ClientError::Encoding(format!(
            "amount must be a positive number, got {}",
            major
        )));
    }
    let scaled = (major * MINOR_UNITS_PER_UNIT as f64).trunc();
    if scaled < 1.0 {
        return Err(ClientError::Encoding(format!(
            "amount {} is smaller than one minor unit",
            major
        )));
    }
    if scaled >= i128::MAX as f64 {
        return Err(ClientError::Encoding(format!("amount {} is too large", major)));
    }
    Ok(scaled as i128)
}

/// Convert minor units back into major units.
pub fn to_major_units(minor: i128) -> f64 {
    minor as f64 / MINOR_UNITS_PER_UNIT as f64
}

/// Render minor units as a major-unit amount with two decimals, rounding
/// half away from zero.
pub fn format_amount(minor: i128) -> String {
    const CENT: i128 = MINOR_UNITS_PER_UNIT / 100;
    let sign = if minor < 0 { "-" } else { "" };
    let magnitude = minor.unsigned_abs();
    let cents = (magnitude + (CENT as u128) / 2) / CENT as u128;
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}
