//! Formatting helpers for quotes and balances

use alloy_primitives::U256;
use chrono::{DateTime, TimeDelta, Utc};

use crate::quote::Quote;

/// The number of decimals shown for the amount received
const RECEIVE_DISPLAY_DECIMALS: u8 = 6;
/// The number of decimals shown for wallet balances
const BALANCE_DISPLAY_DECIMALS: u8 = 4;

/// Render an amount of atoms in whole units, rounded half up to `places`
/// decimals
///
/// Amounts too large to scale are rendered as raw atoms
pub fn format_fixed(amount: U256, decimals: u8, places: u8) -> String {
    scale_fixed(amount, decimals, places).unwrap_or_else(|| amount.to_string())
}

/// Scale and render an amount, or `None` on overflow
fn scale_fixed(amount: U256, decimals: u8, places: u8) -> Option<String> {
    let ten = U256::from(10u64);
    let scaled = if decimals > places {
        let divisor = ten.checked_pow(U256::from(decimals - places))?;
        amount.checked_add(divisor / U256::from(2u64))? / divisor
    } else {
        amount.checked_mul(ten.checked_pow(U256::from(places - decimals))?)?
    };

    if places == 0 {
        return Some(scaled.to_string());
    }

    let unit = ten.checked_pow(U256::from(places))?;
    let whole = scaled / unit;
    let fraction = (scaled % unit).to_string();
    Some(format!("{whole}.{fraction:0>width$}", width = places as usize))
}

/// The "You will receive" line of a quote
pub fn receive_amount(quote: &Quote) -> String {
    let decimals = quote.destination_decimals;
    let amount = format_fixed(quote.destination_amount, decimals, RECEIVE_DISPLAY_DECIMALS);
    format!("{amount} {}", quote.destination_symbol)
}

/// A wallet balance for the token selector
pub fn format_balance(balance: U256, decimals: u8) -> String {
    format_fixed(balance, decimals, BALANCE_DISPLAY_DECIMALS)
}

/// The "Quote expires in" line of a quote
///
/// An expired quote renders how long ago it expired
pub fn expiry_countdown(expiration: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = expiration - now;
    let deadline = expiration.format("%H:%M:%S UTC");
    if remaining > TimeDelta::zero() {
        format!("{deadline} (in {})", format_duration(remaining))
    } else {
        format!("{deadline} (expired {} ago)", format_duration(-remaining))
    }
}

/// Render a non-negative duration as minutes and seconds
fn format_duration(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    format!("{}m {:02}s", secs / 60, secs % 60)
}
