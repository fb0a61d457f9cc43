//! API types for the router endpoints

pub mod quote;
pub mod status;

pub use quote::*;
pub use status::*;

// --------------
// | Api Routes |
// --------------

/// The route to fetch a swap quote along with a fresh deposit address
///
/// Expected query parameters, see [`QuoteRequestParams`]
pub const SWAP_QUOTE_ROUTE: &str = "swap-on-nitro";
/// The route to fetch the settlement status of a deposit address
///
/// Expected query parameters, see [`DepositStatusParams`]
pub const DEPOSIT_STATUS_ROUTE: &str = "get-status-by-deposit-address";
