//! Wire types for the Router Nitro pay API consumed by the swap flow
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod serialization;
mod types;
pub use types::*;

/// The default base URL of the Router Nitro pay API
pub const DEFAULT_ROUTER_API_BASE_URL: &str = "https://api.pay.routerprotocol.com";
