//! A cross-chain token purchase flow over the Router Nitro pay API
//!
//! The user picks a source token and amount; the flow fetches a quote with a
//! deposit address, funds the deposit from the connected wallet, then polls
//! the router until the bridged funds are delivered. See [`flow`] for the
//! controller that ties the pieces together.
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod chain;
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod flow;
pub mod input;
pub mod quote;
pub mod quote_fetcher;
pub mod router_client;
pub mod settlement_poller;
pub mod telemetry;
pub mod transfer;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::SwapFlowConfig;
pub use error::{SwapFlowError, SwapFlowResult};
pub use flow::{spawn_swap_flow, FlowHandle, FlowSnapshot, FlowState};
