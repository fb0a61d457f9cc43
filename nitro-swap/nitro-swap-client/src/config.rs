//! Configuration for the swap flow
//!
//! The config is fixed once a flow is spawned; changing it requires a restart

use std::time::Duration;

use alloy_primitives::{address, Address};
use nitro_swap_api::DEFAULT_ROUTER_API_BASE_URL;
use serde::{Deserialize, Serialize};

use crate::error::{SwapFlowError, SwapFlowResult};

// -------------
// | Constants |
// -------------

/// The delay after the last amount edit before a quote is fetched
const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// The interval at which a live quote is refreshed
const DEFAULT_REFETCH_INTERVAL_MS: u64 = 60_000; // 1 minute
/// The interval at which the deposit status is polled
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000; // 5 seconds
/// The timeout applied to each router request
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000; // 1 minute
/// The slippage tolerance sent with quote requests, in percent
const DEFAULT_SLIPPAGE_TOLERANCE: &str = "2";
/// The partner id sent with quote requests
const DEFAULT_PARTNER_ID: &str = "0";
/// The destination gas amount sent with quote requests
const DEFAULT_DEST_FUEL: &str = "0";
/// The refund address used when no wallet is connected
const DEFAULT_REFUND_ADDRESS: Address = address!("f768e66c72f6b18192e0c89d38b3028755649853");

/// The configuration of a swap flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapFlowConfig {
    /// The base url of the router API
    pub router_api_base_url: String,
    /// An optional API key sent with every router request
    pub router_api_key: Option<String>,
    /// The debounce applied to amount edits, in milliseconds
    pub debounce_ms: u64,
    /// The quote refresh interval, in milliseconds
    pub refetch_interval_ms: u64,
    /// The settlement poll interval, in milliseconds
    pub poll_interval_ms: u64,
    /// The per-request timeout, in milliseconds
    pub request_timeout_ms: u64,
    /// The slippage tolerance, in percent
    pub slippage_tolerance: String,
    /// The partner id
    pub partner_id: String,
    /// The destination gas amount
    pub dest_fuel: String,
    /// The refund address used when no wallet is connected
    pub default_refund_address: Address,
}

impl Default for SwapFlowConfig {
    fn default() -> Self {
        Self {
            router_api_base_url: DEFAULT_ROUTER_API_BASE_URL.to_string(),
            router_api_key: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            refetch_interval_ms: DEFAULT_REFETCH_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            slippage_tolerance: DEFAULT_SLIPPAGE_TOLERANCE.to_string(),
            partner_id: DEFAULT_PARTNER_ID.to_string(),
            dest_fuel: DEFAULT_DEST_FUEL.to_string(),
            default_refund_address: DEFAULT_REFUND_ADDRESS,
        }
    }
}

impl SwapFlowConfig {
    /// Check that the config is usable
    pub fn validate(&self) -> SwapFlowResult<()> {
        url::Url::parse(&self.router_api_base_url).map_err(|e| {
            SwapFlowError::config(format!(
                "invalid router url {}: {e}",
                self.router_api_base_url
            ))
        })?;

        let intervals = [
            ("debounce_ms", self.debounce_ms),
            ("refetch_interval_ms", self.refetch_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(SwapFlowError::config(format!("{name} must be positive")));
        }

        Ok(())
    }

    /// The amount edit debounce
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The quote refresh interval
    pub fn refetch_interval(&self) -> Duration {
        Duration::from_millis(self.refetch_interval_ms)
    }

    /// The settlement poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
