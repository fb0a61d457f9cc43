//! CLI argument definition & parsing for the swap binary

use std::collections::HashMap;

use alloy_primitives::Address;
use clap::Parser;
use nitro_swap_client::{chain::SupportedChain, SwapFlowConfig, SwapFlowError, SwapFlowResult};
use tokio::fs::read_to_string;

/// The default time allowed for a swap to settle, in seconds
const DEFAULT_SWAP_TIMEOUT_SECS: u64 = 900; // 15 minutes

/// Buy a token on one chain with a token held on another
#[rustfmt::skip]
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // --- Swap --- //

    /// The chain holding the token being sold
    #[arg(long, env = "SOURCE_CHAIN", default_value = "bsc")]
    pub source_chain: SupportedChain,
    /// The token being sold
    #[arg(long, env = "SOURCE_TOKEN")]
    pub source_token: Address,
    /// The chain the bought token is delivered on
    #[arg(long, env = "DESTINATION_CHAIN", default_value = "base")]
    pub destination_chain: SupportedChain,
    /// The token being bought
    #[arg(long, env = "DESTINATION_TOKEN")]
    pub destination_token: Address,
    /// The amount to sell, in whole units of the source token
    #[arg(long)]
    pub amount: String,
    /// Print the quote without executing it
    #[arg(long)]
    pub dry_run: bool,
    /// The time allowed for the swap to settle, in seconds
    #[arg(long, default_value_t = DEFAULT_SWAP_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    // --- Wallet --- //

    /// The private key funding the deposit
    #[arg(long, env = "PRIVATE_KEY")]
    pub private_key: String,
    /// The RPC url for BSC
    #[arg(long, env = "BSC_RPC_URL")]
    pub bsc_rpc_url: Option<String>,
    /// The RPC url for Base
    #[arg(long, env = "BASE_RPC_URL")]
    pub base_rpc_url: Option<String>,
    /// The RPC url for Arbitrum
    #[arg(long, env = "ARBITRUM_RPC_URL")]
    pub arbitrum_rpc_url: Option<String>,

    // --- Router --- //

    /// Path to a JSON file overriding the flow config
    #[arg(long, env = "SWAP_CONFIG_PATH")]
    pub config_path: Option<String>,
    /// The base url of the router API
    #[arg(long, env = "ROUTER_API_URL")]
    pub router_api_url: Option<String>,
    /// The router API key
    #[arg(long, env = "ROUTER_API_KEY")]
    pub router_api_key: Option<String>,

    // --- Telemetry --- //

    /// Whether to emit JSON formatted logs
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// Build the flow config from the config file and flags
    ///
    /// Flags take precedence over the file
    pub async fn build_config(&self) -> SwapFlowResult<SwapFlowConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let contents = read_to_string(path)
                    .await
                    .map_err(|e| SwapFlowError::config(format!("failed to read {path}: {e}")))?;
                serde_json::from_str(&contents).map_err(SwapFlowError::config)?
            },
            None => SwapFlowConfig::default(),
        };

        if let Some(url) = &self.router_api_url {
            config.router_api_base_url = url.clone();
        }
        if let Some(key) = &self.router_api_key {
            config.router_api_key = Some(key.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// The configured RPC urls, by chain
    pub fn rpc_urls(&self) -> HashMap<SupportedChain, String> {
        [
            (SupportedChain::Bsc, &self.bsc_rpc_url),
            (SupportedChain::Base, &self.base_rpc_url),
            (SupportedChain::Arbitrum, &self.arbitrum_rpc_url),
        ]
        .into_iter()
        .filter_map(|(chain, url)| url.clone().map(|url| (chain, url)))
        .collect()
    }
}
