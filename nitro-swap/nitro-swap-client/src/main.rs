//! Executes one cross-chain swap end to end

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]

use std::{str::FromStr, sync::Arc, time::Duration};

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use nitro_swap_client::{
    display::format_balance,
    driver::drive_swap,
    input::{is_amount_input_allowed, DestinationToken, SwapInputs},
    router_client::NitroClient,
    spawn_swap_flow,
    telemetry::setup_logging,
    wallet::{AlloyDepositWallet, DepositWallet},
    SwapFlowError,
};
use tracing::{error, info};

use crate::cli::Cli;

mod cli;

/// Entrypoint for the swap binary
#[tokio::main]
async fn main() -> Result<(), SwapFlowError> {
    let cli = Cli::parse();
    setup_logging(cli.json_logs);

    let config = cli.build_config().await?;
    if !is_amount_input_allowed(&cli.amount) {
        return Err(SwapFlowError::parse(format!("not an amount: {}", cli.amount)));
    }

    // Set up the wallet and read the source balance
    let signer = PrivateKeySigner::from_str(&cli.private_key).map_err(SwapFlowError::config)?;
    let wallet = Arc::new(AlloyDepositWallet::new(signer, &cli.rpc_urls())?);
    let source = wallet.token_balance(cli.source_token, cli.source_chain).await?;
    info!(
        "balance: {} {} on {}",
        format_balance(source.balance, source.decimals),
        source.symbol,
        source.chain.label()
    );

    let inputs = SwapInputs {
        source: Some(source),
        destination: Some(DestinationToken {
            address: cli.destination_token,
            chain: cli.destination_chain,
        }),
        amount: cli.amount.clone(),
        refund_address: Some(wallet.address()),
    };
    if !inputs.is_valid() {
        return Err(SwapFlowError::quote_unavailable(
            "amount must be positive and no greater than the balance",
        ));
    }

    // Run the flow
    let router = Arc::new(NitroClient::new(&config)?);
    let handle = spawn_swap_flow(config, router, wallet)?;
    handle.update_inputs(inputs)?;

    let timeout = Duration::from_secs(cli.timeout_secs);
    let res = tokio::time::timeout(timeout, drive_swap(&handle, cli.dry_run)).await.unwrap_or_else(
        |_| Err(SwapFlowError::network_transient("timed out waiting for the swap")),
    );

    handle.shutdown();
    if let Err(e) = &res {
        error!("swap did not complete: {e}");
    }
    res
}
