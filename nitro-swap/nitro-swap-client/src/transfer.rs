//! Submits the funding transfer of a deposit session

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::SwapFlowError,
    flow::FlowEvent,
    wallet::{DepositWallet, TransferRequest},
};

/// Send the quoted amount to the deposit address and report the outcome
///
/// Any failure before the transfer confirms, including a missing provider
/// for the deposit chain, is reported as a rejection so the quote unlocks
#[instrument(
    skip_all,
    fields(session = %session_id, to = %request.to_address, chain = %request.chain)
)]
pub async fn initiate_transfer(
    wallet: Arc<dyn DepositWallet>,
    session_id: Uuid,
    request: TransferRequest,
    events: UnboundedSender<FlowEvent>,
    cancel: CancellationToken,
) {
    info!(amount = %request.amount, "submitting deposit transfer");
    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("deposit session ended before the transfer resolved");
            return;
        },
        res = wallet.transfer(&request) => res,
    };

    let event = match result {
        Ok(confirmation) => {
            info!(tx_hash = %confirmation.tx_hash, "deposit transfer confirmed");
            FlowEvent::TransferConfirmed { session_id, confirmation }
        },
        Err(e) => {
            warn!("deposit transfer failed: {e}");
            FlowEvent::TransferFailed { session_id, error: as_rejection(e) }
        },
    };

    if events.send(event).is_err() {
        debug!("flow controller stopped before the transfer resolved");
    }
}

/// Normalize a transfer error into a rejection
fn as_rejection(e: SwapFlowError) -> SwapFlowError {
    match e {
        SwapFlowError::TransferRejected(_) => e,
        other => SwapFlowError::transfer_rejected(other),
    }
}
