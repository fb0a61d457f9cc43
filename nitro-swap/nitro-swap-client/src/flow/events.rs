//! Messages into and out of the flow state machine

use alloy_primitives::Address;
use uuid::Uuid;

use crate::{
    chain::SupportedChain,
    error::{SwapFlowError, SwapFlowResult},
    input::SwapInputs,
    quote::Quote,
    quote_fetcher::QuoteTarget,
    settlement_poller::SettlementStatus,
    wallet::{TransferConfirmation, TransferRequest},
};

/// An event handled by the flow controller
#[derive(Debug, Clone)]
pub enum FlowEvent {
    // --- User Actions --- //
    /// The user edited the swap inputs
    InputsChanged(SwapInputs),
    /// The user pressed the swap button
    Confirm,

    // --- Quote Fetcher --- //
    /// A fetch was issued for the given input generation
    QuoteFetchStarted {
        /// The generation being fetched
        generation: u64,
    },
    /// A fetch for the given input generation completed
    QuoteFetched {
        /// The generation that was fetched
        generation: u64,
        /// The quote, or why none is available
        result: SwapFlowResult<Quote>,
    },

    // --- Deposit Session --- //
    /// The funding transfer was included on-chain
    TransferConfirmed {
        /// The session the transfer belongs to
        session_id: Uuid,
        /// The confirmed transfer
        confirmation: TransferConfirmation,
    },
    /// The funding transfer was declined or reverted
    TransferFailed {
        /// The session the transfer belongs to
        session_id: Uuid,
        /// The rejection
        error: SwapFlowError,
    },
    /// The poller observed a settlement status
    SettlementUpdate {
        /// The session being polled for
        session_id: Uuid,
        /// The observed status
        status: SettlementStatus,
    },
}

/// A side effect requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowCommand {
    /// Replace the quote fetcher's target
    UpdateQuoteTarget(QuoteTarget),
    /// Submit the funding transfer for a session
    SubmitTransfer {
        /// The session the transfer belongs to
        session_id: Uuid,
        /// The transfer to submit
        request: TransferRequest,
    },
    /// Start polling the settlement status of a session's deposit
    StartPolling {
        /// The session to poll for
        session_id: Uuid,
        /// The deposit address
        deposit_address: Address,
        /// The deposit chain
        chain: SupportedChain,
    },
    /// Stop all work belonging to a session
    EndSession {
        /// The session to end
        session_id: Uuid,
    },
    /// Stop fetching quotes for good
    StopQuoting,
}
