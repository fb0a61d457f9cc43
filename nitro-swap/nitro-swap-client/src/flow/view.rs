//! What the flow shows the user: the swap button, notices and snapshots

use alloy_primitives::Address;
use chrono::{DateTime, Utc};

use super::state::FlowState;
use crate::{error::SwapFlowError, input::SwapInputs, quote::Quote};

// -------------
// | Constants |
// -------------

/// The button label while a swap can be started
pub const SWAP_LABEL: &str = "Swap Tokens";
/// The button label while a deposit session is active
pub const IN_PROGRESS_LABEL: &str = "Purchase in Progress...";
/// The button label once the swap has settled
pub const SETTLED_LABEL: &str = "Bought Successfully!";
/// The button label once settlement has failed
pub const FAILED_LABEL: &str = "FAILED";
/// The message shown when the last quote fetch failed
pub const QUOTE_ERROR_MESSAGE: &str = "Failed to fetch quote. Please try again.";

// ----------
// | Button |
// ----------

/// The rendered swap button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonView {
    /// The button label
    pub label: &'static str,
    /// Whether the button can be pressed
    pub disabled: bool,
}

/// Render the swap button for a state
///
/// The button is only enabled for a live, unexpired quote while no fetch is
/// loading
pub fn swap_button(state: &FlowState, quote_loading: bool, now: DateTime<Utc>) -> ButtonView {
    let label = match state {
        FlowState::Idle | FlowState::Quoted(_) => SWAP_LABEL,
        FlowState::Locked(_) | FlowState::Polling(_) => IN_PROGRESS_LABEL,
        FlowState::Settled { .. } => SETTLED_LABEL,
        FlowState::Failed { .. } => FAILED_LABEL,
    };

    let disabled = match state {
        FlowState::Quoted(quote) => quote_loading || quote.is_expired_at(now),
        _ => true,
    };

    ButtonView { label, disabled }
}

// -----------
// | Notices |
// -----------

/// A transient notice raised by a flow transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The funding transfer confirmed
    DepositSuccessful,
    /// The router delivered the swap
    SwapCompleted,
    /// The funding transfer was declined or reverted
    TransferFailed(String),
}

impl Notice {
    /// The text shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            Notice::DepositSuccessful => "Deposit successful",
            Notice::SwapCompleted => "Your swap has been completed successfully!",
            Notice::TransferFailed(_) => "Failed!",
        }
    }
}

// ------------
// | Snapshot |
// ------------

/// A point-in-time view of the flow
#[derive(Debug, Clone, Default)]
pub struct FlowSnapshot {
    /// The flow state
    pub state: FlowState,
    /// The current inputs
    pub inputs: SwapInputs,
    /// The current input generation
    pub generation: u64,
    /// Whether a quote fetch for the current inputs is in flight
    pub quote_loading: bool,
    /// Why the last quote fetch failed, if it did
    pub quote_error: Option<SwapFlowError>,
    /// The most recent notice
    pub notice: Option<Notice>,
    /// Bumped every time a notice is raised
    pub notice_seq: u64,
}

impl FlowSnapshot {
    /// The swap button at `now`
    pub fn button_at(&self, now: DateTime<Utc>) -> ButtonView {
        swap_button(&self.state, self.quote_loading, now)
    }

    /// The swap button
    pub fn button(&self) -> ButtonView {
        self.button_at(Utc::now())
    }

    /// The quote being shown or executed
    pub fn quote(&self) -> Option<&Quote> {
        match &self.state {
            FlowState::Quoted(quote) => Some(quote),
            FlowState::Locked(session) | FlowState::Polling(session) => Some(&session.quote),
            _ => None,
        }
    }

    /// The deposit address of the active session
    pub fn deposit_address(&self) -> Option<Address> {
        match &self.state {
            FlowState::Locked(session) | FlowState::Polling(session) => {
                Some(session.deposit_address)
            },
            _ => None,
        }
    }

    /// Whether quote fetching is locked by an active session
    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// The message to show for a failed quote fetch
    pub fn quote_error_message(&self) -> Option<&'static str> {
        self.quote_error.as_ref().map(|_| QUOTE_ERROR_MESSAGE)
    }

    /// The settlement failure, once the flow has failed
    pub fn settlement_error(&self) -> Option<SwapFlowError> {
        match &self.state {
            FlowState::Failed { session, .. } => Some(SwapFlowError::settlement_failed(format!(
                "deposit to {} was not settled",
                session.deposit_address
            ))),
            _ => None,
        }
    }
}
