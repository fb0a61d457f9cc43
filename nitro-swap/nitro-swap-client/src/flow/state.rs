//! The swap flow state machine
//!
//! [`FlowMachine`] is pure: it consumes [`FlowEvent`]s and emits the
//! [`FlowCommand`]s the controller must carry out. Events produced for an
//! older input generation or a session that is no longer active are dropped.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    events::{FlowCommand, FlowEvent},
    view::{FlowSnapshot, Notice},
};
use crate::{
    chain::SupportedChain,
    error::{SwapFlowError, SwapFlowResult},
    input::SwapInputs,
    quote::Quote,
    quote_fetcher::QuoteTarget,
    settlement_poller::{SettlementState, SettlementStatus},
    wallet::{TransferConfirmation, TransferRequest},
};

// ---------
// | Types |
// ---------

/// One attempt to settle a quote on-chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositSession {
    /// The session id
    pub id: Uuid,
    /// The quote being executed
    pub quote: Quote,
    /// The input generation the quote was fetched for
    pub generation: u64,
    /// The address the deposit is sent to
    pub deposit_address: Address,
    /// The deposit amount, in atoms of the source token
    pub amount: U256,
    /// The chain the deposit is made on
    pub chain: SupportedChain,
    /// The source token contract
    pub token: Address,
    /// Whether the session holds the quote lock
    pub locked: bool,
    /// The funding transaction, once confirmed
    pub tx_hash: Option<B256>,
    /// The last settlement status observed
    pub last_status: Option<SettlementStatus>,
    /// When the user confirmed the swap
    pub started_at: DateTime<Utc>,
}

impl DepositSession {
    /// Open a locked session for a quote
    pub fn new(id: Uuid, quote: Quote, generation: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            generation,
            deposit_address: quote.deposit_address,
            amount: quote.source_amount,
            chain: quote.deposit_chain,
            token: quote.source_token,
            quote,
            locked: true,
            tx_hash: None,
            last_status: None,
            started_at: now,
        }
    }

    /// Release the quote lock
    fn release(mut self) -> Self {
        self.locked = false;
        self
    }
}

/// The state of the swap flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlowState {
    /// No usable quote
    #[default]
    Idle,
    /// A quote is live and can be confirmed
    Quoted(Quote),
    /// The funding transfer is being submitted
    Locked(DepositSession),
    /// The transfer confirmed; waiting on settlement
    Polling(DepositSession),
    /// The router delivered the swap
    Settled {
        /// The finished session
        session: DepositSession,
        /// The terminal status
        status: SettlementStatus,
    },
    /// The router failed the deposit; terminal
    Failed {
        /// The finished session
        session: DepositSession,
        /// The terminal status
        status: SettlementStatus,
    },
}

impl FlowState {
    /// A short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Quoted(_) => "quoted",
            FlowState::Locked(_) => "locked",
            FlowState::Polling(_) => "polling",
            FlowState::Settled { .. } => "settled",
            FlowState::Failed { .. } => "failed",
        }
    }

    /// Whether a deposit session holds the quote lock
    pub fn is_locked(&self) -> bool {
        matches!(self, FlowState::Locked(_) | FlowState::Polling(_))
    }

    /// Whether fresh quotes may replace the current state
    fn accepts_quotes(&self) -> bool {
        matches!(self, FlowState::Idle | FlowState::Quoted(_) | FlowState::Settled { .. })
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Failed { .. })
    }
}

// -----------
// | Machine |
// -----------

/// The swap flow state machine
#[derive(Debug, Clone)]
pub struct FlowMachine {
    /// The current state
    state: FlowState,
    /// The current inputs
    inputs: SwapInputs,
    /// Bumped on every input change
    generation: u64,
    /// Whether a fetch for the current generation is in flight
    quote_loading: bool,
    /// Why the last fetch for the current generation failed
    quote_error: Option<SwapFlowError>,
    /// The most recent notice
    notice: Option<Notice>,
    /// The number of notices raised
    notice_seq: u64,
    /// The refund address used when no wallet is connected
    default_refund_address: Address,
}

impl FlowMachine {
    /// Create an idle machine
    pub fn new(default_refund_address: Address) -> Self {
        Self {
            state: FlowState::Idle,
            inputs: SwapInputs::default(),
            generation: 0,
            quote_loading: false,
            quote_error: None,
            notice: None,
            notice_seq: 0,
            default_refund_address,
        }
    }

    /// The current state
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// The current input generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A snapshot of the machine
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            state: self.state.clone(),
            inputs: self.inputs.clone(),
            generation: self.generation,
            quote_loading: self.quote_loading,
            quote_error: self.quote_error.clone(),
            notice: self.notice.clone(),
            notice_seq: self.notice_seq,
        }
    }

    /// The quote fetcher target for the current inputs and state
    pub fn quote_target(&self, debounce: bool) -> QuoteTarget {
        let request = if self.state.is_terminal() {
            None
        } else {
            self.inputs.quote_request(self.default_refund_address).ok()
        };

        QuoteTarget {
            generation: self.generation,
            request,
            debounce,
            enabled: !self.state.is_locked() && !self.state.is_terminal(),
        }
    }

    /// Apply an event, returning the commands it triggers
    pub fn handle(&mut self, event: FlowEvent, now: DateTime<Utc>) -> Vec<FlowCommand> {
        if self.state.is_terminal() {
            debug!("flow has failed, ignoring event");
            return vec![];
        }

        let prev = self.state.name();
        let commands = match event {
            FlowEvent::InputsChanged(inputs) => self.on_inputs_changed(inputs),
            FlowEvent::Confirm => self.on_confirm(now),
            FlowEvent::QuoteFetchStarted { generation } => {
                self.on_quote_fetch_started(generation);
                vec![]
            },
            FlowEvent::QuoteFetched { generation, result } => {
                self.on_quote_fetched(generation, result);
                vec![]
            },
            FlowEvent::TransferConfirmed { session_id, confirmation } => {
                self.on_transfer_confirmed(session_id, confirmation)
            },
            FlowEvent::TransferFailed { session_id, error } => {
                self.on_transfer_failed(session_id, error)
            },
            FlowEvent::SettlementUpdate { session_id, status } => {
                self.on_settlement_update(session_id, status)
            },
        };

        let next = self.state.name();
        if prev != next {
            info!("swap flow: {prev} -> {next}");
        }
        commands
    }

    // ------------
    // | Handlers |
    // ------------

    /// Record new inputs; any live quote is superseded
    fn on_inputs_changed(&mut self, inputs: SwapInputs) -> Vec<FlowCommand> {
        if inputs == self.inputs {
            return vec![];
        }

        let debounce = inputs.only_amount_changed(&self.inputs);
        self.inputs = inputs;
        self.generation += 1;
        self.quote_loading = false;
        self.quote_error = None;
        if matches!(self.state, FlowState::Quoted(_)) {
            self.state = FlowState::Idle;
        }

        vec![FlowCommand::UpdateQuoteTarget(self.quote_target(debounce))]
    }

    /// Lock the live quote and submit its transfer
    fn on_confirm(&mut self, now: DateTime<Utc>) -> Vec<FlowCommand> {
        let FlowState::Quoted(quote) = &self.state else {
            debug!("no live quote, ignoring confirm");
            return vec![];
        };
        if self.quote_loading {
            debug!("quote is refreshing, ignoring confirm");
            return vec![];
        }

        if quote.is_expired_at(now) {
            warn!("quote {} expired at {}, refetching", quote.uid, quote.expiration);
            self.state = FlowState::Idle;
            self.generation += 1;
            return vec![FlowCommand::UpdateQuoteTarget(self.quote_target(false))];
        }

        let session = DepositSession::new(Uuid::new_v4(), quote.clone(), self.generation, now);
        let request = TransferRequest::for_quote(&session.quote);
        let session_id = session.id;
        info!(%session_id, deposit_address = %session.deposit_address, "opening deposit session");

        self.state = FlowState::Locked(session);
        vec![
            FlowCommand::UpdateQuoteTarget(self.quote_target(false)),
            FlowCommand::SubmitTransfer { session_id, request },
        ]
    }

    /// Mark the current generation as loading
    fn on_quote_fetch_started(&mut self, generation: u64) {
        if generation == self.generation && self.state.accepts_quotes() {
            self.quote_loading = true;
        }
    }

    /// Accept a quote for the current generation
    fn on_quote_fetched(&mut self, generation: u64, result: SwapFlowResult<Quote>) {
        if generation != self.generation || !self.state.accepts_quotes() {
            debug!(generation, current = self.generation, "dropping stale quote result");
            return;
        }

        self.quote_loading = false;
        match result {
            Ok(quote) => {
                self.quote_error = None;
                self.state = FlowState::Quoted(quote);
            },
            Err(e) => self.quote_error = Some(e),
        }
    }

    /// Move a confirmed session on to settlement polling
    fn on_transfer_confirmed(
        &mut self,
        session_id: Uuid,
        confirmation: TransferConfirmation,
    ) -> Vec<FlowCommand> {
        let FlowState::Locked(session) = &mut self.state else {
            debug!(%session_id, "no transfer in flight, dropping confirmation");
            return vec![];
        };
        if session.id != session_id {
            debug!(%session_id, "dropping confirmation for stale session");
            return vec![];
        }

        session.tx_hash = Some(confirmation.tx_hash);
        let command = FlowCommand::StartPolling {
            session_id,
            deposit_address: session.deposit_address,
            chain: session.chain,
        };

        let session = session.clone();
        self.state = FlowState::Polling(session);
        self.raise(Notice::DepositSuccessful);
        vec![command]
    }

    /// Unlock the quote after a rejected transfer
    fn on_transfer_failed(&mut self, session_id: Uuid, error: SwapFlowError) -> Vec<FlowCommand> {
        let session = match std::mem::take(&mut self.state) {
            FlowState::Locked(session) if session.id == session_id => session,
            other => {
                self.state = other;
                debug!(%session_id, "dropping transfer failure for stale session");
                return vec![];
            },
        };

        warn!(%session_id, "deposit transfer failed: {error}");
        self.state = if session.generation == self.generation {
            FlowState::Quoted(session.quote)
        } else {
            FlowState::Idle
        };
        self.raise(Notice::TransferFailed(error.to_string()));

        vec![
            FlowCommand::EndSession { session_id },
            FlowCommand::UpdateQuoteTarget(self.quote_target(false)),
        ]
    }

    /// Record a settlement status, finishing the session if it is terminal
    fn on_settlement_update(
        &mut self,
        session_id: Uuid,
        status: SettlementStatus,
    ) -> Vec<FlowCommand> {
        let mut session = match std::mem::take(&mut self.state) {
            FlowState::Polling(session) if session.id == session_id => session,
            other => {
                self.state = other;
                debug!(%session_id, "dropping settlement status for stale session");
                return vec![];
            },
        };

        match status.state {
            SettlementState::Pending => {
                session.last_status = Some(status);
                self.state = FlowState::Polling(session);
                vec![]
            },
            SettlementState::Success => {
                info!(%session_id, relay_txn = ?status.relay_txn, "swap settled");
                let session = session.release();
                self.state = FlowState::Settled { session, status };
                self.raise(Notice::SwapCompleted);
                vec![
                    FlowCommand::EndSession { session_id },
                    FlowCommand::UpdateQuoteTarget(self.quote_target(false)),
                ]
            },
            SettlementState::Failed => {
                warn!(%session_id, "router failed the deposit");
                let session = session.release();
                self.state = FlowState::Failed { session, status };
                self.quote_loading = false;
                vec![FlowCommand::EndSession { session_id }, FlowCommand::StopQuoting]
            },
        }
    }

    /// Raise a notice
    fn raise(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_seq += 1;
    }
}
