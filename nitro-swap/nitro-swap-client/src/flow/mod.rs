//! The flow controller: owns the swap state and drives the fetcher, the
//! transfer and the settlement poller
//!
//! All events are serialized through a single task. The state is published on
//! a `watch` channel as [`FlowSnapshot`]s; the user interacts through a
//! [`FlowHandle`]. Dropping the last handle tears the flow down.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    watch,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::SwapFlowConfig,
    error::{SwapFlowError, SwapFlowResult},
    input::SwapInputs,
    quote_fetcher::{QuoteFetcher, QuoteTarget},
    router_client::RoutingApi,
    settlement_poller::SettlementPoller,
    transfer::initiate_transfer,
    wallet::DepositWallet,
};

mod events;
mod state;
mod view;

pub use events::{FlowCommand, FlowEvent};
pub use state::{DepositSession, FlowMachine, FlowState};
pub use view::{
    swap_button, ButtonView, FlowSnapshot, Notice, FAILED_LABEL, IN_PROGRESS_LABEL,
    QUOTE_ERROR_MESSAGE, SETTLED_LABEL, SWAP_LABEL,
};

/// The error returned once the controller has stopped
const FLOW_STOPPED: &str = "swap flow has shut down";

// ----------
// | Handle |
// ----------

/// A handle to a running swap flow
#[derive(Clone)]
pub struct FlowHandle {
    /// The controller's event channel
    events: UnboundedSender<FlowEvent>,
    /// The published snapshots
    snapshots: watch::Receiver<FlowSnapshot>,
    /// The flow's root token
    cancel: CancellationToken,
    /// Cancels the root token when the last handle is dropped
    _guard: Arc<DropGuard>,
}

impl FlowHandle {
    /// Replace the swap inputs
    pub fn update_inputs(&self, inputs: SwapInputs) -> SwapFlowResult<()> {
        self.send(FlowEvent::InputsChanged(inputs))
    }

    /// Press the swap button
    pub fn confirm(&self) -> SwapFlowResult<()> {
        self.send(FlowEvent::Confirm)
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshots.clone()
    }

    /// The latest snapshot
    pub fn snapshot(&self) -> FlowSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait for a snapshot matching `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&FlowSnapshot) -> bool,
    ) -> SwapFlowResult<FlowSnapshot> {
        let mut rx = self.subscribe();
        let snapshot =
            rx.wait_for(predicate).await.map_err(|_| SwapFlowError::setup(FLOW_STOPPED))?;
        Ok(snapshot.clone())
    }

    /// Stop the flow and every task it owns
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Send an event to the controller
    fn send(&self, event: FlowEvent) -> SwapFlowResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SwapFlowError::setup(FLOW_STOPPED));
        }
        self.events.send(event).map_err(|_| SwapFlowError::setup(FLOW_STOPPED))
    }
}

/// Start a swap flow on the current tokio runtime
pub fn spawn_swap_flow(
    config: SwapFlowConfig,
    router: Arc<dyn RoutingApi>,
    wallet: Arc<dyn DepositWallet>,
) -> SwapFlowResult<FlowHandle> {
    config.validate()?;

    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = unbounded_channel();
    let (targets_tx, targets_rx) = watch::channel(QuoteTarget::default());

    let machine = FlowMachine::new(config.default_refund_address);
    let (snapshots_tx, snapshots_rx) = watch::channel(machine.snapshot());

    let fetcher_cancel = cancel.child_token();
    let fetcher = QuoteFetcher::new(
        router.clone(),
        config.clone(),
        targets_rx,
        events_tx.clone(),
        fetcher_cancel.clone(),
    );
    tokio::spawn(fetcher.run());

    let controller = FlowController {
        machine,
        config,
        router,
        wallet,
        events_rx,
        events_tx: events_tx.clone(),
        targets: targets_tx,
        snapshots: snapshots_tx,
        cancel: cancel.clone(),
        fetcher_cancel,
        session: None,
    };
    tokio::spawn(controller.run());

    let guard = Arc::new(cancel.clone().drop_guard());
    Ok(FlowHandle { events: events_tx, snapshots: snapshots_rx, cancel, _guard: guard })
}

// --------------
// | Controller |
// --------------

/// The task that owns the flow state
struct FlowController {
    /// The state machine
    machine: FlowMachine,
    /// The flow config
    config: SwapFlowConfig,
    /// The router client
    router: Arc<dyn RoutingApi>,
    /// The deposit wallet
    wallet: Arc<dyn DepositWallet>,
    /// Incoming events
    events_rx: UnboundedReceiver<FlowEvent>,
    /// A sender handed to spawned tasks
    events_tx: UnboundedSender<FlowEvent>,
    /// The quote fetcher's target
    targets: watch::Sender<QuoteTarget>,
    /// Published snapshots
    snapshots: watch::Sender<FlowSnapshot>,
    /// The flow's root token
    cancel: CancellationToken,
    /// The quote fetcher's token
    fetcher_cancel: CancellationToken,
    /// The active session and the token its tasks hold
    session: Option<(Uuid, CancellationToken)>,
}

impl FlowController {
    /// Handle events until the flow is torn down
    async fn run(mut self) {
        info!("swap flow started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        if let Some((_, token)) = self.session.take() {
            token.cancel();
        }
        self.fetcher_cancel.cancel();
        info!("swap flow stopped");
    }

    /// Apply an event and publish the resulting snapshot
    fn handle_event(&mut self, event: FlowEvent) {
        let commands = self.machine.handle(event, Utc::now());
        for command in commands {
            self.execute(command);
        }

        self.snapshots.send_replace(self.machine.snapshot());
    }

    /// Carry out a command
    fn execute(&mut self, command: FlowCommand) {
        match command {
            FlowCommand::UpdateQuoteTarget(target) => {
                self.targets.send_replace(target);
            },
            FlowCommand::SubmitTransfer { session_id, request } => {
                let cancel = self.session_token(session_id);
                tokio::spawn(initiate_transfer(
                    self.wallet.clone(),
                    session_id,
                    request,
                    self.events_tx.clone(),
                    cancel,
                ));
            },
            FlowCommand::StartPolling { session_id, deposit_address, chain } => {
                let poller = SettlementPoller::new(
                    self.router.clone(),
                    session_id,
                    deposit_address,
                    chain,
                    self.config.poll_interval(),
                    self.events_tx.clone(),
                    self.session_token(session_id),
                );
                tokio::spawn(poller.run());
            },
            FlowCommand::EndSession { session_id } => match self.session.take() {
                Some((id, token)) if id == session_id => token.cancel(),
                other => self.session = other,
            },
            FlowCommand::StopQuoting => {
                debug!("stopping quote fetcher");
                self.targets.send_replace(self.machine.quote_target(false));
                self.fetcher_cancel.cancel();
            },
        }
    }

    /// The token for a session's tasks, replacing any older session's
    fn session_token(&mut self, session_id: Uuid) -> CancellationToken {
        if let Some((id, token)) = &self.session {
            if *id == session_id {
                return token.clone();
            }
        }

        if let Some((_, stale)) = self.session.take() {
            stale.cancel();
        }
        let token = self.cancel.child_token();
        self.session = Some((session_id, token.clone()));
        token
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use nitro_swap_api::ApiDepositStatus;

    use super::*;
    use crate::test_helpers::{mock_inputs, status_response, MockRouter, MockWallet};

    /// Spawn a flow over the given mocks
    fn spawn(router: &Arc<MockRouter>, wallet: &Arc<MockWallet>) -> FlowHandle {
        spawn_swap_flow(SwapFlowConfig::default(), router.clone(), wallet.clone()).unwrap()
    }

    /// Enter valid inputs and wait for the first quote
    async fn quoted(handle: &FlowHandle) -> FlowSnapshot {
        handle.update_inputs(mock_inputs("100")).unwrap();
        handle.wait_for(|s| matches!(s.state, FlowState::Quoted(_))).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_settles() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        router.push_status(Ok(status_response(ApiDepositStatus::Pending)));
        router.push_status(Ok(status_response(ApiDepositStatus::Success)));
        let handle = spawn(&router, &wallet);

        let snapshot = quoted(&handle).await;
        assert!(!snapshot.button().disabled);
        assert_eq!(snapshot.button().label, "Swap Tokens");

        handle.confirm().unwrap();
        let settled =
            handle.wait_for(|s| matches!(s.state, FlowState::Settled { .. })).await.unwrap();

        assert_eq!(wallet.transfer_calls.load(Ordering::SeqCst), 1);
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(settled.notice, Some(Notice::SwapCompleted));
        assert_eq!(settled.deposit_address(), None);
        assert_eq!(settled.button().label, "Bought Successfully!");

        // Polling stays stopped after success
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_quotes_while_locked() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        wallet.set_delay(Duration::from_secs(180));
        let handle = spawn(&router, &wallet);

        quoted(&handle).await;
        handle.confirm().unwrap();
        handle.wait_for(|s| s.is_locked()).await.unwrap();
        let quotes_at_lock = router.quote_calls.load(Ordering::SeqCst);

        // Three refetch intervals pass while the transfer is pending, and
        // settlement stays pending for another five minutes
        handle.wait_for(|s| matches!(s.state, FlowState::Polling(_))).await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert!(handle.snapshot().is_locked());
        assert_eq!(router.quote_calls.load(Ordering::SeqCst), quotes_at_lock);
        assert!(router.status_calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_transfer_unlocks() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        wallet.push_result(Err(SwapFlowError::transfer_rejected("user denied")));
        let handle = spawn(&router, &wallet);

        quoted(&handle).await;
        handle.confirm().unwrap();
        let snapshot = handle
            .wait_for(|s| matches!(s.notice, Some(Notice::TransferFailed(_))))
            .await
            .unwrap();

        assert!(matches!(snapshot.state, FlowState::Quoted(_)));
        assert!(!snapshot.is_locked());
        assert_eq!(snapshot.deposit_address(), None);
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 0);

        // The unlocked quote can be retried
        let snapshot = handle
            .wait_for(|s| matches!(s.state, FlowState::Quoted(_)) && !s.quote_loading)
            .await
            .unwrap();
        assert!(!snapshot.button().disabled);
        handle.confirm().unwrap();
        handle.wait_for(|s| matches!(s.state, FlowState::Polling(_))).await.unwrap();
        assert_eq!(wallet.transfer_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_failure_is_terminal() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        router.push_status(Ok(status_response(ApiDepositStatus::Failed)));
        let handle = spawn(&router, &wallet);

        quoted(&handle).await;
        handle.confirm().unwrap();
        let failed = handle.wait_for(|s| s.state.is_terminal()).await.unwrap();
        assert_eq!(failed.button().label, "FAILED");

        let quotes = router.quote_calls.load(Ordering::SeqCst);
        handle.update_inputs(mock_inputs("50")).unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(router.quote_calls.load(Ordering::SeqCst), quotes);
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 1);
        assert!(handle.snapshot().state.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_handle_stops_flow() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        let handle = spawn(&router, &wallet);
        quoted(&handle).await;

        let second = handle.clone();
        drop(handle);
        tokio::time::sleep(Duration::from_secs(120)).await;
        let quotes = router.quote_calls.load(Ordering::SeqCst);
        assert!(quotes > 1);

        drop(second);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(router.quote_calls.load(Ordering::SeqCst), quotes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_events() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        let handle = spawn(&router, &wallet);

        handle.shutdown();
        assert!(matches!(handle.confirm(), Err(SwapFlowError::Setup(_))));
        assert!(handle.update_inputs(mock_inputs("100")).is_err());
    }
}
