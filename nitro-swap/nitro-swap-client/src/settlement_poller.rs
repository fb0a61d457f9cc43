//! Polls the router for the settlement status of a deposit
//!
//! A poller is spawned per deposit session once the funding transfer has
//! confirmed. It stops on the first terminal status or when its session token
//! is cancelled, whichever comes first.

use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use nitro_swap_api::{ApiDepositStatus, DepositStatusParams, DepositStatusResponse};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    chain::SupportedChain, error::SwapFlowResult, flow::FlowEvent, router_client::RoutingApi,
};

// ---------
// | Types |
// ---------

/// The settlement state of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    /// Not yet bridged, or not yet seen by the router
    Pending,
    /// Bridged and delivered on the destination chain
    Success,
    /// The router gave up on the deposit
    Failed,
}

impl SettlementState {
    /// Whether polling should stop at this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementState::Pending)
    }
}

/// The router's view of a deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementStatus {
    /// The settlement state
    pub state: SettlementState,
    /// The relay transaction on the destination chain, once known
    pub relay_txn: Option<String>,
    /// When the router first saw the deposit
    pub created_at: Option<DateTime<Utc>>,
    /// When the router last updated the deposit
    pub updated_at: Option<DateTime<Utc>>,
}

impl SettlementStatus {
    /// A pending status with no details
    pub fn pending() -> Self {
        Self {
            state: SettlementState::Pending,
            relay_txn: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<DepositStatusResponse> for SettlementStatus {
    fn from(response: DepositStatusResponse) -> Self {
        let Some(entry) = response.latest() else {
            return SettlementStatus::pending();
        };

        let state = match entry.status {
            ApiDepositStatus::Success => SettlementState::Success,
            ApiDepositStatus::Failed => SettlementState::Failed,
            ApiDepositStatus::Pending | ApiDepositStatus::Unknown => SettlementState::Pending,
        };

        SettlementStatus {
            state,
            relay_txn: entry.relay_txn.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

// ----------
// | Poller |
// ----------

/// Polls the status of one deposit until it settles
pub struct SettlementPoller {
    /// The router client
    router: Arc<dyn RoutingApi>,
    /// The deposit session being polled for
    session_id: Uuid,
    /// The deposit address and chain to query
    params: DepositStatusParams,
    /// The interval between polls
    interval: Duration,
    /// The channel on which status updates are reported
    events: UnboundedSender<FlowEvent>,
    /// Cancelled when the session ends or the flow is torn down
    cancel: CancellationToken,
}

impl SettlementPoller {
    /// Constructor
    pub fn new(
        router: Arc<dyn RoutingApi>,
        session_id: Uuid,
        deposit_address: Address,
        chain: SupportedChain,
        interval: Duration,
        events: UnboundedSender<FlowEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let params = DepositStatusParams { deposit_address, chain_id: chain.chain_id() };
        Self { router, session_id, params, interval, events, cancel }
    }

    /// Fetch the current settlement status once
    pub async fn poll_once(&self) -> SwapFlowResult<SettlementStatus> {
        let response = self.router.get_deposit_status(&self.params).await?;
        Ok(SettlementStatus::from(response))
    }

    /// Poll until a terminal status is seen or the poller is cancelled
    ///
    /// The first poll is issued immediately
    #[instrument(
        skip_all,
        fields(session = %self.session_id, deposit_address = %self.params.deposit_address)
    )]
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                res = self.poll_once() => res,
            };

            let status = match result {
                Ok(status) => status,
                Err(e) => {
                    warn!("error polling settlement status, retrying next tick: {e}");
                    continue;
                },
            };

            debug!("settlement status: {:?}", status.state);
            let terminal = status.state.is_terminal();
            let event = FlowEvent::SettlementUpdate { session_id: self.session_id, status };
            if self.events.send(event).is_err() {
                break;
            }

            if terminal {
                info!("deposit reached a terminal status, stopping poller");
                return;
            }
        }

        debug!("settlement poller cancelled");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use alloy_primitives::address;
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;
    use crate::test_helpers::{status_response, MockRouter};

    /// Build a poller against the mock router
    fn poller(
        router: Arc<MockRouter>,
        cancel: CancellationToken,
    ) -> (SettlementPoller, tokio::sync::mpsc::UnboundedReceiver<FlowEvent>) {
        let (tx, rx) = unbounded_channel();
        let poller = SettlementPoller::new(
            router,
            Uuid::new_v4(),
            address!("5b38da6a701c568545dcfcb03fcb875f56beddc4"),
            SupportedChain::Bsc,
            Duration::from_secs(5),
            tx,
            cancel,
        );
        (poller, rx)
    }

    #[test]
    fn test_status_mapping() {
        let empty = DepositStatusResponse { results: vec![], pagination: Default::default() };
        assert_eq!(SettlementStatus::from(empty).state, SettlementState::Pending);

        let unknown = status_response(ApiDepositStatus::Unknown);
        assert_eq!(SettlementStatus::from(unknown).state, SettlementState::Pending);

        let success = SettlementStatus::from(status_response(ApiDepositStatus::Success));
        assert_eq!(success.state, SettlementState::Success);
        assert!(success.relay_txn.is_some());

        let failed = status_response(ApiDepositStatus::Failed);
        assert!(SettlementStatus::from(failed).state.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_success() {
        let router = Arc::new(MockRouter::default());
        router.push_status(Ok(status_response(ApiDepositStatus::Pending)));
        router.push_status(Err(crate::error::SwapFlowError::network_transient("timeout")));
        router.push_status(Ok(status_response(ApiDepositStatus::Success)));

        let (poller, mut rx) = poller(router.clone(), CancellationToken::new());
        let handle = tokio::spawn(poller.run());

        // First poll is immediate
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 1);

        handle.await.unwrap();
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 3);

        let mut states = vec![];
        while let Ok(FlowEvent::SettlementUpdate { status, .. }) = rx.try_recv() {
            states.push(status.state);
        }
        assert_eq!(states, vec![SettlementState::Pending, SettlementState::Success]);

        // No further polls once terminal
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_stops_polling() {
        let router = Arc::new(MockRouter::default());
        router.push_status(Ok(status_response(ApiDepositStatus::Failed)));

        let (poller, mut rx) = poller(router.clone(), CancellationToken::new());
        poller.run().await;

        assert_eq!(router.status_calls.load(Ordering::SeqCst), 1);
        match rx.try_recv() {
            Ok(FlowEvent::SettlementUpdate { status, .. }) => {
                assert_eq!(status.state, SettlementState::Failed)
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let router = Arc::new(MockRouter::default());
        let cancel = CancellationToken::new();
        let (poller, _rx) = poller(router.clone(), cancel.clone());
        let handle = tokio::spawn(poller.run());

        // Empty status queue reads as pending
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 3);
    }
}
