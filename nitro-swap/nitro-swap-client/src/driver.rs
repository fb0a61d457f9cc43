//! Drives a flow through a single swap without user interaction
//!
//! The driver confirms the first usable quote and then follows the deposit
//! session to a terminal outcome. It never funds a second deposit: once a
//! session has been observed, or a notice has been raised since the confirm,
//! a fresh quote is never confirmed.

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    display::{expiry_countdown, receive_amount},
    error::{SwapFlowError, SwapFlowResult},
    flow::{FlowHandle, FlowSnapshot, FlowState, Notice},
};

/// The error returned when the controller stops before the swap completes
const FLOW_STOPPED: &str = "swap flow stopped unexpectedly";

/// What the driver wants done after a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStep {
    /// Wait for the next snapshot
    Wait,
    /// Press the swap button
    Confirm,
    /// The swap is done
    Done,
}

/// Decides how to react to each snapshot of a single-swap flow
#[derive(Debug, Default)]
pub struct SwapDriver {
    /// Stop at the first usable quote instead of confirming it
    dry_run: bool,
    /// The notice sequence number when the confirm was sent
    confirmed_at: Option<u64>,
    /// Whether a deposit session has been observed
    deposited: bool,
    /// Logs what changed between snapshots
    reporter: Reporter,
}

impl SwapDriver {
    /// Constructor
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, ..Default::default() }
    }

    /// React to a snapshot
    pub fn step(&mut self, snapshot: &FlowSnapshot) -> SwapFlowResult<DriverStep> {
        self.reporter.report(snapshot);
        if snapshot.is_locked() {
            self.deposited = true;
        }

        match &snapshot.notice {
            Some(Notice::SwapCompleted) => return Ok(DriverStep::Done),
            // A rejected transfer unlocks the quote; do not retry it
            Some(Notice::TransferFailed(reason)) => {
                return Err(SwapFlowError::transfer_rejected(reason));
            },
            _ => {},
        }

        match &snapshot.state {
            FlowState::Settled { .. } => return Ok(DriverStep::Done),
            FlowState::Failed { .. } => {
                let err = snapshot.settlement_error();
                return Err(err.unwrap_or_else(|| SwapFlowError::settlement_failed("swap failed")));
            },
            FlowState::Idle => {
                if let Some(e) = &snapshot.quote_error {
                    return Err(e.clone());
                }
            },
            FlowState::Quoted(_) if !snapshot.button().disabled && self.may_confirm(snapshot) => {
                if self.dry_run {
                    return Ok(DriverStep::Done);
                }

                self.confirmed_at = Some(snapshot.notice_seq);
                return Ok(DriverStep::Confirm);
            },
            _ => {},
        }

        Ok(DriverStep::Wait)
    }

    /// Whether confirming the current quote cannot fund a second deposit
    ///
    /// A confirm on an expired quote opens no session and raises no notice,
    /// so the refreshed quote may be confirmed again
    fn may_confirm(&self, snapshot: &FlowSnapshot) -> bool {
        if self.deposited {
            return false;
        }

        match self.confirmed_at {
            Some(seq) => seq == snapshot.notice_seq,
            None => true,
        }
    }
}

/// Follow a flow's snapshots until the swap settles or fails
pub async fn drive_swap(handle: &FlowHandle, dry_run: bool) -> SwapFlowResult<()> {
    let mut snapshots = handle.subscribe();
    let mut driver = SwapDriver::new(dry_run);

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        match driver.step(&snapshot)? {
            DriverStep::Done => return Ok(()),
            DriverStep::Confirm => handle.confirm()?,
            DriverStep::Wait => {},
        }

        snapshots.changed().await.map_err(|_| SwapFlowError::setup(FLOW_STOPPED))?;
    }
}

/// Logs what the user would see, once per change
#[derive(Debug, Default)]
struct Reporter {
    /// The last state logged
    state: &'static str,
    /// The last notice logged
    notice_seq: u64,
    /// The uid of the last quote logged
    quote_uid: Option<String>,
    /// The last quote error logged, with its generation
    quote_error: Option<(u64, SwapFlowError)>,
}

impl Reporter {
    /// Log anything new in the snapshot
    fn report(&mut self, snapshot: &FlowSnapshot) {
        let state = snapshot.state.name();
        if state != self.state {
            self.state = state;
            info!("[{}] state: {state}", snapshot.button().label);
        }

        if snapshot.notice_seq != self.notice_seq {
            self.notice_seq = snapshot.notice_seq;
            if let Some(notice) = &snapshot.notice {
                info!("{}", notice.message());
            }
        }

        let quote_error = snapshot.quote_error.clone().map(|e| (snapshot.generation, e));
        if quote_error != self.quote_error {
            if let (Some(message), Some((_, e))) = (snapshot.quote_error_message(), &quote_error) {
                warn!("{message} ({e})");
            }
            self.quote_error = quote_error;
        }

        if let Some(quote) = snapshot.quote() {
            if self.quote_uid.as_deref() != Some(quote.uid.as_str()) {
                self.quote_uid = Some(quote.uid.clone());
                info!("you will receive: {}", receive_amount(quote));
                info!("quote expires in: {}", expiry_countdown(quote.expiration, Utc::now()));
                info!("deposit address: {} on {}", quote.deposit_address, quote.deposit_chain);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{atomic::Ordering, Arc},
        time::Duration,
    };

    use chrono::TimeDelta;
    use nitro_swap_api::ApiDepositStatus;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::SwapFlowConfig,
        flow::{spawn_swap_flow, DepositSession},
        test_helpers::{mock_inputs, mock_quote, status_response, MockRouter, MockWallet},
    };

    /// A snapshot of a live quote
    fn quoted(notice: Option<Notice>, notice_seq: u64) -> FlowSnapshot {
        let quote = mock_quote(Utc::now() + TimeDelta::minutes(5));
        FlowSnapshot { state: FlowState::Quoted(quote), notice, notice_seq, ..Default::default() }
    }

    /// A snapshot of a locked deposit session
    fn locked() -> FlowSnapshot {
        let quote = mock_quote(Utc::now() + TimeDelta::minutes(5));
        let session = DepositSession::new(Uuid::new_v4(), quote, 0, Utc::now());
        FlowSnapshot { state: FlowState::Locked(session), ..Default::default() }
    }

    #[test]
    fn test_confirms_first_quote() {
        let mut driver = SwapDriver::new(false);
        assert_eq!(driver.step(&FlowSnapshot::default()).unwrap(), DriverStep::Wait);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Confirm);
    }

    #[test]
    fn test_dry_run_stops_at_quote() {
        let mut driver = SwapDriver::new(true);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Done);
    }

    #[test]
    fn test_late_wake_after_settlement_is_done() {
        let mut driver = SwapDriver::new(false);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Confirm);

        // The settled snapshot was missed and a fresh quote already arrived
        let requoted = quoted(Some(Notice::SwapCompleted), 2);
        assert_eq!(driver.step(&requoted).unwrap(), DriverStep::Done);
    }

    #[test]
    fn test_no_confirm_after_session() {
        let mut driver = SwapDriver::new(false);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Confirm);
        assert_eq!(driver.step(&locked()).unwrap(), DriverStep::Wait);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Wait);
    }

    #[test]
    fn test_no_confirm_after_notice() {
        let mut driver = SwapDriver::new(false);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Confirm);
        let deposited = quoted(Some(Notice::DepositSuccessful), 1);
        assert_eq!(driver.step(&deposited).unwrap(), DriverStep::Wait);
    }

    #[test]
    fn test_reconfirms_refreshed_quote() {
        let mut driver = SwapDriver::new(false);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Confirm);

        // The quote expired on confirm and was replaced without a session
        assert_eq!(driver.step(&FlowSnapshot::default()).unwrap(), DriverStep::Wait);
        assert_eq!(driver.step(&quoted(None, 0)).unwrap(), DriverStep::Confirm);
    }

    #[test]
    fn test_rejected_transfer_is_error() {
        let mut driver = SwapDriver::new(false);
        driver.step(&quoted(None, 0)).unwrap();

        let rejected = quoted(Some(Notice::TransferFailed("user denied".to_string())), 1);
        assert!(matches!(driver.step(&rejected), Err(SwapFlowError::TransferRejected(_))));
    }

    #[test]
    fn test_quote_error_gated_by_generation() {
        let mut reporter = Reporter::default();
        let error = SwapFlowError::quote_unavailable("router down");
        let mut snapshot =
            FlowSnapshot { quote_error: Some(error.clone()), generation: 1, ..Default::default() };

        reporter.report(&snapshot);
        assert_eq!(reporter.quote_error, Some((1, error.clone())));

        snapshot.generation = 2;
        reporter.report(&snapshot);
        assert_eq!(reporter.quote_error, Some((2, error)));

        snapshot.quote_error = None;
        reporter.report(&snapshot);
        assert_eq!(reporter.quote_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_swap_deposits_once() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());
        wallet.set_delay(Duration::from_secs(90));
        router.push_status(Ok(status_response(ApiDepositStatus::Success)));

        let config = SwapFlowConfig::default();
        let handle = spawn_swap_flow(config, router.clone(), wallet.clone()).unwrap();
        handle.update_inputs(mock_inputs("100")).unwrap();

        drive_swap(&handle, false).await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(wallet.transfer_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(handle.snapshot().state, FlowState::Quoted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_swap_dry_run() {
        let router = Arc::new(MockRouter::default());
        let wallet = Arc::new(MockWallet::default());

        let config = SwapFlowConfig::default();
        let handle = spawn_swap_flow(config, router.clone(), wallet.clone()).unwrap();
        handle.update_inputs(mock_inputs("100")).unwrap();

        drive_swap(&handle, true).await.unwrap();
        assert_eq!(wallet.transfer_calls.load(Ordering::SeqCst), 0);
    }
}
