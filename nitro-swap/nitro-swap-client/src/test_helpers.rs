//! Mocks and fixtures shared by the unit tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use alloy_primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use nitro_swap_api::{
    ApiDepositStatus, BestRoute, BridgeFee as ApiBridgeFee, DepositInfo, DepositStatusEntry,
    DepositStatusParams, DepositStatusResponse, Pagination, QuoteRequestParams, QuoteResponse,
    RouteAsset, RouteLeg,
};

use crate::{
    chain::SupportedChain,
    error::SwapFlowResult,
    input::{parse_amount, DestinationToken, SwapInputs, TokenBalance},
    quote::{BridgeFee, Quote, QuoteRequest},
    router_client::RoutingApi,
    settlement_poller::{SettlementState, SettlementStatus},
    wallet::{DepositWallet, TransferConfirmation, TransferRequest},
};

/// The fallback refund address used in tests
pub const DEFAULT_REFUND: Address = address!("f768e66c72f6b18192e0c89d38b3028755649853");
/// USDT on BSC
const SOURCE_TOKEN: Address = address!("55d398326f99059ff775485246999027b3197955");
/// USDC on Base
const DESTINATION_TOKEN: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");
/// The deposit address handed out by the mock router
const DEPOSIT_ADDRESS: Address = address!("5b38da6a701c568545dcfcb03fcb875f56beddc4");

// ------------
// | Fixtures |
// ------------

/// Valid inputs selling `amount` of a 500 USDT balance for USDC on Base
pub fn mock_inputs(amount: &str) -> SwapInputs {
    SwapInputs {
        source: Some(TokenBalance {
            address: SOURCE_TOKEN,
            chain: SupportedChain::Bsc,
            symbol: "USDT".to_string(),
            decimals: 18,
            balance: parse_amount("500", 18).unwrap(),
        }),
        destination: Some(DestinationToken {
            address: DESTINATION_TOKEN,
            chain: SupportedChain::Base,
        }),
        amount: amount.to_string(),
        refund_address: None,
    }
}

/// A quote request for `amount` atoms
pub fn mock_quote_request(amount: u64) -> QuoteRequest {
    QuoteRequest {
        source_token: SOURCE_TOKEN,
        source_chain: SupportedChain::Bsc,
        destination_token: DESTINATION_TOKEN,
        destination_chain: SupportedChain::Base,
        source_amount: U256::from(amount),
        refund_address: DEFAULT_REFUND,
    }
}

/// A quote expiring at `expiration`
pub fn mock_quote(expiration: DateTime<Utc>) -> Quote {
    Quote {
        uid: "0f1c5b2e-1b9e-4b8f-9d43-5c2f0d6a7e11".to_string(),
        source_token: SOURCE_TOKEN,
        source_chain: SupportedChain::Bsc,
        destination_token: DESTINATION_TOKEN,
        destination_chain: SupportedChain::Base,
        source_amount: parse_amount("100", 18).unwrap(),
        destination_amount: U256::from(99_500_000u64),
        destination_decimals: 6,
        destination_symbol: "USDC".to_string(),
        deposit_address: DEPOSIT_ADDRESS,
        deposit_chain: SupportedChain::Bsc,
        expiration,
        bridge_fee: BridgeFee {
            amount: U256::from(500_000u64),
            decimals: 6,
            symbol: "USDC".to_string(),
        },
    }
}

/// A transfer funding the mock quote
pub fn mock_transfer_request() -> TransferRequest {
    TransferRequest::for_quote(&mock_quote(Utc::now() + TimeDelta::minutes(5)))
}

/// A settlement status in the given state
pub fn status(state: SettlementState) -> SettlementStatus {
    SettlementStatus { state, ..SettlementStatus::pending() }
}

/// A router quote response for the given request
fn quote_response(params: &QuoteRequestParams) -> QuoteResponse {
    let leg = |chain_id, decimals, symbol: &str, token_amount| RouteLeg {
        chain_id,
        asset: RouteAsset {
            decimals,
            symbol: symbol.to_string(),
            name: None,
            address: String::new(),
        },
        token_amount,
        price_impact: None,
    };

    QuoteResponse {
        deposit_info: DepositInfo {
            uid: "0f1c5b2e-1b9e-4b8f-9d43-5c2f0d6a7e11".to_string(),
            chain_id: params.from_token_chain_id,
            deposit_address: DEPOSIT_ADDRESS,
            amount: params.amount,
            refund_address: Some(params.refund_address.to_string()),
            status: None,
            created_at: Some(Utc::now()),
            expiration_at: Utc::now() + TimeDelta::minutes(10),
        },
        best_route: BestRoute {
            bridge_fee: ApiBridgeFee {
                address: String::new(),
                amount: U256::from(500_000u64),
                decimals: 6,
                symbol: "USDC".to_string(),
            },
            flow_type: None,
            source: leg(params.from_token_chain_id, 18, "USDT", params.amount),
            destination: leg(params.to_token_chain_id, 6, "USDC", U256::from(99_500_000u64)),
            from_token_address: None,
            to_token_address: None,
        },
    }
}

/// A status response with one entry in the given status
pub fn status_response(status: ApiDepositStatus) -> DepositStatusResponse {
    DepositStatusResponse {
        results: vec![DepositStatusEntry {
            status,
            relay_txn: Some(format!("{:#x}", B256::repeat_byte(0xab))),
            chain_id: 56,
            amount: Some("100000000000000000000".to_string()),
            deposit_address: Some(DEPOSIT_ADDRESS.to_string()),
            uid: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }],
        pagination: Pagination { total: 1, page: 1, limit: 10, total_pages: 1 },
    }
}

// ---------
// | Mocks |
// ---------

/// A scripted router
///
/// Queued results are returned in order; once a queue is empty quotes are
/// generated from the request and statuses read as pending
#[derive(Default)]
pub struct MockRouter {
    /// Scripted quote results
    quotes: Mutex<VecDeque<SwapFlowResult<QuoteResponse>>>,
    /// Scripted status results
    statuses: Mutex<VecDeque<SwapFlowResult<DepositStatusResponse>>>,
    /// The latency of quote requests
    quote_delay: Mutex<Duration>,
    /// The amount of the last quote request
    last_amount: Mutex<Option<U256>>,
    /// The number of quote requests received
    pub quote_calls: AtomicUsize,
    /// The number of status requests received
    pub status_calls: AtomicUsize,
}

impl MockRouter {
    /// Queue a quote result
    pub fn push_quote(&self, result: SwapFlowResult<QuoteResponse>) {
        self.quotes.lock().unwrap().push_back(result);
    }

    /// Queue a status result
    pub fn push_status(&self, result: SwapFlowResult<DepositStatusResponse>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    /// Set the latency of quote requests
    pub fn set_quote_delay(&self, delay: Duration) {
        *self.quote_delay.lock().unwrap() = delay;
    }

    /// The amount of the last quote request
    pub fn last_quote_amount(&self) -> Option<u64> {
        self.last_amount.lock().unwrap().map(|amount| amount.to::<u64>())
    }
}

#[async_trait]
impl RoutingApi for MockRouter {
    async fn get_quote(&self, params: &QuoteRequestParams) -> SwapFlowResult<QuoteResponse> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_amount.lock().unwrap() = Some(params.amount);

        let delay = *self.quote_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.quotes.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(quote_response(params)))
    }

    async fn get_deposit_status(
        &self,
        _params: &DepositStatusParams,
    ) -> SwapFlowResult<DepositStatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.statuses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(DepositStatusResponse { results: vec![], pagination: Pagination::default() })
        })
    }
}

/// A scripted wallet
///
/// Queued results are returned in order; once empty, transfers confirm
#[derive(Default)]
pub struct MockWallet {
    /// Scripted transfer results
    results: Mutex<VecDeque<SwapFlowResult<TransferConfirmation>>>,
    /// The time a transfer takes to resolve
    delay: Mutex<Duration>,
    /// The number of transfers submitted
    pub transfer_calls: AtomicUsize,
}

impl MockWallet {
    /// Queue a transfer result
    pub fn push_result(&self, result: SwapFlowResult<TransferConfirmation>) {
        self.results.lock().unwrap().push_back(result);
    }

    /// Set the time a transfer takes to resolve
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl DepositWallet for MockWallet {
    fn address(&self) -> Address {
        DEFAULT_REFUND
    }

    async fn transfer(&self, _request: &TransferRequest) -> SwapFlowResult<TransferConfirmation> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.results.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(TransferConfirmation {
            tx_hash: B256::repeat_byte(0x11),
            block_number: Some(1),
        }))
    }
}
