//! Type definitions for quotes
//!
//! A [`Quote`] is immutable once fetched: a new amount or token pair always
//! produces a new quote rather than mutating an existing one.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, TimeDelta, Utc};
use nitro_swap_api::{QuoteRequestParams, QuoteResponse};

use crate::{
    chain::SupportedChain,
    config::SwapFlowConfig,
    error::{SwapFlowError, SwapFlowResult},
};

/// A venue-agnostic request for a cross-chain quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    /// The token being sold
    pub source_token: Address,
    /// The chain the source token lives on
    pub source_chain: SupportedChain,
    /// The token being bought
    pub destination_token: Address,
    /// The chain the destination token lives on
    pub destination_chain: SupportedChain,
    /// The amount being sold, in atoms
    pub source_amount: U256,
    /// Where funds are returned if the route fails
    pub refund_address: Address,
}

impl QuoteRequest {
    /// Build the router query parameters for this request
    pub fn to_params(&self, config: &SwapFlowConfig) -> QuoteRequestParams {
        QuoteRequestParams {
            amount: self.source_amount,
            from_token_address: self.source_token,
            from_token_chain_id: self.source_chain.chain_id(),
            to_token_address: self.destination_token,
            to_token_chain_id: self.destination_chain.chain_id(),
            dest_fuel: config.dest_fuel.clone(),
            slippage_tolerance: config.slippage_tolerance.clone(),
            partner_id: config.partner_id.clone(),
            refund_address: self.refund_address,
        }
    }
}

/// The fee charged by the bridge for a quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeFee {
    /// The fee amount, in atoms of the fee token
    pub amount: U256,
    /// The decimals of the fee token
    pub decimals: u8,
    /// The ticker of the fee token
    pub symbol: String,
}

/// A priced, time-bounded offer to convert one token into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// The router's id for the deposit
    pub uid: String,
    /// The token being sold
    pub source_token: Address,
    /// The chain the source token lives on
    pub source_chain: SupportedChain,
    /// The token being bought
    pub destination_token: Address,
    /// The chain the destination token lives on
    pub destination_chain: SupportedChain,
    /// The amount to deposit, in atoms of the source token
    pub source_amount: U256,
    /// The amount delivered on the destination chain, in atoms
    pub destination_amount: U256,
    /// The decimals of the destination token
    pub destination_decimals: u8,
    /// The ticker of the destination token
    pub destination_symbol: String,
    /// The address the source amount must be sent to
    pub deposit_address: Address,
    /// The chain the deposit must be made on
    pub deposit_chain: SupportedChain,
    /// When the router stops honoring the quote
    pub expiration: DateTime<Utc>,
    /// The fee charged by the bridge
    pub bridge_fee: BridgeFee,
}

impl Quote {
    /// Convert a router response into a quote for the given request
    pub fn from_response(
        request: &QuoteRequest,
        response: QuoteResponse,
    ) -> SwapFlowResult<Self> {
        let QuoteResponse { deposit_info, best_route } = response;

        let deposit_chain = SupportedChain::from_chain_id(deposit_info.chain_id).ok_or_else(|| {
            SwapFlowError::quote_unavailable(format!(
                "deposit chain {} is not supported",
                deposit_info.chain_id
            ))
        })?;

        if deposit_info.amount.is_zero() {
            return Err(SwapFlowError::quote_unavailable("router quoted a zero deposit amount"));
        }

        let destination = best_route.destination;
        Ok(Quote {
            uid: deposit_info.uid,
            source_token: request.source_token,
            source_chain: request.source_chain,
            destination_token: request.destination_token,
            destination_chain: request.destination_chain,
            source_amount: deposit_info.amount,
            destination_amount: destination.token_amount,
            destination_decimals: destination.asset.decimals,
            destination_symbol: destination.asset.symbol,
            deposit_address: deposit_info.deposit_address,
            deposit_chain,
            expiration: deposit_info.expiration_at,
            bridge_fee: BridgeFee {
                amount: best_route.bridge_fee.amount,
                decimals: best_route.bridge_fee.decimals,
                symbol: best_route.bridge_fee.symbol,
            },
        })
    }

    /// Whether the quote has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Whether the quote has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The time left before expiry at `now`; negative once expired
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        self.expiration - now
    }
}
