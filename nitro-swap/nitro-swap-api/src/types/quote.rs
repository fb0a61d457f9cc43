//! Request and response types for the swap quote endpoint
//!
//! The quote endpoint both prices the route and allocates a one-time deposit
//! address; funds sent there are bridged to the destination chain.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::serialization::{u256_string_serialization, u64_or_string_serialization};

/// The query parameters of a quote request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestParams {
    /// The amount of the source token to sell, in atoms
    #[serde(with = "u256_string_serialization")]
    pub amount: U256,
    /// The token being sold
    pub from_token_address: Address,
    /// The chain on which the token is sold
    pub from_token_chain_id: u64,
    /// The token being bought
    pub to_token_address: Address,
    /// The chain on which the token is bought
    pub to_token_chain_id: u64,
    /// The amount of native gas to deliver on the destination chain
    pub dest_fuel: String,
    /// The slippage tolerance, in percent
    pub slippage_tolerance: String,
    /// The integrator id
    pub partner_id: String,
    /// Where funds are returned if the route cannot be completed
    pub refund_address: Address,
}

/// The response of the quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    /// The deposit instructions for this quote
    pub deposit_info: DepositInfo,
    /// The route the deposit will be bridged along
    pub best_route: BestRoute,
}

/// The deposit instructions attached to a quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    /// The id of the deposit
    pub uid: String,
    /// The chain on which the deposit must be made
    #[serde(with = "u64_or_string_serialization")]
    pub chain_id: u64,
    /// The address to send the source token to
    pub deposit_address: Address,
    /// The amount to deposit, in atoms of the source token
    #[serde(with = "u256_string_serialization")]
    pub amount: U256,
    /// The refund address echoed back by the API
    #[serde(default)]
    pub refund_address: Option<String>,
    /// The status of the deposit at quote time
    #[serde(default)]
    pub status: Option<String>,
    /// When the deposit address was allocated
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the quote stops being honored
    pub expiration_at: DateTime<Utc>,
}

/// The route selected by the router for a quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestRoute {
    /// The fee charged by the bridge
    pub bridge_fee: BridgeFee,
    /// The kind of flow used by the route
    #[serde(default)]
    pub flow_type: Option<String>,
    /// The source side of the route
    pub source: RouteLeg,
    /// The destination side of the route
    pub destination: RouteLeg,
    /// The token sold
    #[serde(default)]
    pub from_token_address: Option<String>,
    /// The token bought
    #[serde(default)]
    pub to_token_address: Option<String>,
}

/// The fee charged by the bridge for a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeFee {
    /// The token the fee is charged in
    pub address: String,
    /// The fee amount, in atoms
    #[serde(with = "u256_string_serialization")]
    pub amount: U256,
    /// The decimals of the fee token
    pub decimals: u8,
    /// The ticker of the fee token
    pub symbol: String,
}

/// One side of a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    /// The chain of this leg
    #[serde(with = "u64_or_string_serialization")]
    pub chain_id: u64,
    /// The asset moved on this leg
    pub asset: RouteAsset,
    /// The amount of the asset moved on this leg, in atoms
    #[serde(with = "u256_string_serialization")]
    pub token_amount: U256,
    /// The price impact reported for this leg
    #[serde(default)]
    pub price_impact: Option<String>,
}

/// Token metadata reported inside a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAsset {
    /// The decimals of the token
    pub decimals: u8,
    /// The ticker of the token
    pub symbol: String,
    /// The name of the token
    #[serde(default)]
    pub name: Option<String>,
    /// The address of the token
    pub address: String,
}
