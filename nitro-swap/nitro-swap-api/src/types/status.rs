//! Request and response types for the deposit status endpoint

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::serialization::u64_or_string_serialization;

/// The query parameters of a deposit status request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositStatusParams {
    /// The deposit address returned with the quote
    pub deposit_address: Address,
    /// The chain the deposit was made on
    pub chain_id: u64,
}

/// The settlement status of a deposit as reported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiDepositStatus {
    /// The deposit has not been bridged yet
    Pending,
    /// The deposit was bridged and delivered
    Success,
    /// The deposit could not be bridged
    Failed,
    /// A status this client does not know about
    #[serde(other)]
    Unknown,
}

/// One deposit record returned by the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositStatusEntry {
    /// The settlement status
    pub status: ApiDepositStatus,
    /// The relay transaction on the destination chain, once known
    #[serde(default)]
    pub relay_txn: Option<String>,
    /// The chain the deposit was made on
    #[serde(default, with = "u64_or_string_serialization")]
    pub chain_id: u64,
    /// The deposited amount, in atoms
    #[serde(default)]
    pub amount: Option<String>,
    /// The deposit address
    #[serde(default)]
    pub deposit_address: Option<String>,
    /// The id of the deposit
    #[serde(default)]
    pub uid: Option<String>,
    /// When the deposit record was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the deposit record was last updated
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Pagination metadata of the status endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The total number of records
    pub total: u64,
    /// The current page
    pub page: u64,
    /// The page size
    pub limit: u64,
    /// The total number of pages
    pub total_pages: u64,
}

/// The response of the deposit status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositStatusResponse {
    /// The matching deposit records, most recent first
    #[serde(default)]
    pub results: Vec<DepositStatusEntry>,
    /// Pagination metadata
    #[serde(default)]
    pub pagination: Pagination,
}

impl DepositStatusResponse {
    /// The record describing the deposit, if the router has seen it yet
    pub fn latest(&self) -> Option<&DepositStatusEntry> {
        self.results.first()
    }
}
