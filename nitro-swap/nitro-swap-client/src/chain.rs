//! The chains the swap flow can buy on and deposit from

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SwapFlowError;

/// The chain id of BNB Smart Chain
const BSC_CHAIN_ID: u64 = 56;
/// The chain id of Base mainnet
const BASE_CHAIN_ID: u64 = 8453;
/// The chain id of Arbitrum One
const ARBITRUM_CHAIN_ID: u64 = 42161;

/// A chain supported by the swap flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedChain {
    /// BNB Smart Chain
    Bsc,
    /// Base mainnet
    Base,
    /// Arbitrum One
    Arbitrum,
}

impl SupportedChain {
    /// All supported chains, in display order
    pub const ALL: [SupportedChain; 3] =
        [SupportedChain::Bsc, SupportedChain::Base, SupportedChain::Arbitrum];

    /// The numeric EVM chain id
    pub fn chain_id(&self) -> u64 {
        match self {
            SupportedChain::Bsc => BSC_CHAIN_ID,
            SupportedChain::Base => BASE_CHAIN_ID,
            SupportedChain::Arbitrum => ARBITRUM_CHAIN_ID,
        }
    }

    /// Look up a chain by its numeric id
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.chain_id() == chain_id)
    }

    /// The short name used in routes and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            SupportedChain::Bsc => "bsc",
            SupportedChain::Base => "base",
            SupportedChain::Arbitrum => "arbitrum",
        }
    }

    /// The human readable label
    pub fn label(&self) -> &'static str {
        match self {
            SupportedChain::Bsc => "BSC",
            SupportedChain::Base => "Base",
            SupportedChain::Arbitrum => "Arbitrum",
        }
    }
}

impl Display for SupportedChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SupportedChain {
    type Err = SwapFlowError;

    /// Accepts either the short name or the numeric chain id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(chain_id) = s.parse::<u64>() {
            return Self::from_chain_id(chain_id)
                .ok_or_else(|| SwapFlowError::parse(format!("unsupported chain id: {chain_id}")));
        }

        Self::ALL
            .into_iter()
            .find(|chain| chain.name() == s)
            .ok_or_else(|| SwapFlowError::parse(format!("unsupported chain: {s}")))
    }
}
