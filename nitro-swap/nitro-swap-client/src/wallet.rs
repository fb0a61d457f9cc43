//! The wallet capability used to fund deposits
//!
//! [`AlloyDepositWallet`] signs with a local private key and keeps one
//! provider per supported chain

use std::collections::HashMap;

use alloy::{
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::{
    chain::SupportedChain,
    error::{SwapFlowError, SwapFlowResult},
    input::TokenBalance,
    quote::Quote,
};

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address recipient, uint256 amount) external returns (bool);
    }
}

// ---------
// | Types |
// ---------

/// A request to send tokens to a deposit address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// The deposit address
    pub to_address: Address,
    /// The amount to send, in atoms
    pub amount: U256,
    /// The token contract
    pub token: Address,
    /// The chain to send on
    pub chain: SupportedChain,
}

impl TransferRequest {
    /// The transfer that funds the given quote
    pub fn for_quote(quote: &Quote) -> Self {
        Self {
            to_address: quote.deposit_address,
            amount: quote.source_amount,
            token: quote.source_token,
            chain: quote.deposit_chain,
        }
    }
}

/// A transfer that has been included on-chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfirmation {
    /// The transaction hash
    pub tx_hash: B256,
    /// The block the transfer was included in, if reported
    pub block_number: Option<u64>,
}

/// A wallet able to fund a deposit address
#[async_trait]
pub trait DepositWallet: Send + Sync {
    /// The address funds are sent from
    fn address(&self) -> Address;

    /// Send the transfer and wait for one confirmation
    ///
    /// Resolves with `TransferRejected` if the wallet declines or the
    /// transfer reverts
    async fn transfer(&self, request: &TransferRequest) -> SwapFlowResult<TransferConfirmation>;
}

// ----------
// | Wallet |
// ----------

/// A deposit wallet backed by a local signer and an RPC provider per chain
#[derive(Clone)]
pub struct AlloyDepositWallet {
    /// The signer's address
    address: Address,
    /// The wallet-filled providers, indexed by chain
    providers: HashMap<SupportedChain, DynProvider>,
}

impl AlloyDepositWallet {
    /// Create a wallet from a signer and a set of RPC urls
    pub fn new(
        signer: PrivateKeySigner,
        rpc_urls: &HashMap<SupportedChain, String>,
    ) -> SwapFlowResult<Self> {
        let address = signer.address();
        let mut providers = HashMap::new();
        for (chain, rpc_url) in rpc_urls {
            let url: url::Url = rpc_url
                .parse()
                .map_err(|e| SwapFlowError::config(format!("invalid {chain} rpc url: {e}")))?;
            let provider = ProviderBuilder::new().wallet(signer.clone()).connect_http(url);
            providers.insert(*chain, DynProvider::new(provider));
        }

        Ok(Self { address, providers })
    }

    /// The provider for a chain
    fn provider(&self, chain: SupportedChain) -> SwapFlowResult<&DynProvider> {
        self.providers
            .get(&chain)
            .ok_or_else(|| SwapFlowError::config(format!("no rpc url configured for {chain}")))
    }

    /// Read the wallet's balance of a token, along with its metadata
    pub async fn token_balance(
        &self,
        token: Address,
        chain: SupportedChain,
    ) -> SwapFlowResult<TokenBalance> {
        let contract = IERC20::new(token, self.provider(chain)?.clone());

        let balance = contract
            .balanceOf(self.address)
            .call()
            .await
            .map_err(SwapFlowError::network_transient)?;
        let decimals = contract.decimals().call().await.map_err(SwapFlowError::network_transient)?;
        let symbol = contract.symbol().call().await.map_err(SwapFlowError::network_transient)?;

        Ok(TokenBalance { address: token, chain, symbol, decimals, balance })
    }
}

#[async_trait]
impl DepositWallet for AlloyDepositWallet {
    fn address(&self) -> Address {
        self.address
    }

    #[instrument(skip_all, fields(chain = %request.chain, to = %request.to_address))]
    async fn transfer(&self, request: &TransferRequest) -> SwapFlowResult<TransferConfirmation> {
        let contract = IERC20::new(request.token, self.provider(request.chain)?.clone());

        let pending = contract
            .transfer(request.to_address, request.amount)
            .send()
            .await
            .map_err(SwapFlowError::transfer_rejected)?;
        info!("submitted deposit transfer: {:#x}", pending.tx_hash());

        let receipt = pending.get_receipt().await.map_err(SwapFlowError::transfer_rejected)?;
        if !receipt.status() {
            return Err(SwapFlowError::transfer_rejected(format!(
                "transfer {:#x} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(TransferConfirmation {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}
