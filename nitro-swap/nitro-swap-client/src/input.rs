//! Amount input handling and validation of the swap inputs

use alloy_primitives::{utils::parse_units, Address, U256};

use crate::{
    chain::SupportedChain,
    error::{SwapFlowError, SwapFlowResult},
    quote::QuoteRequest,
};

/// A token held by the connected wallet, with its balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    /// The token contract
    pub address: Address,
    /// The chain the token lives on
    pub chain: SupportedChain,
    /// The token ticker
    pub symbol: String,
    /// The token decimals
    pub decimals: u8,
    /// The balance, in atoms
    pub balance: U256,
}

/// The token being bought
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationToken {
    /// The token contract
    pub address: Address,
    /// The chain the token lives on
    pub chain: SupportedChain,
}

/// Everything the user has entered for a swap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapInputs {
    /// The token being sold, if one is selected
    pub source: Option<TokenBalance>,
    /// The token being bought, once loaded
    pub destination: Option<DestinationToken>,
    /// The raw amount text, in whole units of the source token
    pub amount: String,
    /// The connected wallet, used as the refund address
    pub refund_address: Option<Address>,
}

impl SwapInputs {
    /// Whether the amount is positive and covered by the source balance
    pub fn is_valid(&self) -> bool {
        is_input_valid(&self.amount, self.source.as_ref())
    }

    /// Whether only the amount differs from `other`
    pub fn only_amount_changed(&self, other: &SwapInputs) -> bool {
        self.amount != other.amount
            && self.source == other.source
            && self.destination == other.destination
            && self.refund_address == other.refund_address
    }

    /// Build the quote request for these inputs
    ///
    /// `default_refund_address` is used when no wallet is connected
    pub fn quote_request(
        &self,
        default_refund_address: Address,
    ) -> SwapFlowResult<QuoteRequest> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| SwapFlowError::quote_unavailable("no source token selected"))?;
        let destination = self
            .destination
            .as_ref()
            .ok_or_else(|| SwapFlowError::quote_unavailable("no destination token"))?;

        if !self.is_valid() {
            return Err(SwapFlowError::quote_unavailable(format!(
                "invalid amount {:?} for {} balance",
                self.amount, source.symbol
            )));
        }

        let source_amount = parse_amount(&self.amount, source.decimals)?;
        Ok(QuoteRequest {
            source_token: source.address,
            source_chain: source.chain,
            destination_token: destination.address,
            destination_chain: destination.chain,
            source_amount,
            refund_address: self.refund_address.unwrap_or(default_refund_address),
        })
    }
}

/// Whether a partially typed amount may be accepted into the input field
///
/// Digits with at most one decimal point; the empty string is allowed so the
/// field can be cleared
pub fn is_amount_input_allowed(value: &str) -> bool {
    let mut seen_point = false;
    for c in value.chars() {
        match c {
            '0'..='9' => {},
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    true
}

/// Convert a decimal amount in whole units into atoms of a token with
/// `decimals` decimals
///
/// Fractional digits beyond the token's precision are truncated
pub fn parse_amount(amount: &str, decimals: u8) -> SwapFlowResult<U256> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.chars().any(|c| c.is_ascii_digit()) {
        return Err(SwapFlowError::parse(format!("not an amount: {amount:?}")));
    }
    if !is_amount_input_allowed(amount) {
        return Err(SwapFlowError::parse(format!("not an amount: {amount:?}")));
    }

    let amount = match amount.split_once('.') {
        Some((whole, fraction)) if fraction.len() > decimals as usize => {
            let whole = if whole.is_empty() { "0" } else { whole };
            format!("{whole}.{}", &fraction[..decimals as usize])
        },
        Some(("", fraction)) => format!("0.{fraction}"),
        _ => amount.to_string(),
    };

    parse_units(amount.trim_end_matches('.'), decimals)
        .map(|units| units.get_absolute())
        .map_err(SwapFlowError::parse)
}

/// Whether `amount` is a positive amount no greater than the token's balance
pub fn is_input_valid(amount: &str, token: Option<&TokenBalance>) -> bool {
    let Some(token) = token else {
        return false;
    };

    match parse_amount(amount, token.decimals) {
        Ok(atoms) => !atoms.is_zero() && atoms <= token.balance,
        Err(_) => false,
    }
}
