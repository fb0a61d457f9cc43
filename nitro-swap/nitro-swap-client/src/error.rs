//! Error types for the swap flow

/// Type alias for results returned by the swap flow
pub type SwapFlowResult<T> = Result<T, SwapFlowError>;

/// An error raised while quoting, transferring or settling a swap
///
/// None of these are fatal to the process; every variant is scoped to the
/// swap attempt that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapFlowError {
    /// The inputs are incomplete or invalid, or the router could not price
    /// the route
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),
    /// The wallet declined the transfer or the transfer reverted on-chain
    #[error("transfer rejected: {0}")]
    TransferRejected(String),
    /// The router reported that the deposit could not be settled
    #[error("settlement failed: {0}")]
    SettlementFailed(String),
    /// A request failed in a way the next scheduled attempt may recover from
    #[error("network error: {0}")]
    NetworkTransient(String),
    /// The configuration is invalid
    #[error("config error: {0}")]
    Config(String),
    /// A value could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
    /// A client could not be constructed
    #[error("setup error: {0}")]
    Setup(String),
}

impl SwapFlowError {
    /// Create a new quote unavailable error
    #[allow(clippy::needless_pass_by_value)]
    pub fn quote_unavailable<T: ToString>(e: T) -> Self {
        SwapFlowError::QuoteUnavailable(e.to_string())
    }

    /// Create a new transfer rejected error
    #[allow(clippy::needless_pass_by_value)]
    pub fn transfer_rejected<T: ToString>(e: T) -> Self {
        SwapFlowError::TransferRejected(e.to_string())
    }

    /// Create a new settlement failed error
    #[allow(clippy::needless_pass_by_value)]
    pub fn settlement_failed<T: ToString>(e: T) -> Self {
        SwapFlowError::SettlementFailed(e.to_string())
    }

    /// Create a new transient network error
    #[allow(clippy::needless_pass_by_value)]
    pub fn network_transient<T: ToString>(e: T) -> Self {
        SwapFlowError::NetworkTransient(e.to_string())
    }

    /// Create a new config error
    #[allow(clippy::needless_pass_by_value)]
    pub fn config<T: ToString>(e: T) -> Self {
        SwapFlowError::Config(e.to_string())
    }

    /// Create a new parse error
    #[allow(clippy::needless_pass_by_value)]
    pub fn parse<T: ToString>(e: T) -> Self {
        SwapFlowError::Parse(e.to_string())
    }

    /// Create a new setup error
    #[allow(clippy::needless_pass_by_value)]
    pub fn setup<T: ToString>(e: T) -> Self {
        SwapFlowError::Setup(e.to_string())
    }
}

impl From<reqwest::Error> for SwapFlowError {
    fn from(e: reqwest::Error) -> Self {
        SwapFlowError::network_transient(e)
    }
}
