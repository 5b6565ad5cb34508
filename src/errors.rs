use ethers::types::{Address, U256};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] ethers::signers::WalletError),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error("Other: {0}")]
    Other(String),
}

/// Outcome of a single chain interaction as seen by a backend.
///
/// Backends never decide what a revert *means* for the user; that happens in
/// [`SwapError::from_chain`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request rejected by signer: {0}")]
    Rejected(String),

    #[error("transaction dropped from mempool")]
    Dropped,
}

/// Failure kinds surfaced to the caller of quote / swap operations.
///
/// Each variant calls for a different remedy, so they are never collapsed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SwapError {
    #[error("unknown token symbol: {0}")]
    UnknownToken(String),

    #[error("source and destination token are both {0}")]
    InvalidPair(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("slippage tolerance {0}% outside [0, 50]")]
    InvalidSlippage(f64),

    #[error("no route available from {from} to {to}")]
    NoRouteAvailable { from: String, to: String },

    #[error("router allowance for {token:?} is insufficient: {reason}")]
    InsufficientAllowance { token: Address, reason: String },

    #[error("token approval failed: {0}")]
    ApprovalFailed(String),

    #[error("output fell below minimum {min_out}: {reason}")]
    SlippageExceeded { min_out: U256, reason: String },

    #[error("deadline {deadline} passed (now {now})")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("request rejected in wallet")]
    UserRejected,

    #[error("transaction reverted: {0}")]
    Reverted(String),
}

/// What a router revert reason string tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertKind {
    Slippage,
    Expired,
    Allowance,
    Other,
}

/// Classify UniswapV2-style router / TransferHelper revert strings.
pub fn classify_revert(reason: &str) -> RevertKind {
    let upper = reason.to_ascii_uppercase();
    if upper.contains("INSUFFICIENT_OUTPUT_AMOUNT") {
        RevertKind::Slippage
    } else if upper.contains("EXPIRED") {
        RevertKind::Expired
    } else if upper.contains("TRANSFER_FROM_FAILED") || upper.contains("INSUFFICIENT ALLOWANCE") {
        RevertKind::Allowance
    } else {
        RevertKind::Other
    }
}

impl SwapError {
    /// Map a backend failure of a swap submission to the user-facing kind.
    pub fn from_chain(err: ChainError, token_in: Address, min_out: U256, deadline: u64) -> Self {
        match err {
            ChainError::Reverted(reason) => match classify_revert(&reason) {
                RevertKind::Slippage => SwapError::SlippageExceeded { min_out, reason },
                RevertKind::Expired => SwapError::DeadlineExpired {
                    deadline,
                    now: crate::utils::now_unix(),
                },
                RevertKind::Allowance => SwapError::InsufficientAllowance {
                    token: token_in,
                    reason,
                },
                RevertKind::Other => SwapError::Reverted(reason),
            },
            ChainError::Transport(msg) => SwapError::ProviderUnavailable(msg),
            ChainError::Rejected(_) => SwapError::UserRejected,
            ChainError::Dropped => SwapError::Reverted("transaction dropped".into()),
        }
    }

    /// Whether the failure came from a transaction the chain reverted.
    pub fn is_revert(&self) -> bool {
        matches!(
            self,
            SwapError::SlippageExceeded { .. }
                | SwapError::DeadlineExpired { .. }
                | SwapError::InsufficientAllowance { .. }
                | SwapError::Reverted(_)
        )
    }

    /// Map a failure of the approval step.
    pub fn from_approval(err: ChainError) -> Self {
        match err {
            ChainError::Rejected(_) => SwapError::UserRejected,
            ChainError::Transport(msg) => SwapError::ProviderUnavailable(msg),
            ChainError::Reverted(reason) => SwapError::ApprovalFailed(reason),
            ChainError::Dropped => SwapError::ApprovalFailed("approval dropped".into()),
        }
    }
}
