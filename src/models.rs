//! Shared data structures used throughout the application.

use ethers::types::{Address, H256, U256};

/// Static description of a tradable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub address: Address,
    /// Fixed-point precision used between on-chain integers and display values.
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn new(symbol: &str, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            address,
            decimals,
        }
    }
}

/// Best route found for a given input amount.
///
/// An empty `path` means no route was available; that is distinct from a
/// route whose output happens to be zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Precision of the destination token.
    pub out_decimals: u8,
}

impl Quote {
    pub fn no_route(amount_in: U256, out_decimals: u8) -> Self {
        Self {
            path: Vec::new(),
            amount_in,
            amount_out: U256::zero(),
            out_decimals,
        }
    }

    /// Output amount as a human-readable decimal string.
    pub fn amount_out_display(&self) -> String {
        crate::units::format_units(self.amount_out, self.out_decimals)
    }

    pub fn is_no_route(&self) -> bool {
        self.path.is_empty()
    }

    /// Number of pool hops in the chosen route.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Fully resolved parameters of a `swapExactTokensForTokens` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOrder {
    pub amount_in: U256,
    pub min_out: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Absolute unix timestamp after which the router must reject the swap.
    pub deadline: u64,
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Result of a confirmed swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub order: SwapOrder,
    pub quoted_out: U256,
    /// Present when an approval had to be sent first.
    pub approval: Option<TxOutcome>,
    pub swap: TxOutcome,
}

/// Progress of a swap, published for UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SwapStage {
    #[default]
    Idle,
    Quoting,
    Quoted(Quote),
    NoRoute,
    Approving,
    Submitting,
    Confirmed(H256),
    Reverted(String),
    /// Terminal for failures that happen before anything reached the chain.
    Failed(String),
}

impl SwapStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStage::NoRoute
                | SwapStage::Confirmed(_)
                | SwapStage::Reverted(_)
                | SwapStage::Failed(_)
        )
    }
}
