//! DEX integration for UniswapV2-style routers.
//!
//! Quoting and execution are written against [`SwapBackend`] so they can be
//! driven by the real chain ([`EvmBackend`]) or an in-memory double in tests.

use crate::errors::ChainError;
use crate::models::{SwapOrder, TxOutcome};
use ethers::types::{Address, U256};

pub mod client;
pub mod execute;
pub mod quote;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{EvmBackend, Erc20, Router};
pub use execute::SwapExecutor;
pub use quote::{QuoteEngine, QuoteSequencer, QuoteTicket};

/// Chain operations the swap flow depends on.
///
/// Write methods return only after the transaction has at least one
/// confirmation.
#[allow(async_fn_in_trait)]
pub trait SwapBackend {
    /// Address the backend signs for.
    fn account(&self) -> Address;

    /// Router `getAmountsOut`: one amount per path element, last is the output.
    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>, ChainError>;

    /// ERC20 allowance granted by `owner` to the router.
    async fn router_allowance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// Approve the router to spend `amount` of `token`, waiting for confirmation.
    async fn approve_router(&self, token: Address, amount: U256) -> Result<TxOutcome, ChainError>;

    /// `swapExactTokensForTokens`, waiting for confirmation.
    async fn swap_exact_tokens(&self, order: &SwapOrder) -> Result<TxOutcome, ChainError>;
}
