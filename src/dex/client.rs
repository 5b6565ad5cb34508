use crate::dex::SwapBackend;
use crate::errors::ChainError;
use crate::models::{SwapOrder, TxOutcome};
use ethers::{
    abi::Detokenize,
    contract::{ContractCall, ContractError, abigen},
    providers::{Middleware, ProviderError},
    types::{Address, BlockId, BlockNumber, U64, U256},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

abigen!(
    Router,
    r#"[
        function factory() external view returns (address)
        function WETH() external view returns (address)
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts)
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts)
    ]"#,
);

abigen!(
    Erc20,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function allowance(address owner, address spender) external view returns (uint256)
        function approve(address spender, uint256 amount) external returns (bool)
        function decimals() external view returns (uint8)
        function symbol() external view returns (string)
    ]"#,
);

/// [`SwapBackend`] over a live router contract.
#[derive(Clone)]
pub struct EvmBackend<M> {
    client: Arc<M>,
    router: Router<M>,
    account: Address,
}

impl<M: Middleware + 'static> EvmBackend<M> {
    pub fn new(client: Arc<M>, router_addr: Address, account: Address) -> Self {
        let router = Router::new(router_addr, client.clone());
        Self {
            client,
            router,
            account,
        }
    }

    pub fn router_address(&self) -> Address {
        self.router.address()
    }

    /// The router's wrapped native token (`WETH()`), used as a sanity check
    /// against the configured bridge token.
    pub async fn wrapped_native(&self) -> Result<Address, ChainError> {
        self.router.weth().call().await.map_err(contract_error)
    }

    pub fn token(&self, token: Address) -> Erc20<M> {
        Erc20::new(token, self.client.clone())
    }
}

impl<M: Middleware + 'static> SwapBackend for EvmBackend<M> {
    fn account(&self) -> Address {
        self.account
    }

    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>, ChainError> {
        self.router
            .get_amounts_out(amount_in, path.to_vec())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn router_allowance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.token(token)
            .allowance(owner, self.router.address())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn approve_router(&self, token: Address, amount: U256) -> Result<TxOutcome, ChainError> {
        let erc20 = self.token(token);
        let call = erc20.approve(self.router.address(), amount);
        send_and_confirm(call).await
    }

    async fn swap_exact_tokens(&self, order: &SwapOrder) -> Result<TxOutcome, ChainError> {
        let call = self.router.swap_exact_tokens_for_tokens(
            order.amount_in,
            order.min_out,
            order.path.clone(),
            order.recipient,
            U256::from(order.deadline),
        );
        send_and_confirm(call).await
    }
}

/// Send a contract call and wait for one confirmation.
///
/// A mined receipt with status 0 is replayed against the parent block to
/// recover the revert reason.
pub(crate) async fn send_and_confirm<M, D>(call: ContractCall<M, D>) -> Result<TxOutcome, ChainError>
where
    M: Middleware + 'static,
    D: Detokenize,
{
    let pending = call.send().await.map_err(contract_error)?;
    let tx_hash = *pending;
    info!(?tx_hash, "[TX] submitted, awaiting confirmation");

    let receipt = pending
        .confirmations(1)
        .await
        .map_err(|e| provider_error(&e))?
        .ok_or(ChainError::Dropped)?;

    let outcome = TxOutcome {
        tx_hash,
        block_number: receipt.block_number.map(|n| n.as_u64()),
        gas_used: receipt.gas_used,
    };
    if receipt.status == Some(U64::from(1)) {
        info!(?tx_hash, block = ?outcome.block_number, "[TX] confirmed");
        return Ok(outcome);
    }

    let reason = match outcome.block_number {
        Some(block) if block > 0 => {
            let parent = BlockId::Number(BlockNumber::Number(U64::from(block - 1)));
            match call.clone().block(parent).call().await {
                Err(e) => match contract_error(e) {
                    ChainError::Reverted(reason) => reason,
                    other => {
                        debug!(error = %other, "[TX] replay failed without a revert reason");
                        "execution reverted".to_string()
                    }
                },
                Ok(_) => "execution reverted".to_string(),
            }
        }
        _ => "execution reverted".to_string(),
    };
    warn!(?tx_hash, %reason, "[TX] reverted on-chain");
    Err(ChainError::Reverted(reason))
}

/// Turn a contract-call failure into a [`ChainError`].
pub(crate) fn contract_error<M: Middleware>(err: ContractError<M>) -> ChainError {
    if let Some(reason) = err.decode_revert::<String>() {
        return ChainError::Reverted(reason);
    }
    classify_rpc_message(&err.to_string())
}

pub(crate) fn provider_error(err: &ProviderError) -> ChainError {
    classify_rpc_message(&err.to_string())
}

/// Classify a JSON-RPC / wallet error message.
pub(crate) fn classify_rpc_message(msg: &str) -> ChainError {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("code: 4001")
    {
        return ChainError::Rejected(msg.to_string());
    }
    const REVERTED: &str = "execution reverted";
    if let Some(idx) = lower.find(REVERTED) {
        let reason = msg[idx + REVERTED.len()..]
            .trim_start_matches(':')
            .trim()
            .trim_matches('"');
        return ChainError::Reverted(if reason.is_empty() {
            REVERTED.to_string()
        } else {
            reason.to_string()
        });
    }
    ChainError::Transport(msg.to_string())
}
