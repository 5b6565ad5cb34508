//! Slippage- and deadline-bounded swap execution.

use crate::dex::{QuoteEngine, SwapBackend};
use crate::errors::SwapError;
use crate::models::{SwapOrder, SwapReceipt, SwapStage};
use crate::settings::{min_amount_out, validate_slippage};
use crate::utils::now_unix;
use ethers::types::{Address, U256};
use tokio::sync::watch;
use tracing::{info, warn};

/// Submits swaps protected against price movement between quote and inclusion.
///
/// Nothing here retries: a failed or reverted transaction is reported and the
/// user decides whether to try again.
pub struct SwapExecutor<B> {
    engine: QuoteEngine<B>,
    deadline_secs: u64,
    stage: watch::Sender<SwapStage>,
}

impl<B: SwapBackend> SwapExecutor<B> {
    pub fn new(engine: QuoteEngine<B>, deadline_secs: u64) -> Self {
        let (stage, _rx) = watch::channel(SwapStage::Idle);
        Self {
            engine,
            deadline_secs,
            stage,
        }
    }

    pub fn engine(&self) -> &QuoteEngine<B> {
        &self.engine
    }

    /// Progress notifications for the swap currently in flight.
    pub fn stages(&self) -> watch::Receiver<SwapStage> {
        self.stage.subscribe()
    }

    /// Re-quote, bound the output by `slippage_percent`, top up the router
    /// allowance if needed, then submit with a deadline of now plus the
    /// configured window.
    pub async fn execute_swap(
        &self,
        from: &str,
        to: &str,
        amount_in: &str,
        slippage_percent: f64,
        recipient: Address,
    ) -> Result<SwapReceipt, SwapError> {
        self.run(from, to, amount_in, slippage_percent, recipient, None)
            .await
    }

    /// Same as [`execute_swap`](Self::execute_swap) with an explicit absolute deadline.
    pub async fn execute_swap_with_deadline(
        &self,
        from: &str,
        to: &str,
        amount_in: &str,
        slippage_percent: f64,
        recipient: Address,
        deadline: u64,
    ) -> Result<SwapReceipt, SwapError> {
        self.run(from, to, amount_in, slippage_percent, recipient, Some(deadline))
            .await
    }

    async fn run(
        &self,
        from: &str,
        to: &str,
        amount_in: &str,
        slippage_percent: f64,
        recipient: Address,
        deadline: Option<u64>,
    ) -> Result<SwapReceipt, SwapError> {
        let result = self
            .guarded_swap(from, to, amount_in, slippage_percent, recipient, deadline)
            .await;
        if let Err(err) = &result {
            let submitted = matches!(*self.stage.borrow(), SwapStage::Submitting);
            match err {
                SwapError::NoRouteAvailable { .. } => {}
                _ if submitted && err.is_revert() => {
                    self.stage.send_replace(SwapStage::Reverted(err.to_string()));
                }
                _ => {
                    self.stage.send_replace(SwapStage::Failed(err.to_string()));
                }
            }
            warn!(error = %err, "[SWAP] failed");
        }
        result
    }

    async fn guarded_swap(
        &self,
        from: &str,
        to: &str,
        amount_in: &str,
        slippage_percent: f64,
        recipient: Address,
        deadline: Option<u64>,
    ) -> Result<SwapReceipt, SwapError> {
        validate_slippage(slippage_percent)?;
        if let Some(deadline) = deadline {
            ensure_not_expired(deadline)?;
        }

        self.stage.send_replace(SwapStage::Quoting);
        let (src, dst) = self.engine.resolve_pair(from, to)?;
        let quote = self.engine.get_quote(from, to, amount_in).await?;
        if quote.amount_in.is_zero() {
            return Err(SwapError::InvalidAmount("amount must be greater than zero".into()));
        }
        if quote.is_no_route() {
            self.stage.send_replace(SwapStage::NoRoute);
            return Err(SwapError::NoRouteAvailable {
                from: src.symbol.clone(),
                to: dst.symbol.clone(),
            });
        }
        self.stage.send_replace(SwapStage::Quoted(quote.clone()));

        let min_out = min_amount_out(quote.amount_out, slippage_percent);
        info!(
            from = %src.symbol,
            to = %dst.symbol,
            quoted = %quote.amount_out_display(),
            min_out = %crate::units::format_units(min_out, dst.decimals),
            slippage = slippage_percent,
            "[SWAP] re-quoted"
        );

        let backend = self.engine.backend();
        let owner = backend.account();
        let allowance = backend
            .router_allowance(src.address, owner)
            .await
            .map_err(SwapError::from_approval)?;
        let approval = if allowance < quote.amount_in {
            self.stage.send_replace(SwapStage::Approving);
            info!(token = %src.symbol, %allowance, "[SWAP] allowance short, approving router");
            let outcome = backend
                .approve_router(src.address, U256::MAX)
                .await
                .map_err(SwapError::from_approval)?;
            Some(outcome)
        } else {
            None
        };

        let deadline = deadline.unwrap_or_else(|| now_unix().saturating_add(self.deadline_secs));
        ensure_not_expired(deadline)?;

        let order = SwapOrder {
            amount_in: quote.amount_in,
            min_out,
            path: quote.path.clone(),
            recipient,
            deadline,
        };
        self.stage.send_replace(SwapStage::Submitting);
        let swap = backend
            .swap_exact_tokens(&order)
            .await
            .map_err(|e| SwapError::from_chain(e, src.address, min_out, deadline))?;

        info!(tx_hash = ?swap.tx_hash, block = ?swap.block_number, "[SWAP] confirmed");
        self.stage.send_replace(SwapStage::Confirmed(swap.tx_hash));
        Ok(SwapReceipt {
            order,
            quoted_out: quote.amount_out,
            approval,
            swap,
        })
    }
}

fn ensure_not_expired(deadline: u64) -> Result<(), SwapError> {
    let now = now_unix();
    if deadline <= now {
        return Err(SwapError::DeadlineExpired { deadline, now });
    }
    Ok(())
}
