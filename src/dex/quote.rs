//! Best-route quoting over a direct and a bridge-token path.

use crate::dex::SwapBackend;
use crate::errors::{ChainError, SwapError};
use crate::models::{Quote, TokenDescriptor};
use crate::tokens::TokenRegistry;
use crate::units::parse_units;
use ethers::types::{Address, U256};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Read-only quoting against a [`SwapBackend`].
pub struct QuoteEngine<B> {
    backend: B,
    registry: TokenRegistry,
}

impl<B: SwapBackend> QuoteEngine<B> {
    pub fn new(backend: B, registry: TokenRegistry) -> Self {
        Self { backend, registry }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Resolve both symbols; the same token on both sides is rejected.
    pub fn resolve_pair(
        &self,
        from: &str,
        to: &str,
    ) -> Result<(&TokenDescriptor, &TokenDescriptor), SwapError> {
        let src = self.registry.resolve(from)?;
        let dst = self.registry.resolve(to)?;
        if src.address == dst.address {
            return Err(SwapError::InvalidPair(src.symbol.clone()));
        }
        Ok((src, dst))
    }

    /// Best `(path, amount_out)` for a human-readable `amount_in`.
    ///
    /// A quote with an empty path means no route exists.
    pub async fn get_quote(&self, from: &str, to: &str, amount_in: &str) -> Result<Quote, SwapError> {
        let (src, dst) = self.resolve_pair(from, to)?;
        let amount_in = parse_units(amount_in, src.decimals)?;
        if amount_in.is_zero() {
            // every router path reverts on zero input
            debug!(from = %src.symbol, to = %dst.symbol, "[QUOTE] zero input, no route");
            return Ok(Quote::no_route(amount_in, dst.decimals));
        }
        self.best_route(src, dst, amount_in).await
    }

    /// Candidate paths in evaluation order: direct first, then via the bridge.
    pub fn candidate_paths(&self, src: Address, dst: Address) -> Vec<Vec<Address>> {
        let bridge = self.registry.bridge().address;
        let mut paths = vec![vec![src, dst]];
        if src != bridge && dst != bridge {
            paths.push(vec![src, bridge, dst]);
        }
        paths
    }

    /// Query every candidate and keep the strictly largest final output.
    ///
    /// Failing candidates are skipped. Only when every candidate failed at the
    /// transport level does the whole quote fail.
    pub async fn best_route(
        &self,
        src: &TokenDescriptor,
        dst: &TokenDescriptor,
        amount_in: U256,
    ) -> Result<Quote, SwapError> {
        let paths = self.candidate_paths(src.address, dst.address);
        let results = join_all(
            paths
                .iter()
                .map(|path| self.backend.amounts_out(amount_in, path)),
        )
        .await;

        let mut best = Quote::no_route(amount_in, dst.decimals);
        let mut transport_failures = Vec::new();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(amounts) => {
                    let out = amounts.last().copied().unwrap_or_default();
                    if amounts.len() != path.len() || out.is_zero() {
                        debug!(hops = path.len() - 1, "[QUOTE] candidate yields nothing");
                        continue;
                    }
                    if out > best.amount_out {
                        best = Quote {
                            path: path.clone(),
                            amount_in,
                            amount_out: out,
                            out_decimals: dst.decimals,
                        };
                    }
                }
                Err(ChainError::Transport(msg)) => {
                    warn!(hops = path.len() - 1, error = %msg, "[QUOTE] candidate unreachable");
                    transport_failures.push(msg);
                }
                Err(e) => {
                    debug!(hops = path.len() - 1, error = %e, "[QUOTE] candidate unavailable");
                }
            }
        }

        if best.is_no_route() && transport_failures.len() == paths.len() {
            return Err(SwapError::ProviderUnavailable(transport_failures.join("; ")));
        }
        if best.is_no_route() {
            info!(from = %src.symbol, to = %dst.symbol, "[QUOTE] no route available");
        } else {
            info!(
                from = %src.symbol,
                to = %dst.symbol,
                hops = best.hops(),
                amount_out = %best.amount_out_display(),
                "[QUOTE] best route"
            );
        }
        Ok(best)
    }

    /// Quote and publish through `sequencer`, returning `None` when a newer
    /// request superseded this one before it finished.
    pub async fn quote_latest(
        &self,
        sequencer: &QuoteSequencer,
        from: &str,
        to: &str,
        amount_in: &str,
    ) -> Result<Option<Quote>, SwapError> {
        let ticket = sequencer.issue();
        let quote = self.get_quote(from, to, amount_in).await;
        if !sequencer.is_current(ticket) {
            debug!(ticket = ticket.0, "[QUOTE] superseded, dropping result");
            return Ok(None);
        }
        let quote = quote?;
        Ok(sequencer.publish(ticket, quote.clone()).then_some(quote))
    }
}

/// Identity of one quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QuoteTicket(pub u64);

/// Drops results of quote requests that a later request has superseded.
pub struct QuoteSequencer {
    latest: AtomicU64,
    tx: watch::Sender<Option<(QuoteTicket, Quote)>>,
}

impl Default for QuoteSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteSequencer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            latest: AtomicU64::new(0),
            tx,
        }
    }

    pub fn issue(&self) -> QuoteTicket {
        QuoteTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: QuoteTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Surface `quote` if `ticket` is still the latest request.
    pub fn publish(&self, ticket: QuoteTicket, quote: Quote) -> bool {
        let latest = &self.latest;
        self.tx.send_if_modified(|slot| {
            let newer_shown = slot.as_ref().is_some_and(|(shown, _)| *shown > ticket);
            if latest.load(Ordering::SeqCst) != ticket.0 || newer_shown {
                return false;
            }
            *slot = Some((ticket, quote));
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<(QuoteTicket, Quote)>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<Quote> {
        self.tx.borrow().as_ref().map(|(_, q)| q.clone())
    }
}
