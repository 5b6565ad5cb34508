//! Chain-state notifications and token balance reads.
//!
//! New blocks arrive through one `watch` channel regardless of transport: a
//! websocket `newHeads` subscription when available, HTTP polling otherwise.

use crate::dex::client::{Erc20, contract_error};
use crate::errors::{ChainError, Result};
use ethers::{
    providers::{Http, Middleware, Provider, Ws},
    types::{Address, U256},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where block notifications come from.
pub enum BlockSource {
    Poll {
        provider: Arc<Provider<Http>>,
        interval: Duration,
    },
    /// Subscribe over websocket, falling back to polling if it fails or ends.
    Subscribe {
        ws_url: String,
        fallback: Arc<Provider<Http>>,
        interval: Duration,
    },
}

/// Spawns a task publishing the latest block number into `tx`.
///
/// The task stops once every receiver has been dropped.
pub fn spawn_block_watcher(source: BlockSource, tx: watch::Sender<u64>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match source {
            BlockSource::Poll { provider, interval } => poll_blocks(provider, interval, tx).await,
            BlockSource::Subscribe {
                ws_url,
                fallback,
                interval,
            } => {
                match subscribe_blocks(&ws_url, &tx).await {
                    Ok(()) => warn!("[BLOCKS] subscription closed, falling back to polling"),
                    Err(e) => warn!(error = %e, "[BLOCKS] subscription failed, falling back to polling"),
                }
                if !tx.is_closed() {
                    poll_blocks(fallback, interval, tx).await;
                }
            }
        }
    })
}

async fn subscribe_blocks(ws_url: &str, tx: &watch::Sender<u64>) -> Result<()> {
    let ws = Provider::<Ws>::connect(ws_url).await?;
    let mut stream = ws.subscribe_blocks().await?;
    info!("[BLOCKS] subscribed to new heads");
    while let Some(block) = stream.next().await {
        if let Some(number) = block.number {
            publish_block(tx, number.as_u64());
        }
        if tx.is_closed() {
            break;
        }
    }
    Ok(())
}

pub(crate) async fn poll_blocks<M: Middleware>(provider: Arc<M>, interval: Duration, tx: watch::Sender<u64>) {
    info!(interval_ms = interval.as_millis() as u64, "[BLOCKS] polling");
    let mut ticker = tokio::time::interval(interval);
    while !tx.is_closed() {
        ticker.tick().await;
        match provider.get_block_number().await {
            Ok(number) => {
                publish_block(&tx, number.as_u64());
            }
            Err(e) => warn!(error = %e, "[BLOCKS] failed to fetch block number"),
        }
    }
    debug!("[BLOCKS] all receivers gone, stopping");
}

/// Publish `number` only if it advances the chain head.
pub fn publish_block(tx: &watch::Sender<u64>, number: u64) -> bool {
    tx.send_if_modified(|head| {
        if number > *head {
            *head = number;
            true
        } else {
            false
        }
    })
}

/// ERC20 `balanceOf(owner)`.
pub async fn token_balance<M: Middleware + 'static>(
    client: Arc<M>,
    token: Address,
    owner: Address,
) -> std::result::Result<U256, ChainError> {
    Erc20::new(token, client)
        .balance_of(owner)
        .call()
        .await
        .map_err(contract_error)
}

/// Re-read a balance on every new block, publishing only changes.
pub fn spawn_balance_watcher<M: Middleware + 'static>(
    client: Arc<M>,
    token: Address,
    owner: Address,
    mut blocks: watch::Receiver<u64>,
    tx: watch::Sender<U256>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match token_balance(client.clone(), token, owner).await {
                Ok(balance) => {
                    tx.send_if_modified(|current| {
                        let changed = *current != balance;
                        *current = balance;
                        changed
                    });
                }
                Err(e) => warn!(?token, error = %e, "[BALANCE] refresh failed"),
            }
            if tx.is_closed() || blocks.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{Token, encode};
    use ethers::types::{Bytes, U64};

    #[test]
    fn head_only_moves_forward() {
        let (tx, rx) = watch::channel(0u64);
        assert!(publish_block(&tx, 10));
        assert!(!publish_block(&tx, 10));
        assert!(!publish_block(&tx, 9));
        assert!(publish_block(&tx, 11));
        assert_eq!(*rx.borrow(), 11);
    }

    #[tokio::test]
    async fn polling_publishes_block_number() {
        let (provider, mock) = Provider::mocked();
        mock.push::<U64, _>(U64::from(123u64)).unwrap();

        let (tx, mut rx) = watch::channel(0u64);
        let handle = tokio::spawn(poll_blocks(Arc::new(provider), Duration::from_millis(5), tx));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 123);

        drop(rx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn reads_erc20_balance() {
        let (provider, mock) = Provider::mocked();
        let encoded = encode(&[Token::Uint(U256::from(1234u64))]);
        mock.push::<Bytes, _>(Bytes::from(encoded)).unwrap();

        let balance = token_balance(
            Arc::new(provider),
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0x42),
        )
        .await
        .unwrap();
        assert_eq!(balance, U256::from(1234u64));
    }
}
