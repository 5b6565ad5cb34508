//! Explicit wallet session handed to everything that talks to the chain.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::Address,
};
use std::sync::Arc;
use tracing::info;

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// RPC provider plus, when a key is configured, a signing client.
#[derive(Clone)]
pub struct WalletSession {
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    chain_id: u64,
}

impl WalletSession {
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())?.interval(config.poll_interval);
        let signer = match &config.private_key {
            Some(key) => {
                let wallet = key
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()?
                    .with_chain_id(config.chain_id);
                info!(address = ?wallet.address(), "[WALLET] signer loaded");
                Some(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
            }
            None => None,
        };
        Ok(Self {
            provider: Arc::new(provider),
            signer,
            chain_id: config.chain_id,
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Signing address, if this session can send transactions.
    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn signer(&self) -> Result<Arc<SignerClient>> {
        self.signer
            .clone()
            .ok_or_else(|| AppError::Config("Set PRIVATE_KEY to send transactions".into()))
    }

    /// Fails when the node serves a different chain than configured.
    pub async fn verify_chain(&self) -> Result<()> {
        let remote = self.provider.get_chainid().await?.as_u64();
        if remote != self.chain_id {
            return Err(AppError::Config(format!(
                "node reports chain id {remote}, expected {}",
                self.chain_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(extra: &[(&str, &str)]) -> AppConfig {
        let mut env: HashMap<String, String> = HashMap::new();
        env.insert("RPC_URL".into(), "http://127.0.0.1:8545".into());
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap()
    }

    #[test]
    fn read_only_session_has_no_signer() {
        let session = WalletSession::connect(&config(&[])).unwrap();
        assert!(session.address().is_none());
        assert!(matches!(session.signer(), Err(AppError::Config(_))));
    }

    #[test]
    fn private_key_yields_signer_address() {
        // well-known anvil/hardhat account #0
        let session = WalletSession::connect(&config(&[(
            "PRIVATE_KEY",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )]))
        .unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(session.address(), Some(expected));
        assert_eq!(session.chain_id(), 56);
    }
}
