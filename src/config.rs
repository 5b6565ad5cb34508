//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use crate::tokens::{PANCAKE_MASTERCHEF, PANCAKE_ROUTER_V2};
use ethers::types::Address;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const BSC_MAINNET_CHAIN_ID: u64 = 56;

/// Consolidated application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// HTTP JSON-RPC endpoint of a BNB Smart Chain node.
    pub rpc_url: String,
    /// Optional websocket endpoint for new-block subscriptions.
    pub ws_url: Option<String>,
    pub chain_id: u64,
    pub router: Address,
    pub masterchef: Address,
    /// Hex private key; only needed for transactions.
    pub private_key: Option<String>,
    pub settings_path: PathBuf,
    /// Fallback block poll interval, also used when waiting for receipts.
    pub poll_interval: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("rpc_url", &self.rpc_url)
            .field("ws_url", &self.ws_url)
            .field("chain_id", &self.chain_id)
            .field("router", &self.router)
            .field("masterchef", &self.masterchef)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("settings_path", &self.settings_path)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; lets tests avoid touching process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let rpc_url = get("RPC_URL")
            .ok_or_else(|| AppError::Config("Set RPC_URL to your BSC node HTTP endpoint".into()))?;
        let parsed = Url::parse(&rpc_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(format!("RPC_URL must be http(s), got {}", parsed.scheme())));
        }

        let ws_url = match get("WS_URL") {
            Some(ws) => {
                let parsed = Url::parse(&ws)?;
                if !matches!(parsed.scheme(), "ws" | "wss") {
                    return Err(AppError::Config(format!("WS_URL must be ws(s), got {}", parsed.scheme())));
                }
                Some(ws)
            }
            None => None,
        };

        let chain_id = match get("CHAIN_ID") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("CHAIN_ID must be an integer, got {raw}")))?,
            None => BSC_MAINNET_CHAIN_ID,
        };

        let router = parse_address("ROUTER_ADDRESS", get("ROUTER_ADDRESS"), PANCAKE_ROUTER_V2)?;
        let masterchef = parse_address("MASTERCHEF_ADDRESS", get("MASTERCHEF_ADDRESS"), PANCAKE_MASTERCHEF)?;

        let poll_secs: u64 = match get("POLL_INTERVAL_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Config(format!("POLL_INTERVAL_SECS must be an integer, got {raw}"))
            })?,
            None => 3,
        };
        if poll_secs == 0 {
            return Err(AppError::Config("POLL_INTERVAL_SECS must be positive".into()));
        }

        Ok(Self {
            rpc_url,
            ws_url,
            chain_id,
            router,
            masterchef,
            private_key: get("PRIVATE_KEY"),
            settings_path: get("SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("swap-settings.json")),
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

fn parse_address(key: &str, value: Option<String>, default: &str) -> Result<Address> {
    let raw = value.unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|_| AppError::Config(format!("{key} is not a valid address: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_with_only_rpc_url() {
        let cfg = load(&[("RPC_URL", "https://bsc-dataseed.binance.org/")]).unwrap();
        assert_eq!(cfg.chain_id, BSC_MAINNET_CHAIN_ID);
        assert_eq!(cfg.router, PANCAKE_ROUTER_V2.parse::<Address>().unwrap());
        assert_eq!(cfg.poll_interval, Duration::from_secs(3));
        assert!(cfg.private_key.is_none());
        assert!(cfg.ws_url.is_none());
    }

    #[test]
    fn missing_rpc_url_is_config_error() {
        assert!(matches!(load(&[]), Err(AppError::Config(_))));
        assert!(matches!(load(&[("RPC_URL", "  ")]), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_bad_values() {
        let rpc = ("RPC_URL", "https://bsc-dataseed.binance.org/");
        assert!(load(&[("RPC_URL", "not a url")]).is_err());
        assert!(load(&[("RPC_URL", "wss://node")]).is_err());
        assert!(load(&[rpc, ("WS_URL", "https://node")]).is_err());
        assert!(load(&[rpc, ("CHAIN_ID", "bsc")]).is_err());
        assert!(load(&[rpc, ("ROUTER_ADDRESS", "0x1234")]).is_err());
        assert!(load(&[rpc, ("POLL_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn private_key_is_redacted_in_debug() {
        let cfg = load(&[
            ("RPC_URL", "https://bsc-dataseed.binance.org/"),
            ("PRIVATE_KEY", "0xdeadbeef"),
        ])
        .unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("deadbeef"));
        assert!(shown.contains("<redacted>"));
    }
}
