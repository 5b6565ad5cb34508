//! Static token configuration for BNB Smart Chain mainnet.

use crate::errors::{AppError, SwapError};
use crate::models::TokenDescriptor;
use ethers::types::Address;
use std::collections::HashMap;

/// Wrapped BNB, used as the bridge token for two-hop routes.
pub const WBNB: &str = "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c";
pub const BUSD: &str = "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56";
pub const USDT: &str = "0x55d398326f99059fF775485246999027B3197955";
pub const CAKE: &str = "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82";
pub const BTCB: &str = "0x7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c";
pub const ETH: &str = "0x2170Ed0880ac9A755fd29B2688956BD959F933F8";

/// PancakeSwap V2 router.
pub const PANCAKE_ROUTER_V2: &str = "0x10ED43C718714eb63d5aA57B78B54704E256024E";
/// PancakeSwap MasterChef (v1).
pub const PANCAKE_MASTERCHEF: &str = "0x73feaa1eE314F8c655E354234017bE2193C9E24E";

const MAINNET_TOKENS: &[(&str, &str, u8)] = &[
    ("WBNB", WBNB, 18),
    ("BUSD", BUSD, 18),
    ("USDT", USDT, 18),
    ("CAKE", CAKE, 18),
    ("BTCB", BTCB, 18),
    ("ETH", ETH, 18),
];

/// Symbol-keyed token lookup plus the designated bridge token.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: HashMap<String, TokenDescriptor>,
    bridge: TokenDescriptor,
}

impl TokenRegistry {
    /// Build a registry; `bridge_symbol` must be one of `tokens`.
    pub fn new(tokens: Vec<TokenDescriptor>, bridge_symbol: &str) -> Result<Self, SwapError> {
        let tokens: HashMap<String, TokenDescriptor> = tokens
            .into_iter()
            .map(|t| (t.symbol.to_ascii_uppercase(), t))
            .collect();
        let bridge = tokens
            .get(&bridge_symbol.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| SwapError::UnknownToken(bridge_symbol.to_string()))?;
        Ok(Self { tokens, bridge })
    }

    /// Registry for BSC mainnet with WBNB as the bridge.
    pub fn bsc_mainnet() -> crate::errors::Result<Self> {
        let tokens = MAINNET_TOKENS
            .iter()
            .map(|(symbol, addr, decimals)| {
                parse_token_address(symbol, addr).map(|address| TokenDescriptor::new(symbol, address, *decimals))
            })
            .collect::<crate::errors::Result<Vec<_>>>()?;
        Ok(Self::new(tokens, "WBNB")?)
    }

    /// Symbols are matched case-insensitively.
    pub fn resolve(&self, symbol: &str) -> Result<&TokenDescriptor, SwapError> {
        self.tokens
            .get(&symbol.trim().to_ascii_uppercase())
            .ok_or_else(|| SwapError::UnknownToken(symbol.to_string()))
    }

    pub fn bridge(&self) -> &TokenDescriptor {
        &self.bridge
    }

    pub fn by_address(&self, address: Address) -> Option<&TokenDescriptor> {
        self.tokens.values().find(|t| t.address == address)
    }

    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.tokens.values().map(|t| t.symbol.as_str()).collect();
        out.sort_unstable();
        out
    }
}

fn parse_token_address(symbol: &str, raw: &str) -> crate::errors::Result<Address> {
    raw.parse()
        .map_err(|e| AppError::Config(format!("bad address for {symbol} ({raw}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_registry_resolves_case_insensitively() {
        let reg = TokenRegistry::bsc_mainnet().unwrap();
        let busd = reg.resolve("busd").unwrap();
        assert_eq!(busd.symbol, "BUSD");
        assert_eq!(busd.decimals, 18);
        assert_eq!(reg.bridge().symbol, "WBNB");
        assert_eq!(reg.symbols().len(), MAINNET_TOKENS.len());
        for symbol in reg.symbols() {
            assert!(!reg.resolve(symbol).unwrap().address.is_zero(), "{symbol}");
        }
        let wbnb: Address = WBNB.parse().unwrap();
        assert_eq!(reg.by_address(wbnb).map(|t| t.symbol.as_str()), Some("WBNB"));
    }

    #[test]
    fn malformed_address_is_a_config_error() {
        assert!(matches!(
            parse_token_address("BAD", "0x1234"),
            Err(AppError::Config(msg)) if msg.contains("BAD")
        ));
        assert_eq!(parse_token_address("WBNB", WBNB).unwrap(), WBNB.parse::<Address>().unwrap());
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let reg = TokenRegistry::bsc_mainnet().unwrap();
        assert_eq!(
            reg.resolve("DOGE"),
            Err(SwapError::UnknownToken("DOGE".into()))
        );
    }

    #[test]
    fn bridge_must_be_registered() {
        let t = TokenDescriptor::new("AAA", Address::repeat_byte(1), 8);
        assert!(TokenRegistry::new(vec![t], "WBNB").is_err());
    }
}
