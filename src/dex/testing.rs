//! In-memory [`SwapBackend`] for unit tests.

use crate::dex::SwapBackend;
use crate::errors::ChainError;
use crate::models::{SwapOrder, TokenDescriptor, TxOutcome};
use crate::tokens::TokenRegistry;
use ethers::types::{Address, H256, U256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn token(symbol: &str) -> Address {
    match symbol {
        "AAA" => Address::repeat_byte(0xaa),
        "BBB" => Address::repeat_byte(0xbb),
        "WBNB" => Address::repeat_byte(0x0b),
        other => panic!("unknown test token {other}"),
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Route {
    /// Final output independent of the input.
    Fixed(u64),
    /// Final output is `amount_in * k`.
    Scaled(u64),
    Revert(&'static str),
    Offline,
}

pub(crate) struct FakeBackend {
    account: Address,
    routes: Mutex<HashMap<Vec<Address>, Route>>,
    delays: Mutex<HashMap<U256, Duration>>,
    allowance: Mutex<U256>,
    calls: Mutex<Vec<&'static str>>,
    swaps: Mutex<Vec<SwapOrder>>,
    approvals: Mutex<Vec<(Address, U256)>>,
    approve_error: Mutex<Option<ChainError>>,
    swap_error: Mutex<Option<ChainError>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            account: Address::repeat_byte(0x42),
            routes: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            allowance: Mutex::new(U256::zero()),
            calls: Mutex::new(Vec::new()),
            swaps: Mutex::new(Vec::new()),
            approvals: Mutex::new(Vec::new()),
            approve_error: Mutex::new(None),
            swap_error: Mutex::new(None),
        }
    }

    /// AAA (8 decimals), BBB (18) and WBNB (18, bridge).
    pub(crate) fn registry() -> TokenRegistry {
        TokenRegistry::new(
            vec![
                TokenDescriptor::new("AAA", token("AAA"), 8),
                TokenDescriptor::new("BBB", token("BBB"), 18),
                TokenDescriptor::new("WBNB", token("WBNB"), 18),
            ],
            "WBNB",
        )
        .unwrap()
    }

    pub(crate) fn route(&self, symbols: &[&str], route: Route) {
        let path = symbols.iter().map(|s| token(s)).collect();
        self.routes.lock().unwrap().insert(path, route);
    }

    pub(crate) fn delay(&self, amount_in: U256, delay: Duration) {
        self.delays.lock().unwrap().insert(amount_in, delay);
    }

    pub(crate) fn set_allowance(&self, amount: U256) {
        *self.allowance.lock().unwrap() = amount;
    }

    pub(crate) fn fail_approve(&self, err: ChainError) {
        *self.approve_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_swap(&self, err: ChainError) {
        *self.swap_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn quote_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == "quote").count()
    }

    pub(crate) fn swaps(&self) -> Vec<SwapOrder> {
        self.swaps.lock().unwrap().clone()
    }

    pub(crate) fn approvals(&self) -> Vec<(Address, U256)> {
        self.approvals.lock().unwrap().clone()
    }

    fn log(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn mined(&self) -> TxOutcome {
        let n = self.calls.lock().unwrap().len() as u64;
        TxOutcome {
            tx_hash: H256::from_low_u64_be(n),
            block_number: Some(n),
            gas_used: None,
        }
    }
}

impl SwapBackend for FakeBackend {
    fn account(&self) -> Address {
        self.account
    }

    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>, ChainError> {
        self.log("quote");
        let delay = self.delays.lock().unwrap().get(&amount_in).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(Route::Revert("Pancake: no pair"));
        let out = match route {
            Route::Fixed(out) => U256::from(out),
            Route::Scaled(k) => amount_in * U256::from(k),
            Route::Revert(reason) => return Err(ChainError::Reverted(reason.into())),
            Route::Offline => return Err(ChainError::Transport("connection refused".into())),
        };
        let mut amounts = vec![amount_in; path.len() - 1];
        amounts.push(out);
        Ok(amounts)
    }

    async fn router_allowance(&self, _token: Address, owner: Address) -> Result<U256, ChainError> {
        assert_eq!(owner, self.account);
        self.log("allowance");
        Ok(*self.allowance.lock().unwrap())
    }

    async fn approve_router(&self, token: Address, amount: U256) -> Result<TxOutcome, ChainError> {
        self.log("approve");
        if let Some(err) = self.approve_error.lock().unwrap().take() {
            return Err(err);
        }
        self.approvals.lock().unwrap().push((token, amount));
        *self.allowance.lock().unwrap() = amount;
        Ok(self.mined())
    }

    async fn swap_exact_tokens(&self, order: &SwapOrder) -> Result<TxOutcome, ChainError> {
        self.log("swap");
        self.swaps.lock().unwrap().push(order.clone());
        if let Some(err) = self.swap_error.lock().unwrap().take() {
            return Err(err);
        }
        if *self.allowance.lock().unwrap() < order.amount_in {
            return Err(ChainError::Reverted("TransferHelper: TRANSFER_FROM_FAILED".into()));
        }
        Ok(self.mined())
    }
}
