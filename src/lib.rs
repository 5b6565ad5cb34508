//! Core library for the swap-guard project.
//!
//! Best-route quoting and slippage-bounded swap execution against a
//! UniswapV2-style router on BNB Smart Chain, plus the thin read/submit
//! surfaces around it (balances, farm staking, block notifications).

pub mod chain;
pub mod config;
pub mod dex;
pub mod errors;
pub mod farm;
pub mod models;
pub mod settings;
pub mod tokens;
pub mod units;
pub mod utils;
pub mod wallet;
