//! LP staking against a MasterChef-style farm contract.

use crate::dex::client::{Erc20, contract_error, send_and_confirm};
use crate::errors::ChainError;
use crate::models::TxOutcome;
use crate::units::{format_units, parse_units};
use ethers::{
    contract::abigen,
    providers::Middleware,
    types::{Address, U256},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

abigen!(
    MasterChef,
    r#"[
        function poolLength() external view returns (uint256)
        function poolInfo(uint256 pid) external view returns (address lpToken, uint256 allocPoint, uint256 lastRewardBlock, uint256 accCakePerShare)
        function userInfo(uint256 pid, address user) external view returns (uint256 amount, uint256 rewardDebt)
        function pendingCake(uint256 pid, address user) external view returns (uint256)
        function deposit(uint256 pid, uint256 amount) external
        function withdraw(uint256 pid, uint256 amount) external
        function enterStaking(uint256 amount) external
        function leaveStaking(uint256 amount) external
    ]"#,
);

/// Pool 0 stakes the reward token itself and uses the staking entry points.
const MANUAL_STAKING_PID: u64 = 0;
const REWARD_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FarmError {
    #[error("farm pool {pid} does not exist ({len} pools)")]
    UnknownPool { pid: u64, len: u64 },

    #[error("cannot withdraw {requested}, only {staked} staked")]
    ExceedsStake { requested: U256, staked: U256 },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("LP token approval failed: {0}")]
    Approval(ChainError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmPool {
    pub pid: u64,
    pub lp_token: Address,
    pub alloc_point: U256,
    pub lp_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmPosition {
    pub staked: U256,
    pub pending_reward: U256,
}

impl FarmPosition {
    pub fn summary(&self, lp_decimals: u8) -> String {
        format!(
            "staked {} LP, pending {} reward",
            format_units(self.staked, lp_decimals),
            format_units(self.pending_reward, REWARD_DECIMALS)
        )
    }
}

/// Client for one farm contract acting for `account`.
pub struct Farm<M> {
    chef: MasterChef<M>,
    client: Arc<M>,
    account: Address,
}

impl<M: Middleware + 'static> Farm<M> {
    pub fn new(client: Arc<M>, chef: Address, account: Address) -> Self {
        Self {
            chef: MasterChef::new(chef, client.clone()),
            client,
            account,
        }
    }

    pub async fn pool_length(&self) -> Result<u64, FarmError> {
        let len = self.chef.pool_length().call().await.map_err(contract_error)?;
        Ok(len.low_u64())
    }

    pub async fn pool(&self, pid: u64) -> Result<FarmPool, FarmError> {
        let len = self.pool_length().await?;
        ensure_pool_exists(pid, len)?;
        let (lp_token, alloc_point, _last_reward_block, _acc_per_share) = self
            .chef
            .pool_info(U256::from(pid))
            .call()
            .await
            .map_err(contract_error)?;
        let lp_decimals = Erc20::new(lp_token, self.client.clone())
            .decimals()
            .call()
            .await
            .map_err(contract_error)?;
        Ok(FarmPool {
            pid,
            lp_token,
            alloc_point,
            lp_decimals,
        })
    }

    pub async fn position(&self, pid: u64, user: Address) -> Result<FarmPosition, FarmError> {
        let pid = U256::from(pid);
        let user_call = self.chef.user_info(pid, user);
        let pending_call = self.chef.pending_cake(pid, user);
        let (user_info, pending_reward) = futures::try_join!(user_call.call(), pending_call.call())
            .map_err(contract_error)?;
        Ok(FarmPosition {
            staked: user_info.0,
            pending_reward,
        })
    }

    /// Stake `amount` LP tokens, approving the farm first if the allowance is short.
    pub async fn deposit(&self, pid: u64, amount: &str) -> Result<TxOutcome, FarmError> {
        let pool = self.pool(pid).await?;
        let amount = parse_positive(amount, pool.lp_decimals)?;

        let lp = Erc20::new(pool.lp_token, self.client.clone());
        let allowance = lp
            .allowance(self.account, self.chef.address())
            .call()
            .await
            .map_err(contract_error)?;
        if allowance < amount {
            info!(pid, lp_token = ?pool.lp_token, "[FARM] approving LP token");
            send_and_confirm(lp.approve(self.chef.address(), U256::MAX))
                .await
                .map_err(FarmError::Approval)?;
        }

        info!(pid, amount = %format_units(amount, pool.lp_decimals), "[FARM] deposit");
        let outcome = if pid == MANUAL_STAKING_PID {
            send_and_confirm(self.chef.enter_staking(amount)).await?
        } else {
            send_and_confirm(self.chef.deposit(U256::from(pid), amount)).await?
        };
        Ok(outcome)
    }

    /// Unstake `amount` LP tokens; pending rewards are paid out by the contract.
    pub async fn withdraw(&self, pid: u64, amount: &str) -> Result<TxOutcome, FarmError> {
        let pool = self.pool(pid).await?;
        let amount = parse_positive(amount, pool.lp_decimals)?;
        let position = self.position(pid, self.account).await?;
        ensure_withdrawable(amount, position.staked)?;

        info!(pid, amount = %format_units(amount, pool.lp_decimals), "[FARM] withdraw");
        let outcome = if pid == MANUAL_STAKING_PID {
            send_and_confirm(self.chef.leave_staking(amount)).await?
        } else {
            send_and_confirm(self.chef.withdraw(U256::from(pid), amount)).await?
        };
        Ok(outcome)
    }

    /// Claim pending rewards by depositing zero.
    pub async fn harvest(&self, pid: u64) -> Result<TxOutcome, FarmError> {
        ensure_pool_exists(pid, self.pool_length().await?)?;
        info!(pid, "[FARM] harvest");
        let outcome = if pid == MANUAL_STAKING_PID {
            send_and_confirm(self.chef.enter_staking(U256::zero())).await?
        } else {
            send_and_confirm(self.chef.deposit(U256::from(pid), U256::zero())).await?
        };
        Ok(outcome)
    }
}

fn ensure_pool_exists(pid: u64, len: u64) -> Result<(), FarmError> {
    if pid >= len {
        return Err(FarmError::UnknownPool { pid, len });
    }
    Ok(())
}

fn ensure_withdrawable(requested: U256, staked: U256) -> Result<(), FarmError> {
    if requested > staked {
        return Err(FarmError::ExceedsStake { requested, staked });
    }
    Ok(())
}

fn parse_positive(amount: &str, decimals: u8) -> Result<U256, FarmError> {
    let value = parse_units(amount, decimals).map_err(|e| FarmError::InvalidAmount(e.to_string()))?;
    if value.is_zero() {
        return Err(FarmError::InvalidAmount("amount must be greater than zero".into()));
    }
    Ok(value)
}
