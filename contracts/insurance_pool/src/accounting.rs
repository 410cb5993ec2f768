use soroban_sdk::{log, Env};
use surety::math::mul_div_i128;

use crate::{
    distribution::{settle_position, RewardState},
    error::ContractError,
    lock::ensure_unlocked,
    storage::{Config, PoolState, Position},
};

/// Shares minted per base unit to the very first depositor.
pub const VIRTUAL_SHARE_SCALE: i128 = 1_000_000;

pub fn shares_to_mint(env: &Env, pool: &PoolState, amount: i128) -> Result<i128, ContractError> {
    let shares = if pool.total_shares == 0 {
        amount
            .checked_mul(VIRTUAL_SHARE_SCALE)
            .ok_or(ContractError::ContractMathError)?
    } else {
        if pool.total_assets == 0 {
            log!(env, "Insurance Pool: Join: Pool assets were fully slashed");
            return Err(ContractError::PoolDepleted);
        }
        mul_div_i128(env, amount, pool.total_shares, pool.total_assets)
            .ok_or(ContractError::ContractMathError)?
    };

    if shares == 0 {
        log!(env, "Insurance Pool: Join: Deposit of {} would mint no shares", amount);
        return Err(ContractError::InsufficientStake);
    }

    Ok(shares)
}

/// Base asset currently backing `shares`.
pub fn redeem_value(env: &Env, pool: &PoolState, shares: i128) -> Result<i128, ContractError> {
    if pool.total_shares == 0 {
        return Ok(0);
    }
    mul_div_i128(env, shares, pool.total_assets, pool.total_shares)
        .ok_or(ContractError::ContractMathError)
}

pub fn ensure_active(env: &Env, position: &Position) -> Result<(), ContractError> {
    if !position.active {
        log!(env, "Insurance Pool: Position {} is not active", position.id);
        return Err(ContractError::NotActive);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Exit {
    pub redeemed: i128,
    pub reward: i128,
}

/// Settles the reward of `position`, takes its shares out of the pool and
/// marks it inactive. Shared by direct quits and signed batches.
///
/// `rewards` must already be advanced to the current ledger time.
pub fn exit_position(
    env: &Env,
    config: &Config,
    pool: &mut PoolState,
    rewards: &mut RewardState,
    position: &mut Position,
) -> Result<Exit, ContractError> {
    ensure_active(env, position)?;
    ensure_unlocked(env, position, config)?;

    let reward = settle_position(
        env,
        rewards,
        pool.total_shares,
        position,
        config.episode_duration,
    )?;
    let redeemed = redeem_value(env, pool, position.shares)?;

    pool.total_assets -= redeemed;
    pool.total_shares -= position.shares;
    position.active = false;

    Ok(Exit { redeemed, reward })
}
