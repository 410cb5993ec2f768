use soroban_sdk::{contracttype, log, Env};
use surety::episode::episode_end;

use crate::{
    error::ContractError,
    storage::{Config, Position},
};

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockPhase {
    /// The first lock period has not elapsed yet
    FirstLock,
    /// Past the first lock period but inside a later one: auto-restaked outside of
    /// a withdrawal window, or auto-restake turned off while a cycle was running
    Restaked,
    /// Inside the grace window that follows a lock period boundary
    WithdrawalWindow,
    /// Auto-restake is off and the final lock period is over
    Unlocked,
}

/// First second after the position's first lock period.
pub fn first_unlock(position: &Position, config: &Config) -> u64 {
    episode_end(position.first_end_episode, config.episode_duration)
}

fn restake_period(config: &Config) -> u64 {
    config.lock_cadence as u64 * config.episode_duration
}

pub fn lock_phase(position: &Position, now: u64, config: &Config) -> LockPhase {
    let unlock = first_unlock(position, config);
    if now < unlock {
        return LockPhase::FirstLock;
    }
    if !position.auto_restake {
        if now < episode_end(position.end_episode, config.episode_duration) {
            return LockPhase::Restaked;
        }
        return LockPhase::Unlocked;
    }

    let since_boundary = (now - unlock) % restake_period(config);
    if since_boundary < config.withdrawal_window {
        LockPhase::WithdrawalWindow
    } else {
        LockPhase::Restaked
    }
}

/// Fails unless the position may leave the pool right now.
pub fn ensure_unlocked(
    env: &Env,
    position: &Position,
    config: &Config,
) -> Result<(), ContractError> {
    match lock_phase(position, env.ledger().timestamp(), config) {
        LockPhase::FirstLock => {
            log!(
                env,
                "Insurance Pool: Exit: Position {} is in its first lock period",
                position.id
            );
            Err(ContractError::FirstLockActive)
        }
        LockPhase::Restaked => {
            log!(
                env,
                "Insurance Pool: Exit: Position {} is locked in a restake cycle",
                position.id
            );
            Err(ContractError::AutoRestakeLocked)
        }
        LockPhase::WithdrawalWindow | LockPhase::Unlocked => Ok(()),
    }
}

/// Last episode of the lock cycle running at `now`.
///
/// While still in the first lock period that is `first_end_episode`. Inside a
/// withdrawal window it is the cycle that just ended, otherwise the end of the
/// restake cycle in progress.
pub fn current_cycle_end(position: &Position, now: u64, config: &Config) -> u32 {
    let unlock = first_unlock(position, config);
    if now < unlock {
        return position.first_end_episode;
    }
    let elapsed = now - unlock;
    let mut cycles = (elapsed / restake_period(config)) as u32;
    if elapsed % restake_period(config) >= config.withdrawal_window {
        cycles += 1;
    }

    position.first_end_episode + cycles * config.lock_cadence
}
