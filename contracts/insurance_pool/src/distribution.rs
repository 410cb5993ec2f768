use soroban_sdk::{contracttype, log, symbol_short, Env, Map, Symbol};
use surety::{
    episode::{episode_of, episode_start},
    math::mul_div,
    ttl::{
        INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL, PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    },
};

use crate::{error::ContractError, storage::Position};

/// Fixed point scale of the reward-per-share accumulator.
pub const REWARD_PRECISION: u128 = 1_000_000_000_000_000_000_000_000;

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RewardState {
    /// Cumulative reward per share, scaled by `REWARD_PRECISION`
    pub reward_per_share: u128,
    /// Injected reward not yet released into the accumulator
    pub undistributed: u128,
    /// Moment at which `undistributed` is fully released
    pub drip_end: u64,
    pub last_update: u64,
    pub total_released: u128,
    pub total_paid: u128,
}
const REWARDS: Symbol = symbol_short!("REWARDS");

/// Boundary snapshots are grouped in pages, so catching up over many
/// episodes writes one entry per page instead of one per episode.
pub const SNAPSHOTS_PER_PAGE: u32 = 64;

#[derive(Clone)]
#[contracttype]
pub enum DistributionDataKey {
    /// Accumulator values at the first second of each episode of a page
    RewardSnapshots(u32),
}

pub fn get_reward_state(env: &Env) -> RewardState {
    let state = env.storage().instance().get(&REWARDS).unwrap_or_default();
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);

    state
}

pub fn save_reward_state(env: &Env, state: &RewardState) {
    env.storage().instance().set(&REWARDS, state);
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);
}

fn get_snapshot_page(env: &Env, page: u32) -> Option<Map<u32, u128>> {
    let key = DistributionDataKey::RewardSnapshots(page);
    let snapshots = env.storage().persistent().get(&key);
    if snapshots.is_some() {
        env.storage().persistent().extend_ttl(
            &key,
            PERSISTENT_RENEWAL_THRESHOLD,
            PERSISTENT_TARGET_TTL,
        );
    }

    snapshots
}

fn save_snapshot_page(env: &Env, page: u32, snapshots: &Map<u32, u128>) {
    let key = DistributionDataKey::RewardSnapshots(page);
    env.storage().persistent().set(&key, snapshots);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_reward_snapshot(env: &Env, episode: u32) -> Option<u128> {
    get_snapshot_page(env, episode / SNAPSHOTS_PER_PAGE)?.get(episode)
}

/// Part of `undistributed` that drips out between `last_update` and `timestamp`.
fn released_until(env: &Env, state: &RewardState, timestamp: u64) -> Result<u128, ContractError> {
    if state.undistributed == 0 || timestamp <= state.last_update {
        return Ok(0);
    }
    if timestamp >= state.drip_end {
        return Ok(state.undistributed);
    }

    mul_div(
        env,
        state.undistributed,
        (timestamp - state.last_update) as u128,
        (state.drip_end - state.last_update) as u128,
    )
    .ok_or(ContractError::ContractMathError)
}

/// Moves the accumulator forward to `timestamp` without touching storage.
///
/// While nobody holds shares the drip is paused: nothing is released and the
/// drip end moves forward by the idle time, so the next staker can't collect
/// reward that accrued before they joined.
pub fn project(
    env: &Env,
    state: &RewardState,
    total_shares: i128,
    timestamp: u64,
) -> Result<RewardState, ContractError> {
    let mut next = state.clone();
    if timestamp <= state.last_update {
        return Ok(next);
    }
    next.last_update = timestamp;

    if total_shares <= 0 {
        if state.undistributed > 0 && state.drip_end > state.last_update {
            next.drip_end = state.drip_end + (timestamp - state.last_update);
        }
        return Ok(next);
    }

    let released = released_until(env, state, timestamp)?;
    if released == 0 {
        return Ok(next);
    }
    let increase = mul_div(env, released, REWARD_PRECISION, total_shares as u128)
        .ok_or(ContractError::ContractMathError)?;

    next.reward_per_share = state
        .reward_per_share
        .checked_add(increase)
        .ok_or(ContractError::ContractMathError)?;
    next.undistributed = state.undistributed - released;
    next.total_released = state.total_released + released;

    Ok(next)
}

/// Brings the stored accumulator up to the current ledger time, recording a
/// snapshot for every episode boundary crossed since the previous update.
///
/// Must run before anything changes `total_shares` or `undistributed`.
pub fn advance(
    env: &Env,
    total_shares: i128,
    episode_duration: u64,
) -> Result<RewardState, ContractError> {
    let state = get_reward_state(env);
    let now = env.ledger().timestamp();
    if now <= state.last_update {
        return Ok(state);
    }

    let first_crossed = episode_of(state.last_update, episode_duration).saturating_add(1);
    let last_crossed = episode_of(now, episode_duration);
    if first_crossed <= last_crossed {
        let mut page = first_crossed / SNAPSHOTS_PER_PAGE;
        let mut snapshots = get_snapshot_page(env, page).unwrap_or_else(|| Map::new(env));
        for episode in first_crossed..=last_crossed {
            if episode / SNAPSHOTS_PER_PAGE != page {
                save_snapshot_page(env, page, &snapshots);
                page = episode / SNAPSHOTS_PER_PAGE;
                snapshots = get_snapshot_page(env, page).unwrap_or_else(|| Map::new(env));
            }
            let boundary = episode_start(episode, episode_duration);
            let snapshot = project(env, &state, total_shares, boundary)?;
            snapshots.set(episode, snapshot.reward_per_share);
        }
        save_snapshot_page(env, page, &snapshots);
    }

    let next = project(env, &state, total_shares, now)?;
    save_reward_state(env, &next);

    Ok(next)
}

/// Adds freshly injected reward to the drip and restarts the horizon.
pub fn inject_reward(
    env: &Env,
    total_shares: i128,
    episode_duration: u64,
    drip_horizon: u64,
    amount: i128,
) -> Result<RewardState, ContractError> {
    let mut state = advance(env, total_shares, episode_duration)?;
    state.undistributed = state
        .undistributed
        .checked_add(amount as u128)
        .ok_or(ContractError::ContractMathError)?;
    state.drip_end = env.ledger().timestamp() + drip_horizon;
    save_reward_state(env, &state);

    Ok(state)
}

/// Accumulator value at the first second of `episode`.
///
/// Boundaries already passed by the stored state come from their snapshot; a
/// boundary between the stored update and now is projected.
fn reward_per_share_at_boundary(
    env: &Env,
    state: &RewardState,
    total_shares: i128,
    episode: u32,
    episode_duration: u64,
) -> Result<u128, ContractError> {
    let boundary = episode_start(episode, episode_duration);
    if boundary <= state.last_update {
        return Ok(get_reward_snapshot(env, episode).unwrap_or(0));
    }

    Ok(project(env, state, total_shares, boundary)?.reward_per_share)
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Accrual {
    pub amount: i128,
    /// New value for the settlement cursor
    pub settled_episode: u32,
    /// New value for `reward_per_share_paid`
    pub reward_per_share: u128,
}

/// Reward earned by `position` over the episodes `[from, to]`, limited to its
/// active range and to what was not settled yet.
pub fn accrued_reward(
    env: &Env,
    state: &RewardState,
    total_shares: i128,
    position: &Position,
    episode_duration: u64,
    from: u32,
    to: u32,
) -> Result<Accrual, ContractError> {
    let unchanged = Accrual {
        amount: 0,
        settled_episode: position.last_settled_episode,
        reward_per_share: position.reward_per_share_paid,
    };
    if !position.active {
        return Ok(unchanged);
    }

    let now = env.ledger().timestamp();
    let current = episode_of(now, episode_duration);
    let last_rewarded = if position.auto_restake {
        current
    } else {
        position.end_episode.min(current)
    };
    let lo = from.max(position.last_settled_episode);
    let hi = to.min(last_rewarded);
    if lo > hi {
        return Ok(unchanged);
    }

    let lower = reward_per_share_at_boundary(env, state, total_shares, lo, episode_duration)?
        .max(position.reward_per_share_paid);
    let upper = if hi >= current {
        project(env, state, total_shares, now)?.reward_per_share
    } else {
        reward_per_share_at_boundary(env, state, total_shares, hi + 1, episode_duration)?
    };
    if upper <= lower {
        return Ok(Accrual {
            amount: 0,
            settled_episode: hi,
            reward_per_share: position.reward_per_share_paid.max(upper),
        });
    }

    let amount = mul_div(env, position.shares as u128, upper - lower, REWARD_PRECISION)
        .and_then(|amount| i128::try_from(amount).ok())
        .ok_or_else(|| {
            log!(env, "Insurance Pool: Accrued reward overflow for position {}", position.id);
            ContractError::ContractMathError
        })?;

    Ok(Accrual {
        amount,
        settled_episode: hi,
        reward_per_share: upper,
    })
}

/// Settles everything the position earned so far and books it as paid.
///
/// The accumulator must have been advanced to the current time beforehand.
pub fn settle_position(
    env: &Env,
    state: &mut RewardState,
    total_shares: i128,
    position: &mut Position,
    episode_duration: u64,
) -> Result<i128, ContractError> {
    let accrual = accrued_reward(
        env,
        state,
        total_shares,
        position,
        episode_duration,
        0,
        u32::MAX,
    )?;
    position.last_settled_episode = accrual.settled_episode;
    position.reward_per_share_paid = accrual.reward_per_share;
    state.total_paid += accrual.amount as u128;

    Ok(accrual.amount)
}
