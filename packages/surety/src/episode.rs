//! Discrete time buckets ("episodes") used for lock periods and reward attribution.
//!
//! Every function here is pure: the same timestamp always maps to the same episode,
//! independently of any contract state.

use num_integer::Integer;

/// Length of one episode in seconds: a quarter of a year split in three (~30.3 days).
pub const EPISODE_DURATION: u64 = 91 * 24 * 60 * 60 / 3;

/// Shortest episode a pool accepts. Bounds how many episode boundaries an idle
/// pool can cross before its next update.
pub const MIN_EPISODE_DURATION: u64 = 24 * 60 * 60;

/// Lock periods are made of this many consecutive episodes.
pub const LOCK_CADENCE: u32 = 3;

/// A stake targeting episode `t` from episode `c` is accepted when `(t - c) % LOCK_CADENCE == LOCK_ALIGNMENT`.
pub const LOCK_ALIGNMENT: u32 = 2;

/// Episode containing `timestamp`, saturating at `u32::MAX`.
pub fn episode_of(timestamp: u64, episode_duration: u64) -> u32 {
    checked_episode_of(timestamp, episode_duration).unwrap_or(u32::MAX)
}

/// Episode containing `timestamp`, or `None` when it does not fit in `u32`.
pub fn checked_episode_of(timestamp: u64, episode_duration: u64) -> Option<u32> {
    u32::try_from(timestamp / episode_duration).ok()
}

/// First second belonging to `episode`.
pub fn episode_start(episode: u32, episode_duration: u64) -> u64 {
    episode as u64 * episode_duration
}

/// First second *after* `episode`, which is also the start of the next one.
pub fn episode_end(episode: u32, episode_duration: u64) -> u64 {
    (episode as u64 + 1) * episode_duration
}

pub fn is_aligned_target(current: u32, target: u32, cadence: u32, alignment: u32) -> bool {
    target >= current && (target - current).mod_floor(&cadence) == alignment
}

/// Smallest aligned target episode which is not earlier than `min_target`,
/// or `None` if it lies beyond `u32::MAX`.
pub fn first_aligned_target(
    current: u32,
    min_target: u32,
    cadence: u32,
    alignment: u32,
) -> Option<u32> {
    let first = current.checked_add(alignment)?;
    if min_target <= first {
        return Some(first);
    }
    let cycles = Integer::div_ceil(&(min_target - first), &cadence);
    cycles
        .checked_mul(cadence)
        .and_then(|offset| first.checked_add(offset))
}
