use soroban_sdk::contracttype;

/// `true` when `a` and `b` differ by at most `tolerance` units.
pub fn is_within_tolerance(a: i128, b: i128, tolerance: i128) -> bool {
    (a - b).abs() <= tolerance
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolParams {
    /// Smallest deposit accepted by `join_pool`
    pub min_stake: i128,
    /// Keeper incentive paid per processed entry of a signed unstake batch
    pub scheduled_unstake_fee: i128,
    /// Length of an episode in seconds
    pub episode_duration: u64,
    /// Grace period in seconds after each lock boundary during which exits are allowed
    pub withdrawal_window: u64,
    /// Period over which an injected reward is released to stakers
    pub reward_drip_horizon: u64,
    /// Number of episodes in one lock period
    pub lock_cadence: u32,
    /// Required remainder of `(target_episode - current_episode) % lock_cadence`
    pub lock_alignment: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_is_inclusive_and_symmetric() {
        assert!(is_within_tolerance(100, 103, 3));
        assert!(is_within_tolerance(103, 100, 3));
        assert!(is_within_tolerance(7, 7, 0));
        assert!(!is_within_tolerance(100, 104, 3));
        assert!(!is_within_tolerance(-4, 0, 3));
    }
}
