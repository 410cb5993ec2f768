use pretty_assertions::assert_eq;
use soroban_sdk::{testutils::Address as _, vec, Address};
use test_case::test_case;

use super::setup::{
    set_time, TestSetup, EPISODE, MIN_STAKE, ONE_DAY, START_EPISODE, TARGET_EPISODE,
};
use crate::{accounting::VIRTUAL_SHARE_SCALE, error::ContractError, storage::Position};

#[test]
fn join_below_minimum_fails() {
    let setup = TestSetup::new();
    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &MIN_STAKE);

    assert_eq!(
        setup
            .pool
            .try_join_pool(&user, &(MIN_STAKE - 1), &TARGET_EPISODE),
        Err(Ok(ContractError::InsufficientStake))
    );
    assert_eq!(setup.token.balance(&user), MIN_STAKE);
}

#[test]
fn join_with_minimum_at_genesis() {
    let setup = TestSetup::new();
    let (user, position_id) = setup.staker(MIN_STAKE);

    let response = setup.pool.query_position(&position_id);
    assert_eq!(
        response.position,
        Position {
            id: 0,
            owner: user.clone(),
            shares: MIN_STAKE * VIRTUAL_SHARE_SCALE,
            initial_amount: MIN_STAKE,
            start_date: START_EPISODE as u64 * EPISODE + ONE_DAY,
            start_episode: START_EPISODE,
            first_end_episode: TARGET_EPISODE,
            end_episode: TARGET_EPISODE,
            last_settled_episode: START_EPISODE,
            reward_per_share_paid: 0,
            auto_restake: true,
            active: true,
        }
    );
    assert_eq!(response.value, MIN_STAKE);

    let pool = setup.pool.query_pool();
    assert_eq!(pool.total_assets, MIN_STAKE);
    assert_eq!(pool.total_shares, MIN_STAKE * VIRTUAL_SHARE_SCALE);
    assert_eq!(setup.token.balance(&user), 0);
    assert_eq!(setup.token.balance(&setup.pool.address), MIN_STAKE);
}

#[test_case(START_EPISODE ; "current episode")]
#[test_case(START_EPISODE + 1 ; "offset of one")]
#[test_case(START_EPISODE + 3 ; "offset of three")]
#[test_case(START_EPISODE - 1 ; "past episode")]
fn join_with_misaligned_target_fails(target: u32) {
    let setup = TestSetup::new();
    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &MIN_STAKE);

    assert_eq!(
        setup.pool.try_join_pool(&user, &MIN_STAKE, &target),
        Err(Ok(ContractError::InvalidEpisode))
    );
}

#[test_case(TARGET_EPISODE ; "first lock period")]
#[test_case(TARGET_EPISODE + 3 ; "second lock period")]
#[test_case(TARGET_EPISODE + 21 ; "eighth lock period")]
fn join_with_aligned_target(target: u32) {
    let setup = TestSetup::new();
    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &MIN_STAKE);

    let position_id = setup.pool.join_pool(&user, &MIN_STAKE, &target);
    assert_eq!(
        setup.pool.query_position(&position_id).position.end_episode,
        target
    );
}

#[test]
fn later_join_follows_share_price() {
    let setup = TestSetup::new();
    let (_, first) = setup.staker(10_000);

    // a slash halves the share price
    let receiver = Address::generate(&setup.env);
    setup.pool.execute_slash(&5_000, &receiver);

    let (_, second) = setup.staker(10_000);

    let first = setup.pool.query_position(&first);
    let second = setup.pool.query_position(&second);
    assert_eq!(second.position.shares, 2 * first.position.shares);
    assert_eq!(first.value, 5_000);
    assert_eq!(second.value, 10_000);

    let pool = setup.pool.query_pool();
    assert_eq!(pool.total_assets, 15_000);
    assert_eq!(pool.total_shares, 30_000 * VIRTUAL_SHARE_SCALE);
}

#[test]
fn join_into_fully_slashed_pool_fails() {
    let setup = TestSetup::new();
    setup.staker(10_000);
    setup
        .pool
        .execute_slash(&10_000, &Address::generate(&setup.env));

    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &MIN_STAKE);
    assert_eq!(
        setup.pool.try_join_pool(&user, &MIN_STAKE, &TARGET_EPISODE),
        Err(Ok(ContractError::PoolDepleted))
    );
}

#[test_case(1, TARGET_EPISODE ; "one second")]
#[test_case(2 * EPISODE, TARGET_EPISODE ; "two episodes")]
#[test_case(3 * EPISODE, TARGET_EPISODE + 3 ; "just past the first lock period")]
#[test_case(365 * ONE_DAY, TARGET_EPISODE + 12 ; "one year")]
fn join_for_duration_picks_first_covering_target(lock_duration: u64, expected: u32) {
    let setup = TestSetup::new();
    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &MIN_STAKE);

    let position_id = setup
        .pool
        .join_pool_for_duration(&user, &MIN_STAKE, &lock_duration);
    assert_eq!(
        setup.pool.query_position(&position_id).position.end_episode,
        expected
    );
}

#[test_case(u64::MAX ; "overflowing timestamp")]
#[test_case((1 << 32) * EPISODE ; "past the last episode")]
fn join_for_unreachable_duration_fails(lock_duration: u64) {
    let setup = TestSetup::new();
    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &MIN_STAKE);

    assert_eq!(
        setup
            .pool
            .try_join_pool_for_duration(&user, &MIN_STAKE, &lock_duration),
        Err(Ok(ContractError::InvalidEpisode))
    );
    assert_eq!(setup.token.balance(&user), MIN_STAKE);
}

#[test]
fn positions_are_indexed_by_owner() {
    let setup = TestSetup::new();
    let user = Address::generate(&setup.env);
    setup.token_admin.mint(&user, &(3 * MIN_STAKE));

    let first = setup.pool.join_pool(&user, &MIN_STAKE, &TARGET_EPISODE);
    set_time(&setup.env, 2 * ONE_DAY);
    let second = setup
        .pool
        .join_pool(&user, &(2 * MIN_STAKE), &(TARGET_EPISODE + 3));
    setup.staker(MIN_STAKE);

    assert_eq!((first, second), (0, 1));
    let positions = setup.pool.query_positions(&user);
    assert_eq!(positions.len(), 2);
    assert_eq!(
        vec![
            &setup.env,
            positions.get(0).unwrap().initial_amount,
            positions.get(1).unwrap().initial_amount
        ],
        vec![&setup.env, MIN_STAKE, 2 * MIN_STAKE]
    );
    assert_eq!(
        setup
            .pool
            .query_positions(&Address::generate(&setup.env))
            .len(),
        0
    );
}
