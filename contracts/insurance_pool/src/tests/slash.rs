use pretty_assertions::assert_eq;
use soroban_sdk::{testutils::Address as _, Address};

use super::setup::{set_time, withdrawal_window, TestSetup, ONE_DAY};
use crate::error::ContractError;

#[test]
fn slash_is_socialized_across_shareholders() {
    let setup = TestSetup::new();
    let (_, small) = setup.staker(10_000);
    set_time(&setup.env, 2 * ONE_DAY);
    let (_, large) = setup.staker(30_000);

    let receiver = Address::generate(&setup.env);
    setup.pool.execute_slash(&8_000, &receiver);

    assert_eq!(setup.token.balance(&receiver), 8_000);
    assert_eq!(setup.pool.query_position_value(&small), 8_000);
    assert_eq!(setup.pool.query_position_value(&large), 24_000);

    let pool = setup.pool.query_pool();
    assert_eq!(pool.total_assets, 32_000);
    assert_eq!(pool.total_shares, 40_000 * 1_000_000);
}

#[test]
fn slash_does_not_touch_accrued_rewards() {
    let setup = TestSetup::new();
    let (user, position_id) = setup.staker(10_000);
    setup.fund_rewards(365_000_000);

    set_time(&setup.env, 51 * ONE_DAY);
    let earned_before = setup
        .pool
        .query_earned_position(&position_id, &0, &u32::MAX);
    assert_eq!(earned_before, 50_000_000);

    setup
        .pool
        .execute_slash(&4_000, &Address::generate(&setup.env));

    assert_eq!(
        setup
            .pool
            .query_earned_position(&position_id, &0, &u32::MAX),
        earned_before
    );
    assert_eq!(setup.pool.query_position_value(&position_id), 6_000);

    set_time(&setup.env, withdrawal_window(0));
    let response = setup.pool.quit_position(&user, &position_id);
    assert_eq!(response.redeemed, 6_000);
    assert!(response.reward > earned_before);
}

#[test]
fn slash_above_pool_assets_fails() {
    let setup = TestSetup::new();
    setup.staker(10_000);

    let receiver = Address::generate(&setup.env);
    assert_eq!(
        setup.pool.try_execute_slash(&10_001, &receiver),
        Err(Ok(ContractError::InsufficientPoolFunds))
    );
    assert_eq!(setup.pool.query_pool().total_assets, 10_000);

    setup.pool.execute_slash(&10_000, &receiver);
    assert_eq!(setup.pool.query_pool().total_assets, 0);
    assert_eq!(setup.token.balance(&receiver), 10_000);
}

#[test]
fn slash_of_zero_fails() {
    let setup = TestSetup::new();
    setup.staker(10_000);

    assert_eq!(
        setup
            .pool
            .try_execute_slash(&0, &Address::generate(&setup.env)),
        Err(Ok(ContractError::InvalidAmount))
    );
}

#[test]
#[should_panic(expected = "HostError: Error(Auth, InvalidAction)")]
fn slash_requires_claim_executor() {
    let setup = TestSetup::new();
    setup.staker(10_000);
    setup.env.set_auths(&[]);

    setup
        .pool
        .execute_slash(&1_000, &Address::generate(&setup.env));
}
