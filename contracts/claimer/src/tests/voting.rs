use pretty_assertions::assert_eq;
use soroban_sdk::{testutils::Address as _, Address};
use test_case::test_case;

use super::setup::{set_time, TestSetup, ONE_DAY, POOL_DEPOSIT, START_TIME, VOTING_PERIOD};
use crate::{error::ContractError, token_contract};

#[test]
fn majority_vote_executes_once_voting_ends() {
    let setup = TestSetup::new();
    let receiver = Address::generate(&setup.env);
    let claim_id = setup.create_claim(&receiver, 20_000);

    setup.claimer.vote(&setup.voter(600), &claim_id, &true);
    setup.claimer.vote(&setup.voter(400), &claim_id, &false);

    let claim = setup.claimer.query_claim(&claim_id);
    assert_eq!(claim.votes_for, 600);
    assert_eq!(claim.votes_against, 400);

    set_time(&setup.env, START_TIME + VOTING_PERIOD - 1);
    assert_eq!(
        setup.claimer.try_execute_claim(&claim_id),
        Err(Ok(ContractError::VotingPeriodNotEnded))
    );

    set_time(&setup.env, START_TIME + VOTING_PERIOD);
    setup.claimer.execute_claim(&claim_id);

    assert_eq!(setup.asset.balance(&receiver), 20_000);
    assert_eq!(setup.pool.query_pool().total_assets, POOL_DEPOSIT - 20_000);
    assert!(setup.claimer.query_claim(&claim_id).executed);
}

#[test_case(300, 300 ; "tie")]
#[test_case(100, 900 ; "majority against")]
fn claim_without_majority_is_rejected(votes_for: i128, votes_against: i128) {
    let setup = TestSetup::new();
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);

    setup.claimer.vote(&setup.voter(votes_for), &claim_id, &true);
    setup
        .claimer
        .vote(&setup.voter(votes_against), &claim_id, &false);

    set_time(&setup.env, START_TIME + VOTING_PERIOD);
    assert_eq!(
        setup.claimer.try_execute_claim(&claim_id),
        Err(Ok(ContractError::ClaimNotApproved))
    );
    assert_eq!(setup.pool.query_pool().total_assets, POOL_DEPOSIT);
}

#[test]
fn approval_overrides_a_losing_vote() {
    let setup = TestSetup::new();
    let receiver = Address::generate(&setup.env);
    let claim_id = setup.create_claim(&receiver, 5_000);

    setup.claimer.vote(&setup.voter(1_000), &claim_id, &false);
    setup.claimer.approve_claim(&claim_id);
    setup.claimer.execute_claim(&claim_id);

    assert_eq!(setup.asset.balance(&receiver), 5_000);
}

#[test]
fn vote_after_voting_period_fails() {
    let setup = TestSetup::new();
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);
    let voter = setup.voter(100);

    set_time(&setup.env, START_TIME + VOTING_PERIOD);
    assert_eq!(
        setup.claimer.try_vote(&voter, &claim_id, &true),
        Err(Ok(ContractError::VotingPeriodEnded))
    );
}

#[test]
fn new_voting_period_applies_to_new_claims_only() {
    let setup = TestSetup::new();
    let open_claim = setup.create_claim(&Address::generate(&setup.env), 5_000);
    let voter = setup.voter(100);

    setup
        .claimer
        .update_config(&None, &Some(10 * VOTING_PERIOD));
    let later_claim = setup.create_claim(&Address::generate(&setup.env), 5_000);

    assert_eq!(
        setup.claimer.query_claim(&open_claim).voting_end,
        START_TIME + VOTING_PERIOD
    );
    assert_eq!(
        setup.claimer.query_claim(&later_claim).voting_end,
        START_TIME + 10 * VOTING_PERIOD
    );

    set_time(&setup.env, START_TIME + VOTING_PERIOD);
    assert_eq!(
        setup.claimer.try_vote(&voter, &open_claim, &true),
        Err(Ok(ContractError::VotingPeriodEnded))
    );
    setup.claimer.vote(&voter, &later_claim, &true);
}

#[test]
fn voting_twice_fails() {
    let setup = TestSetup::new();
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);
    let voter = setup.voter(100);

    setup.claimer.vote(&voter, &claim_id, &true);
    assert_eq!(
        setup.claimer.try_vote(&voter, &claim_id, &false),
        Err(Ok(ContractError::AlreadyVoted))
    );
    assert_eq!(setup.claimer.query_claim(&claim_id).votes_for, 100);
}

#[test]
fn vote_without_stake_fails() {
    let setup = TestSetup::new();
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);

    assert_eq!(
        setup
            .claimer
            .try_vote(&Address::generate(&setup.env), &claim_id, &true),
        Err(Ok(ContractError::NoVotingPower))
    );
}

#[test]
fn vote_on_executed_claim_fails() {
    let setup = TestSetup::new();
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);
    setup.claimer.approve_claim(&claim_id);
    setup.claimer.execute_claim(&claim_id);

    assert_eq!(
        setup.claimer.try_vote(&setup.voter(100), &claim_id, &true),
        Err(Ok(ContractError::ClaimAlreadyExecuted))
    );
}

#[test]
fn stake_backing_an_open_vote_is_locked() {
    let setup = TestSetup::new();
    let governance = token_contract::Client::new(&setup.env, &setup.governance.address);
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);
    let voter = setup.voter(1_000);
    assert_eq!(governance.balance(&voter), 0);

    setup.claimer.vote(&voter, &claim_id, &true);

    set_time(&setup.env, START_TIME + ONE_DAY);
    assert_eq!(
        setup.claimer.try_unstake(&voter, &1_000),
        Err(Ok(ContractError::StakeLocked))
    );

    set_time(&setup.env, START_TIME + VOTING_PERIOD);
    setup.claimer.unstake(&voter, &400);

    assert_eq!(setup.claimer.query_stake(&voter), 600);
    assert_eq!(governance.balance(&voter), 400);
}

#[test]
fn stake_and_unstake_amounts_are_checked() {
    let setup = TestSetup::new();
    let voter = setup.voter(1_000);

    assert_eq!(
        setup.claimer.try_unstake(&voter, &1_001),
        Err(Ok(ContractError::InsufficientStake))
    );
    assert_eq!(
        setup.claimer.try_unstake(&voter, &0),
        Err(Ok(ContractError::InvalidAmount))
    );
    assert_eq!(
        setup.claimer.try_stake(&voter, &-5),
        Err(Ok(ContractError::InvalidAmount))
    );

    setup.claimer.unstake(&voter, &1_000);
    assert_eq!(setup.claimer.query_stake(&voter), 0);
}

#[test]
#[should_panic(expected = "HostError: Error(Auth, InvalidAction)")]
fn vote_requires_voter_authorization() {
    let setup = TestSetup::new();
    let claim_id = setup.create_claim(&Address::generate(&setup.env), 5_000);
    let voter = setup.voter(100);
    setup.env.set_auths(&[]);

    setup.claimer.vote(&voter, &claim_id, &true);
}
