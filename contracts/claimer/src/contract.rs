use soroban_sdk::{contract, contractimpl, contractmeta, log, Address, BytesN, Env, String};

use crate::{
    error::ContractError,
    pool_contract,
    storage::{
        get_claim, get_config, get_stake, get_stake_lock, has_voted, save_claim, save_config,
        save_stake, save_stake_lock, save_vote,
        utils::{self, get_admin, is_initialized, next_claim_id, set_initialized},
        Claim, Config,
    },
    token_contract,
};

// Metadata that is added on to the WASM custom section
contractmeta!(
    key = "Description",
    val = "Surety claims: approval and stake weighted voting over pool slashes"
);

#[contract]
pub struct Claimer;

pub trait ClaimerTrait {
    fn initialize(
        env: Env,
        admin: Address,
        approver: Address,
        governance_token: Address,
        voting_period: u64,
    ) -> Result<(), ContractError>;

    // Locks governance tokens as voting power
    fn stake(env: Env, voter: Address, amount: i128) -> Result<(), ContractError>;

    fn unstake(env: Env, voter: Address, amount: i128) -> Result<(), ContractError>;

    fn create_claim(
        env: Env,
        proposer: Address,
        receiver: Address,
        pool: Address,
        description: String,
        amount: i128,
    ) -> Result<u64, ContractError>;

    fn approve_claim(env: Env, claim_id: u64) -> Result<(), ContractError>;

    fn vote(env: Env, voter: Address, claim_id: u64, support: bool) -> Result<(), ContractError>;

    // Slashes the claim's pool once the claim is approved or won its vote
    fn execute_claim(env: Env, claim_id: u64) -> Result<(), ContractError>;

    fn update_config(
        env: Env,
        approver: Option<Address>,
        voting_period: Option<u64>,
    ) -> Result<(), ContractError>;

    // Migration entrypoint
    fn upgrade(env: Env, new_wasm_hash: BytesN<32>);

    // QUERIES

    fn query_config(env: Env) -> Config;

    fn query_admin(env: Env) -> Address;

    fn query_claim(env: Env, claim_id: u64) -> Result<Claim, ContractError>;

    fn query_stake(env: Env, voter: Address) -> i128;
}

#[contractimpl]
impl ClaimerTrait for Claimer {
    fn initialize(
        env: Env,
        admin: Address,
        approver: Address,
        governance_token: Address,
        voting_period: u64,
    ) -> Result<(), ContractError> {
        if is_initialized(&env) {
            log!(
                &env,
                "Claimer: Initialize: initializing contract twice is not allowed"
            );
            return Err(ContractError::AlreadyInitialized);
        }
        if voting_period == 0 {
            log!(&env, "Claimer: Initialize: Voting period can not be zero");
            return Err(ContractError::InvalidParameters);
        }

        save_config(
            &env,
            &Config {
                approver,
                governance_token: governance_token.clone(),
                voting_period,
            },
        );
        utils::save_admin(&env, &admin);
        set_initialized(&env);

        env.events()
            .publish(("initialize", "governance_token"), &governance_token);
        env.events().publish(("initialize", "admin"), &admin);

        Ok(())
    }

    fn stake(env: Env, voter: Address, amount: i128) -> Result<(), ContractError> {
        voter.require_auth();

        if amount <= 0 {
            log!(&env, "Claimer: Stake: Amount must be positive");
            return Err(ContractError::InvalidAmount);
        }
        let config = get_config(&env);

        let token_client = token_contract::Client::new(&env, &config.governance_token);
        token_client.transfer(&voter, &env.current_contract_address(), &amount);
        save_stake(&env, &voter, get_stake(&env, &voter) + amount);

        env.events().publish(("stake", "user"), &voter);
        env.events().publish(("stake", "amount"), amount);

        Ok(())
    }

    fn unstake(env: Env, voter: Address, amount: i128) -> Result<(), ContractError> {
        voter.require_auth();

        if amount <= 0 {
            log!(&env, "Claimer: Unstake: Amount must be positive");
            return Err(ContractError::InvalidAmount);
        }
        let staked = get_stake(&env, &voter);
        if amount > staked {
            log!(
                &env,
                "Claimer: Unstake: Trying to unstake {} out of {}",
                amount,
                staked
            );
            return Err(ContractError::InsufficientStake);
        }
        if env.ledger().timestamp() < get_stake_lock(&env, &voter) {
            log!(
                &env,
                "Claimer: Unstake: Stake backs a vote that is still open"
            );
            return Err(ContractError::StakeLocked);
        }

        let config = get_config(&env);
        save_stake(&env, &voter, staked - amount);
        let token_client = token_contract::Client::new(&env, &config.governance_token);
        token_client.transfer(&env.current_contract_address(), &voter, &amount);

        env.events().publish(("unstake", "user"), &voter);
        env.events().publish(("unstake", "amount"), amount);

        Ok(())
    }

    fn create_claim(
        env: Env,
        proposer: Address,
        receiver: Address,
        pool: Address,
        description: String,
        amount: i128,
    ) -> Result<u64, ContractError> {
        proposer.require_auth();

        if amount <= 0 {
            log!(&env, "Claimer: Create claim: Amount must be positive");
            return Err(ContractError::InvalidAmount);
        }

        let config = get_config(&env);
        let created_at = env.ledger().timestamp();
        let claim = Claim {
            id: next_claim_id(&env),
            proposer: proposer.clone(),
            receiver,
            pool,
            description,
            amount,
            approved: false,
            executed: false,
            created_at,
            voting_end: created_at.saturating_add(config.voting_period),
            votes_for: 0,
            votes_against: 0,
        };
        save_claim(&env, &claim);

        env.events().publish(("create_claim", "proposer"), &proposer);
        env.events().publish(("create_claim", "claim_id"), claim.id);
        env.events().publish(("create_claim", "amount"), amount);

        Ok(claim.id)
    }

    fn approve_claim(env: Env, claim_id: u64) -> Result<(), ContractError> {
        let config = get_config(&env);
        config.approver.require_auth();

        let mut claim = get_claim(&env, claim_id)?;
        if claim.executed {
            log!(&env, "Claimer: Approve claim: Claim {} already executed", claim_id);
            return Err(ContractError::ClaimAlreadyExecuted);
        }
        claim.approved = true;
        save_claim(&env, &claim);

        env.events().publish(("approve_claim", "claim_id"), claim_id);

        Ok(())
    }

    fn vote(env: Env, voter: Address, claim_id: u64, support: bool) -> Result<(), ContractError> {
        voter.require_auth();

        let mut claim = get_claim(&env, claim_id)?;
        if claim.executed {
            log!(&env, "Claimer: Vote: Claim {} already executed", claim_id);
            return Err(ContractError::ClaimAlreadyExecuted);
        }
        let voting_end = claim.voting_end;
        if env.ledger().timestamp() >= voting_end {
            log!(&env, "Claimer: Vote: Voting on claim {} has ended", claim_id);
            return Err(ContractError::VotingPeriodEnded);
        }
        if has_voted(&env, claim_id, &voter) {
            log!(&env, "Claimer: Vote: Already voted on claim {}", claim_id);
            return Err(ContractError::AlreadyVoted);
        }
        let weight = get_stake(&env, &voter);
        if weight == 0 {
            log!(&env, "Claimer: Vote: Voter has no staked governance tokens");
            return Err(ContractError::NoVotingPower);
        }

        if support {
            claim.votes_for += weight;
        } else {
            claim.votes_against += weight;
        }
        save_claim(&env, &claim);
        save_vote(&env, claim_id, &voter, support);
        if get_stake_lock(&env, &voter) < voting_end {
            save_stake_lock(&env, &voter, voting_end);
        }

        env.events().publish(("vote", "user"), &voter);
        env.events().publish(("vote", "claim_id"), claim_id);
        env.events().publish(("vote", "weight"), weight);
        env.events().publish(("vote", "support"), support);

        Ok(())
    }

    fn execute_claim(env: Env, claim_id: u64) -> Result<(), ContractError> {
        let mut claim = get_claim(&env, claim_id)?;
        if claim.executed {
            log!(&env, "Claimer: Execute claim: Claim {} already executed", claim_id);
            return Err(ContractError::ClaimAlreadyExecuted);
        }

        if !claim.approved {
            if claim.votes_for == 0 && claim.votes_against == 0 {
                log!(&env, "Claimer: Execute claim: Claim {} not approved", claim_id);
                return Err(ContractError::ClaimNotApproved);
            }
            if env.ledger().timestamp() < claim.voting_end {
                log!(
                    &env,
                    "Claimer: Execute claim: Voting period of claim {} not ended",
                    claim_id
                );
                return Err(ContractError::VotingPeriodNotEnded);
            }
            if claim.votes_for <= claim.votes_against {
                log!(
                    &env,
                    "Claimer: Execute claim: Claim {} was voted down",
                    claim_id
                );
                return Err(ContractError::ClaimNotApproved);
            }
        }

        claim.executed = true;
        save_claim(&env, &claim);

        let pool_client = pool_contract::Client::new(&env, &claim.pool);
        pool_client.execute_slash(&claim.amount, &claim.receiver);

        env.events().publish(("execute_claim", "claim_id"), claim_id);
        env.events()
            .publish(("execute_claim", "receiver"), &claim.receiver);
        env.events().publish(("execute_claim", "amount"), claim.amount);

        Ok(())
    }

    fn update_config(
        env: Env,
        approver: Option<Address>,
        voting_period: Option<u64>,
    ) -> Result<(), ContractError> {
        let admin = get_admin(&env);
        admin.require_auth();

        let mut config = get_config(&env);
        if let Some(approver) = approver {
            env.events()
                .publish(("update_config", "approver"), &approver);
            config.approver = approver;
        }
        if let Some(voting_period) = voting_period {
            if voting_period == 0 {
                log!(&env, "Claimer: Update config: Voting period can not be zero");
                return Err(ContractError::InvalidParameters);
            }
            config.voting_period = voting_period;
            env.events()
                .publish(("update_config", "voting_period"), voting_period);
        }
        save_config(&env, &config);

        Ok(())
    }

    fn upgrade(env: Env, new_wasm_hash: BytesN<32>) {
        let admin: Address = get_admin(&env);
        admin.require_auth();

        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    // QUERIES

    fn query_config(env: Env) -> Config {
        get_config(&env)
    }

    fn query_admin(env: Env) -> Address {
        get_admin(&env)
    }

    fn query_claim(env: Env, claim_id: u64) -> Result<Claim, ContractError> {
        get_claim(&env, claim_id)
    }

    fn query_stake(env: Env, voter: Address) -> i128 {
        get_stake(&env, &voter)
    }
}
