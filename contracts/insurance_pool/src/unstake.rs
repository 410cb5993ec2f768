use soroban_sdk::{contracttype, log, Address, BytesN, Env, Map, Vec};

use crate::{
    accounting::{ensure_active, exit_position},
    distribution::{advance, save_reward_state},
    error::ContractError,
    lock::ensure_unlocked,
    signature::verify_unstake,
    storage::{
        get_nonce, get_pending_withdrawal, get_pool_state, get_position, save_nonce,
        save_pending_withdrawal, save_pool_state, save_position, Config,
    },
};

/// One entry of a keeper submitted batch, signed off-line by the position owner.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnstakeRequest {
    pub user: Address,
    pub position_id: u64,
    pub deadline: u64,
    /// Recoverable secp256k1 signature (r || s) over the unstake digest
    pub signature: BytesN<64>,
    pub recovery_id: u32,
}

/// First entry of a batch that can't be processed and why.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnstakeRejection {
    pub index: u32,
    pub code: u32,
}

impl UnstakeRejection {
    pub fn new(index: u32, error: ContractError) -> Self {
        UnstakeRejection {
            index,
            code: error as u32,
        }
    }
}

fn validate_request(
    env: &Env,
    config: &Config,
    request: &UnstakeRequest,
    nonce: u64,
    exited: &Map<u64, bool>,
) -> Result<(), ContractError> {
    if request.deadline < env.ledger().timestamp() {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Authorization for position {} expired at {}",
            request.position_id,
            request.deadline
        );
        return Err(ContractError::SignatureExpired);
    }
    verify_unstake(env, request, nonce)?;

    let position = get_position(env, request.position_id)?;
    if position.owner != request.user {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Position {} is not owned by the signer",
            request.position_id
        );
        return Err(ContractError::NotPositionOwner);
    }
    if exited.contains_key(request.position_id) {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Position {} appears twice in the batch",
            request.position_id
        );
        return Err(ContractError::NotActive);
    }
    ensure_active(env, &position)?;
    ensure_unlocked(env, &position, config)
}

/// Dry run of a batch: walks the requests in order, consuming nonces in memory
/// only, and stops at the first one that would fail.
fn first_failure(
    env: &Env,
    config: &Config,
    requests: &Vec<UnstakeRequest>,
) -> Option<(u32, ContractError)> {
    let mut nonces: Map<Address, u64> = Map::new(env);
    let mut exited: Map<u64, bool> = Map::new(env);

    for (index, request) in requests.iter().enumerate() {
        let nonce = nonces
            .get(request.user.clone())
            .unwrap_or_else(|| get_nonce(env, &request.user));

        if let Err(error) = validate_request(env, config, &request, nonce, &exited) {
            return Some((index as u32, error));
        }

        nonces.set(request.user.clone(), nonce + 1);
        exited.set(request.position_id, true);
    }

    None
}

pub fn find_rejection(
    env: &Env,
    config: &Config,
    requests: &Vec<UnstakeRequest>,
) -> Option<UnstakeRejection> {
    first_failure(env, config, requests).map(|(index, error)| UnstakeRejection::new(index, error))
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchOutcome {
    pub processed: u32,
    /// Keeper fees collected over the whole batch
    pub fees: i128,
}

/// Validates the whole batch up front, then exits every position in it and
/// credits the proceeds minus the keeper fee to each owner's pending withdrawal.
pub fn process_batch(
    env: &Env,
    config: &Config,
    requests: &Vec<UnstakeRequest>,
) -> Result<BatchOutcome, ContractError> {
    if let Some((index, error)) = first_failure(env, config, requests) {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Request at index {} rejected",
            index
        );
        return Err(error);
    }

    let mut pool = get_pool_state(env);
    let mut rewards = advance(env, pool.total_shares, config.episode_duration)?;
    let mut outcome = BatchOutcome::default();

    for request in requests.iter() {
        let nonce = get_nonce(env, &request.user);
        save_nonce(env, &request.user, nonce + 1);

        let mut position = get_position(env, request.position_id)?;
        let exit = exit_position(env, config, &mut pool, &mut rewards, &mut position)?;
        save_position(env, &position);

        let payout = exit.redeemed + exit.reward;
        let fee = config.scheduled_unstake_fee.min(payout);
        let pending = get_pending_withdrawal(env, &request.user) + payout - fee;
        save_pending_withdrawal(env, &request.user, pending);

        outcome.processed += 1;
        outcome.fees += fee;

        env.events()
            .publish(("scheduled_unstake", "user"), &request.user);
        env.events()
            .publish(("scheduled_unstake", "position_id"), request.position_id);
        env.events()
            .publish(("scheduled_unstake", "amount"), payout - fee);
    }

    save_pool_state(env, &pool);
    save_reward_state(env, &rewards);

    Ok(outcome)
}
