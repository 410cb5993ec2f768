use soroban_sdk::{
    contract, contractimpl, contractmeta, log, Address, BytesN, Env, String, Vec,
};
use surety::{
    episode::{
        checked_episode_of, episode_of, first_aligned_target, is_aligned_target,
        MIN_EPISODE_DURATION,
    },
    utils::PoolParams,
};

use crate::{
    accounting::{ensure_active, exit_position, redeem_value, shares_to_mint},
    cover::{
        get_cover, get_product, quote, save_cover, save_product, validate_product, Cover, Product,
    },
    distribution::{
        accrued_reward, advance, get_reward_snapshot, get_reward_state, inject_reward,
        save_reward_state, settle_position, RewardState,
    },
    error::ContractError,
    lock::{current_cycle_end, first_unlock, lock_phase, LockPhase},
    msg::{ConfigResponse, ExitResponse, PoolResponse, PositionResponse},
    signature::unstake_digest,
    storage::{
        add_owner_position, get_config, get_nonce, get_owner_positions, get_pending_withdrawal,
        get_pool_state, get_position, get_signer, save_config, save_pending_withdrawal,
        save_pool_state, save_position, save_signer,
        utils::{self, get_admin, is_initialized, next_id, set_initialized, DataKey},
        Config, Position,
    },
    token_contract,
    unstake::{find_rejection, process_batch, UnstakeRejection, UnstakeRequest},
};

// Metadata that is added on to the WASM custom section
contractmeta!(
    key = "Description",
    val = "Surety insurance pool: episode locked underwriting positions"
);

#[contract]
pub struct InsurancePool;

pub trait InsurancePoolTrait {
    fn initialize(
        env: Env,
        admin: Address,
        asset: Address,
        claim_executor: Address,
        params: PoolParams,
    ) -> Result<(), ContractError>;

    // Opens an auto-restaked position locked until the end of `target_episode`
    fn join_pool(
        env: Env,
        sender: Address,
        amount: i128,
        target_episode: u32,
    ) -> Result<u64, ContractError>;

    // Same as `join_pool`, picking the first valid target covering `lock_duration` seconds
    fn join_pool_for_duration(
        env: Env,
        sender: Address,
        amount: i128,
        lock_duration: u64,
    ) -> Result<u64, ContractError>;

    fn quit_position(
        env: Env,
        sender: Address,
        position_id: u64,
    ) -> Result<ExitResponse, ContractError>;

    fn claim_rewards(env: Env, sender: Address, position_id: u64) -> Result<i128, ContractError>;

    fn set_auto_restake(
        env: Env,
        sender: Address,
        position_id: u64,
        enabled: bool,
    ) -> Result<(), ContractError>;

    fn reward_pool(env: Env, sender: Address, amount: i128) -> Result<(), ContractError>;

    // Only the configured claim executor may call this
    fn execute_slash(env: Env, amount: i128, receiver: Address) -> Result<(), ContractError>;

    fn register_signer(
        env: Env,
        user: Address,
        public_key: BytesN<65>,
    ) -> Result<(), ContractError>;

    // Returns the number of processed requests
    fn scheduled_unstake(
        env: Env,
        submitter: Address,
        requests: Vec<UnstakeRequest>,
    ) -> Result<u32, ContractError>;

    fn withdraw_scheduled_unstaked(env: Env, user: Address) -> Result<i128, ContractError>;

    fn create_product(
        env: Env,
        name: String,
        annual_percent: u32,
        max_coverage_duration: u64,
        max_pool_allocation: u32,
    ) -> Result<u32, ContractError>;

    fn purchase_cover(
        env: Env,
        buyer: Address,
        product_id: u32,
        covered_account: Address,
        duration: u64,
        coverage_amount: i128,
    ) -> Result<u64, ContractError>;

    fn update_config(
        env: Env,
        min_stake: Option<i128>,
        scheduled_unstake_fee: Option<i128>,
        withdrawal_window: Option<u64>,
        reward_drip_horizon: Option<u64>,
        claim_executor: Option<Address>,
    ) -> Result<(), ContractError>;

    // Migration entrypoint
    fn upgrade(env: Env, new_wasm_hash: BytesN<32>);

    // QUERIES

    fn query_config(env: Env) -> ConfigResponse;

    fn query_admin(env: Env) -> Address;

    fn query_pool(env: Env) -> PoolResponse;

    fn query_min_stake(env: Env) -> i128;

    fn query_position(env: Env, position_id: u64) -> Result<PositionResponse, ContractError>;

    fn query_positions(env: Env, owner: Address) -> Vec<Position>;

    fn query_position_value(env: Env, position_id: u64) -> Result<i128, ContractError>;

    fn query_lock_phase(env: Env, position_id: u64) -> Result<LockPhase, ContractError>;

    // Reward earned by the position over episodes `[from, to]` and not settled yet
    fn query_earned_position(
        env: Env,
        position_id: u64,
        from: u32,
        to: u32,
    ) -> Result<i128, ContractError>;

    fn query_earned_positions(env: Env, position_ids: Vec<u64>) -> Result<i128, ContractError>;

    fn query_reward_state(env: Env) -> RewardState;

    fn query_reward_snapshot(env: Env, episode: u32) -> Option<u128>;

    fn query_pending_withdrawal(env: Env, user: Address) -> i128;

    fn query_nonce(env: Env, user: Address) -> u64;

    fn query_signer(env: Env, user: Address) -> Option<BytesN<65>>;

    // Digest the user has to sign so a keeper can exit `position_id` before `deadline`
    fn query_unstake_digest(
        env: Env,
        user: Address,
        position_id: u64,
        deadline: u64,
    ) -> BytesN<32>;

    // First request of the batch `scheduled_unstake` would reject, if any
    fn query_unstake_rejection(
        env: Env,
        requests: Vec<UnstakeRequest>,
    ) -> Option<UnstakeRejection>;

    fn query_product(env: Env, product_id: u32) -> Result<Product, ContractError>;

    fn query_cover(env: Env, cover_id: u64) -> Result<Cover, ContractError>;

    fn query_premium(
        env: Env,
        product_id: u32,
        duration: u64,
        coverage_amount: i128,
    ) -> Result<i128, ContractError>;
}

#[contractimpl]
impl InsurancePoolTrait for InsurancePool {
    fn initialize(
        env: Env,
        admin: Address,
        asset: Address,
        claim_executor: Address,
        params: PoolParams,
    ) -> Result<(), ContractError> {
        if is_initialized(&env) {
            log!(
                &env,
                "Insurance Pool: Initialize: initializing contract twice is not allowed"
            );
            return Err(ContractError::AlreadyInitialized);
        }
        validate_params(&env, &params)?;

        let config = Config {
            asset: asset.clone(),
            claim_executor,
            min_stake: params.min_stake,
            scheduled_unstake_fee: params.scheduled_unstake_fee,
            episode_duration: params.episode_duration,
            withdrawal_window: params.withdrawal_window,
            reward_drip_horizon: params.reward_drip_horizon,
            lock_cadence: params.lock_cadence,
            lock_alignment: params.lock_alignment,
        };
        save_config(&env, &config);
        utils::save_admin(&env, &admin);
        save_reward_state(
            &env,
            &RewardState {
                last_update: env.ledger().timestamp(),
                ..Default::default()
            },
        );
        set_initialized(&env);

        env.events().publish(("initialize", "asset"), &asset);
        env.events().publish(("initialize", "admin"), &admin);

        Ok(())
    }

    fn join_pool(
        env: Env,
        sender: Address,
        amount: i128,
        target_episode: u32,
    ) -> Result<u64, ContractError> {
        sender.require_auth();

        open_position(&env, &sender, amount, target_episode)
    }

    fn join_pool_for_duration(
        env: Env,
        sender: Address,
        amount: i128,
        lock_duration: u64,
    ) -> Result<u64, ContractError> {
        sender.require_auth();

        if lock_duration == 0 {
            log!(&env, "Insurance Pool: Join: Lock duration can not be zero");
            return Err(ContractError::InvalidEpisode);
        }
        let config = get_config(&env);
        let now = env.ledger().timestamp();
        let current = episode_of(now, config.episode_duration);
        // episode whose end is the first one at or after `now + lock_duration`
        let target = now
            .checked_add(lock_duration - 1)
            .and_then(|lock_end| checked_episode_of(lock_end, config.episode_duration))
            .and_then(|min_target| {
                first_aligned_target(
                    current,
                    min_target,
                    config.lock_cadence,
                    config.lock_alignment,
                )
            })
            .ok_or_else(|| {
                log!(
                    &env,
                    "Insurance Pool: Join: Lock duration {} reaches past the last episode",
                    lock_duration
                );
                ContractError::InvalidEpisode
            })?;

        open_position(&env, &sender, amount, target)
    }

    fn quit_position(
        env: Env,
        sender: Address,
        position_id: u64,
    ) -> Result<ExitResponse, ContractError> {
        sender.require_auth();

        let config = get_config(&env);
        let mut position = get_owned_position(&env, &sender, position_id)?;

        let mut pool = get_pool_state(&env);
        let mut rewards = advance(&env, pool.total_shares, config.episode_duration)?;
        let exit = exit_position(&env, &config, &mut pool, &mut rewards, &mut position)?;

        save_position(&env, &position);
        save_pool_state(&env, &pool);
        save_reward_state(&env, &rewards);

        let payout = exit.redeemed + exit.reward;
        if payout > 0 {
            let asset_client = token_contract::Client::new(&env, &config.asset);
            asset_client.transfer(&env.current_contract_address(), &sender, &payout);
        }

        env.events().publish(("quit", "user"), &sender);
        env.events().publish(("quit", "position_id"), position_id);
        env.events().publish(("quit", "redeemed"), exit.redeemed);
        env.events().publish(("quit", "reward"), exit.reward);

        Ok(ExitResponse {
            redeemed: exit.redeemed,
            reward: exit.reward,
        })
    }

    fn claim_rewards(env: Env, sender: Address, position_id: u64) -> Result<i128, ContractError> {
        sender.require_auth();

        let config = get_config(&env);
        let mut position = get_owned_position(&env, &sender, position_id)?;
        ensure_active(&env, &position)?;

        let reward = settle_and_pay(&env, &config, &mut position)?;
        save_position(&env, &position);

        env.events().publish(("claim_rewards", "user"), &sender);
        env.events()
            .publish(("claim_rewards", "position_id"), position_id);
        env.events().publish(("claim_rewards", "amount"), reward);

        Ok(reward)
    }

    fn set_auto_restake(
        env: Env,
        sender: Address,
        position_id: u64,
        enabled: bool,
    ) -> Result<(), ContractError> {
        sender.require_auth();

        let config = get_config(&env);
        let mut position = get_owned_position(&env, &sender, position_id)?;
        ensure_active(&env, &position)?;
        if position.auto_restake == enabled {
            return Ok(());
        }

        let now = env.ledger().timestamp();
        if enabled && now >= first_unlock(&position, &config) {
            log!(
                &env,
                "Insurance Pool: Set auto restake: Lock of position {} already ended",
                position_id
            );
            return Err(ContractError::LockExpired);
        }

        // the reward cap moves with the flag, so everything up to now is paid first
        settle_and_pay(&env, &config, &mut position)?;
        if !enabled {
            position.end_episode = current_cycle_end(&position, now, &config);
        }
        position.auto_restake = enabled;
        save_position(&env, &position);

        env.events()
            .publish(("set_auto_restake", "position_id"), position_id);
        env.events().publish(("set_auto_restake", "enabled"), enabled);
        env.events()
            .publish(("set_auto_restake", "end_episode"), position.end_episode);

        Ok(())
    }

    fn reward_pool(env: Env, sender: Address, amount: i128) -> Result<(), ContractError> {
        sender.require_auth();

        if amount <= 0 {
            log!(&env, "Insurance Pool: Reward pool: Amount must be positive");
            return Err(ContractError::InvalidAmount);
        }
        let config = get_config(&env);

        let asset_client = token_contract::Client::new(&env, &config.asset);
        asset_client.transfer(&sender, &env.current_contract_address(), &amount);

        let pool = get_pool_state(&env);
        inject_reward(
            &env,
            pool.total_shares,
            config.episode_duration,
            config.reward_drip_horizon,
            amount,
        )?;

        env.events().publish(("reward_pool", "user"), &sender);
        env.events().publish(("reward_pool", "amount"), amount);

        Ok(())
    }

    fn execute_slash(env: Env, amount: i128, receiver: Address) -> Result<(), ContractError> {
        let config = get_config(&env);
        config.claim_executor.require_auth();

        if amount <= 0 {
            log!(&env, "Insurance Pool: Execute slash: Amount must be positive");
            return Err(ContractError::InvalidAmount);
        }
        let mut pool = get_pool_state(&env);
        if amount > pool.total_assets {
            log!(
                &env,
                "Insurance Pool: Execute slash: Requested {} but the pool only holds {}",
                amount,
                pool.total_assets
            );
            return Err(ContractError::InsufficientPoolFunds);
        }

        advance(&env, pool.total_shares, config.episode_duration)?;
        pool.total_assets -= amount;
        save_pool_state(&env, &pool);

        let asset_client = token_contract::Client::new(&env, &config.asset);
        asset_client.transfer(&env.current_contract_address(), &receiver, &amount);

        env.events().publish(("execute_slash", "receiver"), &receiver);
        env.events().publish(("execute_slash", "amount"), amount);

        Ok(())
    }

    fn register_signer(
        env: Env,
        user: Address,
        public_key: BytesN<65>,
    ) -> Result<(), ContractError> {
        user.require_auth();

        // SEC1 uncompressed encoding
        if public_key.get(0) != Some(0x04) {
            log!(
                &env,
                "Insurance Pool: Register signer: Public key must be uncompressed"
            );
            return Err(ContractError::InvalidParameters);
        }
        save_signer(&env, &user, &public_key);

        env.events().publish(("register_signer", "user"), &user);

        Ok(())
    }

    fn scheduled_unstake(
        env: Env,
        submitter: Address,
        requests: Vec<UnstakeRequest>,
    ) -> Result<u32, ContractError> {
        submitter.require_auth();

        let config = get_config(&env);
        let outcome = process_batch(&env, &config, &requests)?;

        if outcome.fees > 0 {
            let asset_client = token_contract::Client::new(&env, &config.asset);
            asset_client.transfer(&env.current_contract_address(), &submitter, &outcome.fees);
        }

        env.events()
            .publish(("scheduled_unstake", "submitter"), &submitter);
        env.events()
            .publish(("scheduled_unstake", "processed"), outcome.processed);
        env.events()
            .publish(("scheduled_unstake", "fees"), outcome.fees);

        Ok(outcome.processed)
    }

    fn withdraw_scheduled_unstaked(env: Env, user: Address) -> Result<i128, ContractError> {
        user.require_auth();

        let amount = get_pending_withdrawal(&env, &user);
        if amount == 0 {
            return Ok(0);
        }
        save_pending_withdrawal(&env, &user, 0);

        let config = get_config(&env);
        let asset_client = token_contract::Client::new(&env, &config.asset);
        asset_client.transfer(&env.current_contract_address(), &user, &amount);

        env.events()
            .publish(("withdraw_scheduled_unstaked", "user"), &user);
        env.events()
            .publish(("withdraw_scheduled_unstaked", "amount"), amount);

        Ok(amount)
    }

    fn create_product(
        env: Env,
        name: String,
        annual_percent: u32,
        max_coverage_duration: u64,
        max_pool_allocation: u32,
    ) -> Result<u32, ContractError> {
        let admin = get_admin(&env);
        admin.require_auth();

        validate_product(
            &env,
            annual_percent,
            max_coverage_duration,
            max_pool_allocation,
        )?;

        let product = Product {
            id: next_id(&env, DataKey::ProductCounter) as u32,
            name,
            annual_percent,
            max_coverage_duration,
            max_pool_allocation,
        };
        save_product(&env, &product);

        env.events().publish(("create_product", "id"), product.id);
        env.events()
            .publish(("create_product", "annual_percent"), annual_percent);

        Ok(product.id)
    }

    fn purchase_cover(
        env: Env,
        buyer: Address,
        product_id: u32,
        covered_account: Address,
        duration: u64,
        coverage_amount: i128,
    ) -> Result<u64, ContractError> {
        buyer.require_auth();

        let config = get_config(&env);
        let product = get_product(&env, product_id)?;
        let pool = get_pool_state(&env);
        let premium = quote(&env, &product, &pool, duration, coverage_amount)?;

        let asset_client = token_contract::Client::new(&env, &config.asset);
        asset_client.transfer(&buyer, &env.current_contract_address(), &premium);
        inject_reward(
            &env,
            pool.total_shares,
            config.episode_duration,
            config.reward_drip_horizon,
            premium,
        )?;

        let start_date = env.ledger().timestamp();
        let cover = Cover {
            id: next_id(&env, DataKey::CoverCounter),
            product_id,
            buyer: buyer.clone(),
            covered_account,
            coverage_amount,
            premium,
            start_date,
            end_date: start_date + duration,
        };
        save_cover(&env, &cover);

        env.events().publish(("purchase_cover", "buyer"), &buyer);
        env.events().publish(("purchase_cover", "cover_id"), cover.id);
        env.events().publish(("purchase_cover", "premium"), premium);

        Ok(cover.id)
    }

    fn update_config(
        env: Env,
        min_stake: Option<i128>,
        scheduled_unstake_fee: Option<i128>,
        withdrawal_window: Option<u64>,
        reward_drip_horizon: Option<u64>,
        claim_executor: Option<Address>,
    ) -> Result<(), ContractError> {
        let admin = get_admin(&env);
        admin.require_auth();

        let mut config = get_config(&env);

        if let Some(min_stake) = min_stake {
            config.min_stake = min_stake;
        }
        if let Some(scheduled_unstake_fee) = scheduled_unstake_fee {
            config.scheduled_unstake_fee = scheduled_unstake_fee;
        }
        if let Some(withdrawal_window) = withdrawal_window {
            config.withdrawal_window = withdrawal_window;
        }
        if let Some(reward_drip_horizon) = reward_drip_horizon {
            config.reward_drip_horizon = reward_drip_horizon;
        }
        if let Some(claim_executor) = claim_executor {
            config.claim_executor = claim_executor;
        }

        validate_params(&env, &params_of(&config))?;
        save_config(&env, &config);

        env.events().publish(("update_config", "admin"), &admin);

        Ok(())
    }

    fn upgrade(env: Env, new_wasm_hash: BytesN<32>) {
        let admin: Address = get_admin(&env);
        admin.require_auth();

        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    // QUERIES

    fn query_config(env: Env) -> ConfigResponse {
        ConfigResponse {
            config: get_config(&env),
        }
    }

    fn query_admin(env: Env) -> Address {
        get_admin(&env)
    }

    fn query_pool(env: Env) -> PoolResponse {
        let pool = get_pool_state(&env);
        PoolResponse {
            total_assets: pool.total_assets,
            total_shares: pool.total_shares,
            share_price_numerator: pool.total_assets,
            share_price_denominator: pool.total_shares,
        }
    }

    fn query_min_stake(env: Env) -> i128 {
        get_config(&env).min_stake
    }

    fn query_position(env: Env, position_id: u64) -> Result<PositionResponse, ContractError> {
        let position = get_position(&env, position_id)?;
        let value = position_value(&env, &position)?;

        Ok(PositionResponse { position, value })
    }

    fn query_positions(env: Env, owner: Address) -> Vec<Position> {
        let mut positions = Vec::new(&env);
        for position_id in get_owner_positions(&env, &owner).iter() {
            if let Ok(position) = get_position(&env, position_id) {
                positions.push_back(position);
            }
        }

        positions
    }

    fn query_position_value(env: Env, position_id: u64) -> Result<i128, ContractError> {
        let position = get_position(&env, position_id)?;
        position_value(&env, &position)
    }

    fn query_lock_phase(env: Env, position_id: u64) -> Result<LockPhase, ContractError> {
        let config = get_config(&env);
        let position = get_position(&env, position_id)?;
        ensure_active(&env, &position)?;

        Ok(lock_phase(&position, env.ledger().timestamp(), &config))
    }

    fn query_earned_position(
        env: Env,
        position_id: u64,
        from: u32,
        to: u32,
    ) -> Result<i128, ContractError> {
        let position = get_position(&env, position_id)?;
        earned(&env, &position, from, to)
    }

    fn query_earned_positions(env: Env, position_ids: Vec<u64>) -> Result<i128, ContractError> {
        let mut total: i128 = 0;
        for position_id in position_ids.iter() {
            let position = get_position(&env, position_id)?;
            total = total
                .checked_add(earned(&env, &position, 0, u32::MAX)?)
                .ok_or(ContractError::ContractMathError)?;
        }

        Ok(total)
    }

    fn query_reward_state(env: Env) -> RewardState {
        get_reward_state(&env)
    }

    fn query_reward_snapshot(env: Env, episode: u32) -> Option<u128> {
        get_reward_snapshot(&env, episode)
    }

    fn query_pending_withdrawal(env: Env, user: Address) -> i128 {
        get_pending_withdrawal(&env, &user)
    }

    fn query_nonce(env: Env, user: Address) -> u64 {
        get_nonce(&env, &user)
    }

    fn query_signer(env: Env, user: Address) -> Option<BytesN<65>> {
        get_signer(&env, &user)
    }

    fn query_unstake_digest(
        env: Env,
        user: Address,
        position_id: u64,
        deadline: u64,
    ) -> BytesN<32> {
        let nonce = get_nonce(&env, &user);
        unstake_digest(&env, &user, position_id, deadline, nonce).to_bytes()
    }

    fn query_unstake_rejection(
        env: Env,
        requests: Vec<UnstakeRequest>,
    ) -> Option<UnstakeRejection> {
        let config = get_config(&env);
        find_rejection(&env, &config, &requests)
    }

    fn query_product(env: Env, product_id: u32) -> Result<Product, ContractError> {
        get_product(&env, product_id)
    }

    fn query_cover(env: Env, cover_id: u64) -> Result<Cover, ContractError> {
        get_cover(&env, cover_id)
    }

    fn query_premium(
        env: Env,
        product_id: u32,
        duration: u64,
        coverage_amount: i128,
    ) -> Result<i128, ContractError> {
        let product = get_product(&env, product_id)?;
        quote(
            &env,
            &product,
            &get_pool_state(&env),
            duration,
            coverage_amount,
        )
    }
}

fn validate_params(env: &Env, params: &PoolParams) -> Result<(), ContractError> {
    if params.min_stake <= 0 {
        log!(
            env,
            "Insurance Pool: Minimum stake can not be smaller or equal to 0"
        );
        return Err(ContractError::InvalidParameters);
    }
    if params.scheduled_unstake_fee < 0 {
        log!(env, "Insurance Pool: Scheduled unstake fee can not be negative");
        return Err(ContractError::InvalidParameters);
    }
    if params.episode_duration < MIN_EPISODE_DURATION || params.reward_drip_horizon == 0 {
        log!(
            env,
            "Insurance Pool: Episode duration must be at least {} and reward drip horizon positive",
            MIN_EPISODE_DURATION
        );
        return Err(ContractError::InvalidParameters);
    }
    if params.lock_cadence == 0 || params.lock_alignment >= params.lock_cadence {
        log!(
            env,
            "Insurance Pool: Lock alignment {} must be below the cadence {}",
            params.lock_alignment,
            params.lock_cadence
        );
        return Err(ContractError::InvalidParameters);
    }
    let restake_period = params.lock_cadence as u64 * params.episode_duration;
    if params.withdrawal_window == 0 || params.withdrawal_window >= restake_period {
        log!(
            env,
            "Insurance Pool: Withdrawal window must be positive and shorter than a lock period"
        );
        return Err(ContractError::InvalidParameters);
    }

    Ok(())
}

fn params_of(config: &Config) -> PoolParams {
    PoolParams {
        min_stake: config.min_stake,
        scheduled_unstake_fee: config.scheduled_unstake_fee,
        episode_duration: config.episode_duration,
        withdrawal_window: config.withdrawal_window,
        reward_drip_horizon: config.reward_drip_horizon,
        lock_cadence: config.lock_cadence,
        lock_alignment: config.lock_alignment,
    }
}

fn open_position(
    env: &Env,
    sender: &Address,
    amount: i128,
    target_episode: u32,
) -> Result<u64, ContractError> {
    let config = get_config(env);
    if amount < config.min_stake {
        log!(
            env,
            "Insurance Pool: Join: Trying to stake {} which is less than minimum {} required!",
            amount,
            config.min_stake
        );
        return Err(ContractError::InsufficientStake);
    }

    let now = env.ledger().timestamp();
    let current = episode_of(now, config.episode_duration);
    if !is_aligned_target(
        current,
        target_episode,
        config.lock_cadence,
        config.lock_alignment,
    ) {
        log!(
            env,
            "Insurance Pool: Join: Episode {} is not a valid lock target from episode {}",
            target_episode,
            current
        );
        return Err(ContractError::InvalidEpisode);
    }

    let mut pool = get_pool_state(env);
    let rewards = advance(env, pool.total_shares, config.episode_duration)?;
    let shares = shares_to_mint(env, &pool, amount)?;

    let asset_client = token_contract::Client::new(env, &config.asset);
    asset_client.transfer(sender, &env.current_contract_address(), &amount);

    let position = Position {
        id: next_id(env, DataKey::PositionCounter),
        owner: sender.clone(),
        shares,
        initial_amount: amount,
        start_date: now,
        start_episode: current,
        first_end_episode: target_episode,
        end_episode: target_episode,
        last_settled_episode: current,
        reward_per_share_paid: rewards.reward_per_share,
        auto_restake: true,
        active: true,
    };
    save_position(env, &position);
    add_owner_position(env, sender, position.id);

    pool.total_assets = pool
        .total_assets
        .checked_add(amount)
        .ok_or(ContractError::ContractMathError)?;
    pool.total_shares = pool
        .total_shares
        .checked_add(shares)
        .ok_or(ContractError::ContractMathError)?;
    save_pool_state(env, &pool);

    env.events().publish(("join", "user"), sender);
    env.events().publish(("join", "position_id"), position.id);
    env.events().publish(("join", "amount"), amount);
    env.events().publish(("join", "shares"), shares);
    env.events().publish(("join", "end_episode"), target_episode);

    Ok(position.id)
}

fn get_owned_position(
    env: &Env,
    sender: &Address,
    position_id: u64,
) -> Result<Position, ContractError> {
    let position = get_position(env, position_id)?;
    if &position.owner != sender {
        log!(
            env,
            "Insurance Pool: Position {} does not belong to the sender",
            position_id
        );
        return Err(ContractError::NotPositionOwner);
    }

    Ok(position)
}

/// Settles the position against a freshly advanced accumulator and pays the reward out.
fn settle_and_pay(
    env: &Env,
    config: &Config,
    position: &mut Position,
) -> Result<i128, ContractError> {
    let pool = get_pool_state(env);
    let mut rewards = advance(env, pool.total_shares, config.episode_duration)?;
    let reward = settle_position(
        env,
        &mut rewards,
        pool.total_shares,
        position,
        config.episode_duration,
    )?;
    save_reward_state(env, &rewards);

    if reward > 0 {
        let asset_client = token_contract::Client::new(env, &config.asset);
        asset_client.transfer(&env.current_contract_address(), &position.owner, &reward);
    }

    Ok(reward)
}

fn position_value(env: &Env, position: &Position) -> Result<i128, ContractError> {
    if !position.active {
        return Ok(0);
    }
    redeem_value(env, &get_pool_state(env), position.shares)
}

fn earned(env: &Env, position: &Position, from: u32, to: u32) -> Result<i128, ContractError> {
    let config = get_config(env);
    let pool = get_pool_state(env);
    let rewards = get_reward_state(env);

    Ok(accrued_reward(
        env,
        &rewards,
        pool.total_shares,
        position,
        config.episode_duration,
        from,
        to,
    )?
    .amount)
}
