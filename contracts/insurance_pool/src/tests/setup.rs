use k256::{ecdsa::SigningKey, elliptic_curve::sec1::ToEncodedPoint};
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, Address, BytesN, Env,
};
use surety::{
    episode::{EPISODE_DURATION, LOCK_ALIGNMENT, LOCK_CADENCE},
    utils::PoolParams,
};

use crate::{
    contract::{InsurancePool, InsurancePoolClient},
    signature::unstake_digest,
    token_contract,
    unstake::UnstakeRequest,
};

pub const ONE_DAY: u64 = 86_400;
pub const EPISODE: u64 = EPISODE_DURATION;
pub const MIN_STAKE: i128 = 1_000;
pub const UNSTAKE_FEE: i128 = 10;
pub const WITHDRAWAL_WINDOW: u64 = 2 * ONE_DAY;
pub const DRIP_HORIZON: u64 = 365 * ONE_DAY;

/// Tests start one day into this episode.
pub const START_EPISODE: u32 = 10;
/// First valid lock target from `START_EPISODE`.
pub const TARGET_EPISODE: u32 = START_EPISODE + 2;

pub fn deploy_token_contract<'a>(
    env: &Env,
    admin: &Address,
) -> (token_contract::Client<'a>, token::StellarAssetClient<'a>) {
    let address = env
        .register_stellar_asset_contract_v2(admin.clone())
        .address();
    (
        token_contract::Client::new(env, &address),
        token::StellarAssetClient::new(env, &address),
    )
}

pub fn default_params() -> PoolParams {
    PoolParams {
        min_stake: MIN_STAKE,
        scheduled_unstake_fee: UNSTAKE_FEE,
        episode_duration: EPISODE,
        withdrawal_window: WITHDRAWAL_WINDOW,
        reward_drip_horizon: DRIP_HORIZON,
        lock_cadence: LOCK_CADENCE,
        lock_alignment: LOCK_ALIGNMENT,
    }
}

pub fn deploy_insurance_pool<'a>(
    env: &Env,
    admin: &Address,
    asset: &Address,
    claim_executor: &Address,
) -> InsurancePoolClient<'a> {
    let pool = InsurancePoolClient::new(env, &env.register(InsurancePool, ()));
    pool.initialize(admin, asset, claim_executor, &default_params());

    pool
}

/// Seconds since the start of `START_EPISODE`.
pub fn set_time(env: &Env, offset: u64) {
    env.ledger().with_mut(|li| {
        li.timestamp = START_EPISODE as u64 * EPISODE + offset;
    });
}

/// Start of the `lock`-th withdrawal window of a position targeting `TARGET_EPISODE`.
pub fn withdrawal_window(lock: u64) -> u64 {
    (TARGET_EPISODE as u64 + 1 - START_EPISODE as u64) * EPISODE + lock * 3 * EPISODE
}

pub struct TestSetup<'a> {
    pub env: Env,
    pub admin: Address,
    pub claim_executor: Address,
    pub token: token_contract::Client<'a>,
    pub token_admin: token::StellarAssetClient<'a>,
    pub pool: InsurancePoolClient<'a>,
}

impl TestSetup<'_> {
    pub fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.cost_estimate().budget().reset_unlimited();
        set_time(&env, ONE_DAY);

        let admin = Address::generate(&env);
        let claim_executor = Address::generate(&env);
        let (token, token_admin) = deploy_token_contract(&env, &admin);
        let pool = deploy_insurance_pool(&env, &admin, &token.address, &claim_executor);

        TestSetup {
            env,
            admin,
            claim_executor,
            token,
            token_admin,
            pool,
        }
    }

    /// Mints `amount` to a fresh user and stakes it until `TARGET_EPISODE`.
    pub fn staker(&self, amount: i128) -> (Address, u64) {
        let user = Address::generate(&self.env);
        self.token_admin.mint(&user, &amount);
        let position_id = self.pool.join_pool(&user, &amount, &TARGET_EPISODE);

        (user, position_id)
    }

    pub fn fund_rewards(&self, amount: i128) {
        let funder = Address::generate(&self.env);
        self.token_admin.mint(&funder, &amount);
        self.pool.reward_pool(&funder, &amount);
    }
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

pub fn public_key(env: &Env, key: &SigningKey) -> BytesN<65> {
    let point = key.verifying_key().as_affine().to_encoded_point(false);
    BytesN::from_array(env, &point.as_bytes().try_into().unwrap())
}

/// Signs an unstake request for the user's current nonce.
pub fn sign_unstake(
    setup: &TestSetup,
    key: &SigningKey,
    user: &Address,
    position_id: u64,
    deadline: u64,
) -> UnstakeRequest {
    let nonce = setup.pool.query_nonce(user);
    sign_unstake_with_nonce(setup, key, user, position_id, deadline, nonce)
}

pub fn sign_unstake_with_nonce(
    setup: &TestSetup,
    key: &SigningKey,
    user: &Address,
    position_id: u64,
    deadline: u64,
    nonce: u64,
) -> UnstakeRequest {
    let digest = setup.env.as_contract(&setup.pool.address, || {
        unstake_digest(&setup.env, user, position_id, deadline, nonce).to_bytes()
    });
    let (signature, recovery_id) = key.sign_prehash_recoverable(&digest.to_array()).unwrap();
    let signature: [u8; 64] = signature.to_bytes().as_slice().try_into().unwrap();

    UnstakeRequest {
        user: user.clone(),
        position_id,
        deadline,
        signature: BytesN::from_array(&setup.env, &signature),
        recovery_id: recovery_id.to_byte() as u32,
    }
}
