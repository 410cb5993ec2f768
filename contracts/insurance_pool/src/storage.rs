use soroban_sdk::{
    contracttype, log, panic_with_error, symbol_short, Address, BytesN, Env, Symbol, Vec,
};
use surety::ttl::{
    INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL, PERSISTENT_RENEWAL_THRESHOLD,
    PERSISTENT_TARGET_TTL,
};

use crate::error::ContractError;

pub const ADMIN: Symbol = symbol_short!("ADMIN");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Base asset staked by underwriters and paid out on claims
    pub asset: Address,
    /// The only address allowed to slash the pool (the claims contract)
    pub claim_executor: Address,
    pub min_stake: i128,
    pub scheduled_unstake_fee: i128,
    pub episode_duration: u64,
    pub withdrawal_window: u64,
    pub reward_drip_horizon: u64,
    pub lock_cadence: u32,
    pub lock_alignment: u32,
}
const CONFIG: Symbol = symbol_short!("CONFIG");

pub fn get_config(env: &Env) -> Config {
    let config = env.storage().instance().get(&CONFIG).unwrap_or_else(|| {
        log!(env, "Insurance Pool: Config not set");
        panic_with_error!(env, ContractError::ConfigNotSet)
    });
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);

    config
}

pub fn save_config(env: &Env, config: &Config) {
    env.storage().instance().set(&CONFIG, config);
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);
}

/// Pool wide totals. Share price is `total_assets / total_shares`.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolState {
    pub total_assets: i128,
    pub total_shares: i128,
}
const POOL: Symbol = symbol_short!("POOL");

pub fn get_pool_state(env: &Env) -> PoolState {
    let pool = env.storage().instance().get(&POOL).unwrap_or_default();
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);

    pool
}

pub fn save_pool_state(env: &Env, pool: &PoolState) {
    env.storage().instance().set(&POOL, pool);
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    pub id: u64,
    pub owner: Address,
    /// Pool shares minted on join, they never change until the position exits
    pub shares: i128,
    /// Amount of the base asset deposited on join
    pub initial_amount: i128,
    pub start_date: u64,
    pub start_episode: u32,
    /// Last episode of the first lock period, fixed at join
    pub first_end_episode: u32,
    /// Last episode of the final lock period; equals `first_end_episode` until
    /// auto-restake is turned off past the first boundary
    pub end_episode: u32,
    /// Settlement cursor, only ever moves forward
    pub last_settled_episode: u32,
    /// Accumulator value already paid out to this position
    pub reward_per_share_paid: u128,
    pub auto_restake: bool,
    pub active: bool,
}

#[contracttype]
#[derive(Clone)]
pub enum PositionDataKey {
    Position(u64),
    OwnerPositions(Address),
}

pub fn get_position(env: &Env, position_id: u64) -> Result<Position, ContractError> {
    let key = PositionDataKey::Position(position_id);
    let position = env.storage().persistent().get(&key).ok_or_else(|| {
        log!(env, "Insurance Pool: Position {} not found", position_id);
        ContractError::PositionNotFound
    })?;
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );

    Ok(position)
}

pub fn save_position(env: &Env, position: &Position) {
    let key = PositionDataKey::Position(position.id);
    env.storage().persistent().set(&key, position);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_owner_positions(env: &Env, owner: &Address) -> Vec<u64> {
    let key = PositionDataKey::OwnerPositions(owner.clone());
    match env.storage().persistent().get(&key) {
        Some(positions) => {
            env.storage().persistent().extend_ttl(
                &key,
                PERSISTENT_RENEWAL_THRESHOLD,
                PERSISTENT_TARGET_TTL,
            );
            positions
        }
        None => Vec::new(env),
    }
}

pub fn add_owner_position(env: &Env, owner: &Address, position_id: u64) {
    let mut positions = get_owner_positions(env, owner);
    positions.push_back(position_id);
    let key = PositionDataKey::OwnerPositions(owner.clone());
    env.storage().persistent().set(&key, &positions);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

/// Per user state of the signed (keeper executed) unstake flow.
#[contracttype]
#[derive(Clone)]
pub enum UnstakeDataKey {
    /// secp256k1 public key (SEC1 uncompressed) authorizing off-line unstake requests
    Signer(Address),
    /// Number of signed requests already consumed
    Nonce(Address),
    /// Proceeds of scheduled unstakes waiting to be withdrawn
    PendingWithdrawal(Address),
}

pub fn get_signer(env: &Env, user: &Address) -> Option<BytesN<65>> {
    let key = UnstakeDataKey::Signer(user.clone());
    let signer = env.storage().persistent().get(&key);
    if signer.is_some() {
        env.storage().persistent().extend_ttl(
            &key,
            PERSISTENT_RENEWAL_THRESHOLD,
            PERSISTENT_TARGET_TTL,
        );
    }

    signer
}

pub fn save_signer(env: &Env, user: &Address, public_key: &BytesN<65>) {
    let key = UnstakeDataKey::Signer(user.clone());
    env.storage().persistent().set(&key, public_key);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_nonce(env: &Env, user: &Address) -> u64 {
    env.storage()
        .persistent()
        .get(&UnstakeDataKey::Nonce(user.clone()))
        .unwrap_or(0)
}

pub fn save_nonce(env: &Env, user: &Address, nonce: u64) {
    let key = UnstakeDataKey::Nonce(user.clone());
    env.storage().persistent().set(&key, &nonce);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_pending_withdrawal(env: &Env, user: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&UnstakeDataKey::PendingWithdrawal(user.clone()))
        .unwrap_or(0)
}

pub fn save_pending_withdrawal(env: &Env, user: &Address, amount: i128) {
    let key = UnstakeDataKey::PendingWithdrawal(user.clone());
    if amount == 0 {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, &amount);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub mod utils {
    use super::*;

    use soroban_sdk::{ConversionError, TryFromVal, Val};

    #[derive(Clone, Copy)]
    #[repr(u32)]
    pub enum DataKey {
        Initialized = 0,
        PositionCounter = 1,
        ProductCounter = 2,
        CoverCounter = 3,
    }

    impl TryFromVal<Env, DataKey> for Val {
        type Error = ConversionError;

        fn try_from_val(_env: &Env, v: &DataKey) -> Result<Self, Self::Error> {
            Ok((*v as u32).into())
        }
    }

    pub fn is_initialized(e: &Env) -> bool {
        e.storage()
            .instance()
            .get(&DataKey::Initialized)
            .unwrap_or(false)
    }

    pub fn set_initialized(e: &Env) {
        e.storage().instance().set(&DataKey::Initialized, &true);
        e.storage()
            .instance()
            .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);
    }

    pub fn save_admin(e: &Env, address: &Address) {
        e.storage().instance().set(&ADMIN, address);
        e.storage()
            .instance()
            .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);
    }

    pub fn get_admin(e: &Env) -> Address {
        e.storage()
            .instance()
            .extend_ttl(INSTANCE_RENEWAL_THRESHOLD, INSTANCE_TARGET_TTL);

        e.storage().instance().get(&ADMIN).unwrap_or_else(|| {
            log!(e, "Insurance Pool: Admin not set");
            panic_with_error!(&e, ContractError::AdminNotSet)
        })
    }

    /// Hands out ids from a monotonically increasing counter, the first id is 0.
    pub fn next_id(e: &Env, counter: DataKey) -> u64 {
        let id: u64 = e.storage().instance().get(&counter).unwrap_or(0);
        e.storage().instance().set(&counter, &(id + 1));

        id
    }
}
