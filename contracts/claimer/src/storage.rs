use soroban_sdk::{
    contracttype, log, panic_with_error, symbol_short, Address, Env, String, Symbol,
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
    /// Can approve a claim on its own, skipping the vote
    pub approver: Address,
    /// Token staked to obtain voting power
    pub governance_token: Address,
    /// Seconds a claim stays open for votes after creation
    pub voting_period: u64,
}
const CONFIG: Symbol = symbol_short!("CONFIG");

pub fn get_config(env: &Env) -> Config {
    let config = env.storage().instance().get(&CONFIG).unwrap_or_else(|| {
        log!(env, "Claimer: Config not set");
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

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Claim {
    pub id: u64,
    pub proposer: Address,
    pub receiver: Address,
    /// Insurance pool slashed when the claim executes
    pub pool: Address,
    pub description: String,
    pub amount: i128,
    pub approved: bool,
    pub executed: bool,
    pub created_at: u64,
    /// Votes are accepted until this moment, fixed when the claim is created
    pub voting_end: u64,
    pub votes_for: i128,
    pub votes_against: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum ClaimDataKey {
    Claim(u64),
    Vote(u64, Address),
    Stake(Address),
    /// Staked tokens back votes until this moment
    StakeLock(Address),
}

pub fn get_claim(env: &Env, claim_id: u64) -> Result<Claim, ContractError> {
    let key = ClaimDataKey::Claim(claim_id);
    let claim = env.storage().persistent().get(&key).ok_or_else(|| {
        log!(env, "Claimer: Claim {} not found", claim_id);
        ContractError::ClaimNotFound
    })?;
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );

    Ok(claim)
}

pub fn save_claim(env: &Env, claim: &Claim) {
    let key = ClaimDataKey::Claim(claim.id);
    env.storage().persistent().set(&key, claim);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn has_voted(env: &Env, claim_id: u64, voter: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&ClaimDataKey::Vote(claim_id, voter.clone()))
}

pub fn save_vote(env: &Env, claim_id: u64, voter: &Address, support: bool) {
    let key = ClaimDataKey::Vote(claim_id, voter.clone());
    env.storage().persistent().set(&key, &support);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_stake(env: &Env, voter: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&ClaimDataKey::Stake(voter.clone()))
        .unwrap_or(0)
}

pub fn save_stake(env: &Env, voter: &Address, amount: i128) {
    let key = ClaimDataKey::Stake(voter.clone());
    env.storage().persistent().set(&key, &amount);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_stake_lock(env: &Env, voter: &Address) -> u64 {
    env.storage()
        .persistent()
        .get(&ClaimDataKey::StakeLock(voter.clone()))
        .unwrap_or(0)
}

pub fn save_stake_lock(env: &Env, voter: &Address, until: u64) {
    let key = ClaimDataKey::StakeLock(voter.clone());
    env.storage().persistent().set(&key, &until);
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
        ClaimCounter = 1,
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
            log!(e, "Claimer: Admin not set");
            panic_with_error!(&e, ContractError::AdminNotSet)
        })
    }

    pub fn next_claim_id(e: &Env) -> u64 {
        let id: u64 = e
            .storage()
            .instance()
            .get(&DataKey::ClaimCounter)
            .unwrap_or(0);
        e.storage().instance().set(&DataKey::ClaimCounter, &(id + 1));

        id
    }
}
