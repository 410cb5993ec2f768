use soroban_sdk::{contracttype, log, Address, Env, String};
use surety::{
    math::{mul_div_i128, premium},
    ttl::{PERSISTENT_RENEWAL_THRESHOLD, PERSISTENT_TARGET_TTL},
    RATE_DENOMINATOR,
};

use crate::{error::ContractError, storage::PoolState};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Product {
    pub id: u32,
    pub name: String,
    /// Yearly premium rate in basis points of the covered amount
    pub annual_percent: u32,
    /// Longest cover that can be bought, in seconds
    pub max_coverage_duration: u64,
    /// Share of the pool assets a single cover may use, in basis points
    pub max_pool_allocation: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cover {
    pub id: u64,
    pub product_id: u32,
    pub buyer: Address,
    pub covered_account: Address,
    pub coverage_amount: i128,
    pub premium: i128,
    pub start_date: u64,
    pub end_date: u64,
}

#[derive(Clone)]
#[contracttype]
pub enum CoverDataKey {
    Product(u32),
    Cover(u64),
}

pub fn validate_product(
    env: &Env,
    annual_percent: u32,
    max_coverage_duration: u64,
    max_pool_allocation: u32,
) -> Result<(), ContractError> {
    if annual_percent == 0 || annual_percent as u64 > RATE_DENOMINATOR {
        log!(
            env,
            "Insurance Pool: Create product: Annual percent {} is out of range",
            annual_percent
        );
        return Err(ContractError::InvalidParameters);
    }
    if max_coverage_duration == 0 {
        log!(env, "Insurance Pool: Create product: Zero maximum coverage duration");
        return Err(ContractError::InvalidParameters);
    }
    if max_pool_allocation == 0 || max_pool_allocation as u64 > RATE_DENOMINATOR {
        log!(
            env,
            "Insurance Pool: Create product: Pool allocation {} is out of range",
            max_pool_allocation
        );
        return Err(ContractError::InvalidParameters);
    }

    Ok(())
}

pub fn get_product(env: &Env, product_id: u32) -> Result<Product, ContractError> {
    let key = CoverDataKey::Product(product_id);
    let product = env.storage().persistent().get(&key).ok_or_else(|| {
        log!(env, "Insurance Pool: Product {} not found", product_id);
        ContractError::ProductNotFound
    })?;
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );

    Ok(product)
}

pub fn save_product(env: &Env, product: &Product) {
    let key = CoverDataKey::Product(product.id);
    env.storage().persistent().set(&key, product);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

pub fn get_cover(env: &Env, cover_id: u64) -> Result<Cover, ContractError> {
    let key = CoverDataKey::Cover(cover_id);
    let cover = env.storage().persistent().get(&key).ok_or_else(|| {
        log!(env, "Insurance Pool: Cover {} not found", cover_id);
        ContractError::CoverNotFound
    })?;
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );

    Ok(cover)
}

pub fn save_cover(env: &Env, cover: &Cover) {
    let key = CoverDataKey::Cover(cover.id);
    env.storage().persistent().set(&key, cover);
    env.storage().persistent().extend_ttl(
        &key,
        PERSISTENT_RENEWAL_THRESHOLD,
        PERSISTENT_TARGET_TTL,
    );
}

/// Premium owed for covering `coverage_amount` during `duration` seconds under `product`.
pub fn quote(
    env: &Env,
    product: &Product,
    pool: &PoolState,
    duration: u64,
    coverage_amount: i128,
) -> Result<i128, ContractError> {
    if duration == 0 || coverage_amount <= 0 {
        log!(
            env,
            "Insurance Pool: Purchase cover: Duration and coverage amount must be positive"
        );
        return Err(ContractError::InvalidAmount);
    }
    if duration > product.max_coverage_duration {
        log!(
            env,
            "Insurance Pool: Purchase cover: Duration {} exceeds the product maximum of {}",
            duration,
            product.max_coverage_duration
        );
        return Err(ContractError::CoverDurationExceeded);
    }

    let capacity = mul_div_i128(
        env,
        pool.total_assets,
        product.max_pool_allocation as i128,
        RATE_DENOMINATOR as i128,
    )
    .ok_or(ContractError::ContractMathError)?;
    if coverage_amount > capacity {
        log!(
            env,
            "Insurance Pool: Purchase cover: Coverage of {} exceeds the capacity of {}",
            coverage_amount,
            capacity
        );
        return Err(ContractError::CoverageExceedsCapacity);
    }

    let premium = premium(env, duration, product.annual_percent, coverage_amount)
        .ok_or(ContractError::ContractMathError)?;
    if premium == 0 {
        log!(env, "Insurance Pool: Purchase cover: Cover too small to be priced");
        return Err(ContractError::InvalidAmount);
    }

    Ok(premium)
}
