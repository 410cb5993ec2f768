#![no_std]
mod accounting;
mod contract;
mod cover;
mod distribution;
mod error;
mod lock;
mod msg;
mod signature;
mod storage;
mod unstake;

pub mod token_contract {
    pub use soroban_sdk::token::Client;
}

pub use contract::{InsurancePool, InsurancePoolClient};
pub use error::ContractError;
pub use lock::LockPhase;
pub use msg::{ConfigResponse, ExitResponse, PoolResponse, PositionResponse};
pub use storage::{Config, Position};
pub use unstake::{UnstakeRejection, UnstakeRequest};

#[cfg(test)]
mod tests;
