#![no_std]
mod contract;
mod error;
mod storage;

pub mod token_contract {
    pub use soroban_sdk::token::Client;
}

pub mod pool_contract {
    use soroban_sdk::{contractclient, Address, Env};

    /// The part of the insurance pool interface the claims process drives.
    #[contractclient(name = "Client")]
    pub trait InsurancePoolInterface {
        fn execute_slash(env: Env, amount: i128, receiver: Address);
    }
}

pub use contract::{Claimer, ClaimerClient};
pub use error::ContractError;
pub use storage::{Claim, Config};

#[cfg(test)]
mod tests;
