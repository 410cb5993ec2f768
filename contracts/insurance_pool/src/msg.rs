use soroban_sdk::contracttype;

use crate::storage::{Config, Position};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigResponse {
    pub config: Config,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolResponse {
    pub total_assets: i128,
    pub total_shares: i128,
    /// Share price as `total_assets / total_shares`
    pub share_price_numerator: i128,
    pub share_price_denominator: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionResponse {
    pub position: Position,
    /// Base asset the shares would redeem for right now
    pub value: i128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExitResponse {
    pub redeemed: i128,
    pub reward: i128,
}
