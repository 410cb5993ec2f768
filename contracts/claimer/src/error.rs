use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    AlreadyInitialized = 800,
    InvalidParameters = 801,
    ClaimNotFound = 802,
    ClaimNotApproved = 803,
    VotingPeriodNotEnded = 804,
    ClaimAlreadyExecuted = 805,
    AlreadyVoted = 806,
    NoVotingPower = 807,
    InvalidAmount = 808,
    VotingPeriodEnded = 809,
    InsufficientStake = 810,
    StakeLocked = 811,
    AdminNotSet = 812,
    ConfigNotSet = 813,
}
