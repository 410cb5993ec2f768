use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    AlreadyInitialized = 700,
    InvalidParameters = 701,
    InsufficientStake = 702,
    InvalidEpisode = 703,
    PositionNotFound = 704,
    NotActive = 705,
    NotPositionOwner = 706,
    FirstLockActive = 707,
    AutoRestakeLocked = 708,
    InsufficientPoolFunds = 709,
    SignatureExpired = 710,
    InvalidSignature = 711,
    ContractMathError = 712,
    InvalidAmount = 713,
    PoolDepleted = 714,
    LockExpired = 715,
    ProductNotFound = 716,
    CoverDurationExceeded = 717,
    CoverageExceedsCapacity = 718,
    CoverNotFound = 719,
    AdminNotSet = 720,
    ConfigNotSet = 721,
}
