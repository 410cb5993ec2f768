#![no_std]

pub mod episode;
pub mod math;
pub mod ttl;
pub mod utils;

/// Seconds in a (non-leap) year, the time base of annual premium rates.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Annual premium rates are expressed in basis points of the covered amount.
pub const RATE_DENOMINATOR: u64 = 10_000;
