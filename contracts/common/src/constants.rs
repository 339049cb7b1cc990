//! Protocol Constants
//!
//! All magic numbers and configuration values for the Regrow protocol.
//! Fee ceilings follow the ranges used by established auto-compounders.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (higher minimums)
//! - Default (no feature) - Testnet values (lower minimums for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! regrow-common = { path = "...", features = ["mainnet"] }
//! ```

/// Token Metadata
pub mod token {
    /// Vault share token name
    pub const NAME: &str = "Regrow Vault Share";
    /// Vault share token symbol
    pub const SYMBOL: &str = "rgSHARE";
    /// Decimal places for all tracked amounts
    pub const DECIMALS: u8 = 8;
    /// One unit with decimals (1 token = 100_000_000 base units)
    pub const ONE: u64 = 100_000_000;
}

/// Fee Configuration (in basis points, 100 = 1%)
pub mod fees {
    /// Maximum platform fee on harvested yield (20%)
    pub const MAX_PLATFORM_FEE_BPS: u16 = 2_000;

    /// Maximum caller incentive, as a share of the platform fee (25%)
    pub const MAX_COMPOUND_INCENTIVE_BPS: u16 = 2_500;

    /// Maximum withdrawal penalty (1%)
    pub const MAX_WITHDRAWAL_PENALTY_BPS: u16 = 100;

    /// Default platform fee (10%)
    pub const DEFAULT_PLATFORM_FEE_BPS: u16 = 1_000;

    /// Default caller incentive (10% of the platform fee)
    pub const DEFAULT_COMPOUND_INCENTIVE_BPS: u16 = 1_000;

    /// Default withdrawal penalty (0.1%)
    pub const DEFAULT_WITHDRAWAL_PENALTY_BPS: u16 = 10;

    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;
}

/// Accrual Ledger Configuration
pub mod accrual {
    /// Fixed-point scale for per-unit accumulators (1e18)
    pub const SCALE_FACTOR: u128 = 1_000_000_000_000_000_000;
}

/// Streaming Reward Configuration
pub mod streaming {
    /// Length of one reward emission window (7 days, in seconds)
    pub const REWARDS_DURATION: u64 = 7 * 24 * 60 * 60;
}

/// Deposit Limits
///
/// Values differ between mainnet and testnet to allow easier testing.
pub mod limits {
    use super::token::ONE;

    /// Minimum deposit into the vault
    /// - Mainnet: 1 token (keeps share accounting away from dust ranges)
    /// - Testnet: 0.0001 token (allows testing with faucet funds)
    #[cfg(feature = "mainnet")]
    pub const MIN_DEPOSIT: u64 = ONE;
    #[cfg(not(feature = "mainnet"))]
    pub const MIN_DEPOSIT: u64 = ONE / 10_000;

    /// Maximum principal the pool will account for
    /// 10 billion tokens: 10^10 * 10^8 = 10^18 < u64::MAX
    pub const MAX_TOTAL_ASSETS: u64 = 10_000_000_000 * ONE;

    /// Helper to check if running in mainnet mode
    #[cfg(feature = "mainnet")]
    pub const IS_MAINNET: bool = true;
    #[cfg(not(feature = "mainnet"))]
    pub const IS_MAINNET: bool = false;
}

/// Time-related constants
pub mod time {
    /// Seconds per day
    pub const SECONDS_PER_DAY: u64 = 86_400;

    /// Seconds per (non-leap) year
    pub const SECONDS_PER_YEAR: u64 = 31_536_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_bounds() {
        assert!(fees::DEFAULT_PLATFORM_FEE_BPS <= fees::MAX_PLATFORM_FEE_BPS);
        assert!(fees::DEFAULT_COMPOUND_INCENTIVE_BPS <= fees::MAX_COMPOUND_INCENTIVE_BPS);
        assert!(fees::DEFAULT_WITHDRAWAL_PENALTY_BPS <= fees::MAX_WITHDRAWAL_PENALTY_BPS);
        assert!((fees::MAX_PLATFORM_FEE_BPS as u64) < fees::BPS_DENOMINATOR);
    }

    #[test]
    fn test_max_assets_fits_u64() {
        // MAX_TOTAL_ASSETS must leave headroom for compounding growth
        assert!(limits::MAX_TOTAL_ASSETS < u64::MAX / 2);
    }

    #[test]
    fn test_streaming_duration() {
        assert_eq!(streaming::REWARDS_DURATION, 7 * time::SECONDS_PER_DAY);
    }
}
