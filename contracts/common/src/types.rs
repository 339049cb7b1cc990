//! Core Types for the Regrow Protocol
//!
//! Fundamental data structures shared across the accounting components:
//! identity aliases, the pool principal/share state, and the fee
//! configuration object. Component-specific state lives next to the
//! component (accrual snapshots in `accrual`, streaming state in
//! `streaming`).

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::fees;
use crate::errors::{RegrowError, RegrowResult};

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for token identifiers
pub type TokenId = [u8; 32];

/// Type alias for accrual subject identifiers (one per tracked producer)
pub type SubjectId = [u8; 32];

/// The zero/null reference
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Returns true if an address is the null reference
pub fn is_zero_address(addr: &Address) -> bool {
    *addr == ZERO_ADDRESS
}

/// Generate a deterministic subject ID for an accrual ledger
pub fn derive_subject_id(owner: &Address, token: &TokenId, nonce: u64) -> SubjectId {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(owner);
    hasher.update(token);
    hasher.update(nonce.to_le_bytes());
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}

// ============ Pool State ============

/// Principal and share totals for the compounding pool.
///
/// `total_principal_assets` only increases on deposit and compounding and
/// decreases on withdrawal net of penalty; the penalty remainder stays in
/// the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolState {
    /// Total shares outstanding
    pub total_shares: u64,
    /// Total principal assets accounted to the pool
    pub total_principal_assets: u64,
}

impl PoolState {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Share price in 1e18 fixed point (assets per share)
    ///
    /// An empty pool reports 1.0 so the first deposit mints 1:1.
    pub fn share_price(&self) -> u128 {
        if self.total_shares == 0 {
            return crate::constants::accrual::SCALE_FACTOR;
        }
        (self.total_principal_assets as u128)
            .saturating_mul(crate::constants::accrual::SCALE_FACTOR)
            / self.total_shares as u128
    }
}

// ============ Fee Configuration ============

/// Mutable fee parameters, held by the vault and updated only through
/// authorized setters. The caller incentive is carved out of the platform
/// fee, never additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FeeConfig {
    /// Platform fee on harvested yield, in basis points
    pub platform_fee_bps: u16,
    /// Caller incentive as a share of the platform fee, in basis points
    pub compound_incentive_bps: u16,
    /// Penalty on withdrawn assets, in basis points
    pub withdrawal_penalty_bps: u16,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: fees::DEFAULT_PLATFORM_FEE_BPS,
            compound_incentive_bps: fees::DEFAULT_COMPOUND_INCENTIVE_BPS,
            withdrawal_penalty_bps: fees::DEFAULT_WITHDRAWAL_PENALTY_BPS,
        }
    }
}

impl FeeConfig {
    /// Create a fee configuration, rejecting out-of-range values
    pub fn new(
        platform_fee_bps: u16,
        compound_incentive_bps: u16,
        withdrawal_penalty_bps: u16,
    ) -> RegrowResult<Self> {
        let config = Self {
            platform_fee_bps,
            compound_incentive_bps,
            withdrawal_penalty_bps,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check all parameters against their maximum constants
    pub fn validate(&self) -> RegrowResult<()> {
        if self.platform_fee_bps > fees::MAX_PLATFORM_FEE_BPS {
            return Err(RegrowError::ExceedsMax {
                value: self.platform_fee_bps as u64,
                maximum: fees::MAX_PLATFORM_FEE_BPS as u64,
            });
        }
        if self.compound_incentive_bps > fees::MAX_COMPOUND_INCENTIVE_BPS {
            return Err(RegrowError::ExceedsMax {
                value: self.compound_incentive_bps as u64,
                maximum: fees::MAX_COMPOUND_INCENTIVE_BPS as u64,
            });
        }
        if self.withdrawal_penalty_bps > fees::MAX_WITHDRAWAL_PENALTY_BPS {
            return Err(RegrowError::ExceedsMax {
                value: self.withdrawal_penalty_bps as u64,
                maximum: fees::MAX_WITHDRAWAL_PENALTY_BPS as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::accrual::SCALE_FACTOR;

    #[test]
    fn test_zero_address() {
        assert!(is_zero_address(&ZERO_ADDRESS));
        assert!(!is_zero_address(&[1u8; 32]));
    }

    #[test]
    fn test_derive_subject_id_deterministic() {
        let a = derive_subject_id(&[1u8; 32], &[2u8; 32], 0);
        let b = derive_subject_id(&[1u8; 32], &[2u8; 32], 0);
        let c = derive_subject_id(&[1u8; 32], &[2u8; 32], 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!is_zero_address(&a));
    }

    #[test]
    fn test_empty_pool_share_price() {
        let pool = PoolState::new();
        assert_eq!(pool.share_price(), SCALE_FACTOR);
    }

    #[test]
    fn test_share_price_tracks_assets() {
        let pool = PoolState {
            total_shares: 100,
            total_principal_assets: 150,
        };
        assert_eq!(pool.share_price(), 3 * SCALE_FACTOR / 2);
    }

    #[test]
    fn test_fee_config_bounds() {
        assert!(FeeConfig::new(1_000, 1_000, 10).is_ok());
        assert!(matches!(
            FeeConfig::new(2_001, 0, 0),
            Err(RegrowError::ExceedsMax { .. })
        ));
        assert!(matches!(
            FeeConfig::new(0, 2_501, 0),
            Err(RegrowError::ExceedsMax { .. })
        ));
        assert!(matches!(
            FeeConfig::new(0, 0, 101),
            Err(RegrowError::ExceedsMax { .. })
        ));
    }
}
