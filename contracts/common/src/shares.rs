//! Share Accounting Module
//!
//! Proportional-share bookkeeping for the compounding pool. Both the
//! reward distributor (as accrual basis) and the vault state machine (as
//! principal) read this state; only the vault entry points mutate it.
//!
//! ## Rounding policy
//!
//! Every conversion rounds in the pool's favor: shares minted for a
//! deposit round down, assets charged for a mint round up, shares burned
//! for a withdrawal round up, assets paid for a redemption round down.
//! The withdrawal penalty is not collected as a fee; the retained amount
//! simply stays in `total_principal_assets` for the remaining holders.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::limits;
use crate::errors::{RegrowError, RegrowResult};
use crate::math::{self, mul_div, mul_div_ceil};
use crate::types::{Address, PoolState};

// ============================================================================
// Types
// ============================================================================

/// Share balance entry for one holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ShareAccount {
    /// Holder address
    pub owner: Address,
    /// Share balance
    pub balance: u64,
    /// Timestamp of the last balance change
    pub last_updated: u64,
}

impl ShareAccount {
    /// Create a new share account
    pub fn new(owner: Address, now: u64) -> Self {
        Self {
            owner,
            balance: 0,
            last_updated: now,
        }
    }

    /// Check if the balance covers an operation
    pub fn has_sufficient(&self, shares: u64) -> bool {
        self.balance >= shares
    }
}

fn to_amount(value: u128) -> RegrowResult<u64> {
    u64::try_from(value).map_err(|_| RegrowError::Overflow)
}

// ============================================================================
// Preview Functions (pure reads)
// ============================================================================

/// Shares minted for a deposit of `assets` (rounds down)
pub fn preview_deposit(assets: u64, pool: &PoolState) -> RegrowResult<u64> {
    if pool.total_shares == 0 {
        return Ok(assets);
    }
    // An emptied pool with live shares cannot price a deposit
    if pool.total_principal_assets == 0 {
        return Err(RegrowError::DivisionByZero);
    }
    to_amount(mul_div(
        assets as u128,
        pool.total_shares as u128,
        pool.total_principal_assets as u128,
    )?)
}

/// Assets required to mint exactly `shares` (rounds up)
pub fn preview_mint(shares: u64, pool: &PoolState) -> RegrowResult<u64> {
    if pool.total_shares == 0 {
        return Ok(shares);
    }
    to_amount(mul_div_ceil(
        shares as u128,
        pool.total_principal_assets as u128,
        pool.total_shares as u128,
    )?)
}

/// Shares burned to withdraw `assets` before penalty (rounds up)
pub fn preview_withdraw(assets: u64, pool: &PoolState) -> RegrowResult<u64> {
    if pool.total_principal_assets == 0 {
        return Err(RegrowError::InsufficientBalance {
            available: 0,
            requested: assets,
        });
    }
    to_amount(mul_div_ceil(
        assets as u128,
        pool.total_shares as u128,
        pool.total_principal_assets as u128,
    )?)
}

/// Assets returned for redeeming `shares` before penalty (rounds down)
pub fn preview_redeem(shares: u64, pool: &PoolState) -> RegrowResult<u64> {
    if pool.total_shares == 0 {
        return Err(RegrowError::InsufficientShares {
            available: 0,
            requested: shares,
        });
    }
    to_amount(mul_div(
        shares as u128,
        pool.total_principal_assets as u128,
        pool.total_shares as u128,
    )?)
}

/// Split a gross withdrawal amount into (net to withdrawer, retained by
/// pool) according to the penalty
pub fn apply_withdrawal_penalty(gross_assets: u64, penalty_bps: u16) -> (u64, u64) {
    let retained = math::fee_amount(gross_assets, penalty_bps);
    (gross_assets - retained, retained)
}

// ============================================================================
// Mutations
// ============================================================================

/// Mint `shares` to an account against `assets` of new principal
pub fn mint_shares(
    pool: &mut PoolState,
    account: &mut ShareAccount,
    shares: u64,
    assets: u64,
    now: u64,
) -> RegrowResult<()> {
    let new_assets = math::checked_add_amount(pool.total_principal_assets, assets)?;
    if new_assets > limits::MAX_TOTAL_ASSETS {
        return Err(RegrowError::ExceedsCapacity {
            current: pool.total_principal_assets,
            added: assets,
            maximum: limits::MAX_TOTAL_ASSETS,
        });
    }

    pool.total_shares = math::checked_add_amount(pool.total_shares, shares)?;
    pool.total_principal_assets = new_assets;
    account.balance = math::checked_add_amount(account.balance, shares)?;
    account.last_updated = now;
    Ok(())
}

/// Burn `shares` from an account, releasing `assets_out` of principal.
///
/// `assets_out` is the net amount leaving the pool; any penalty retained
/// must already be excluded by the caller.
pub fn burn_shares(
    pool: &mut PoolState,
    account: &mut ShareAccount,
    shares: u64,
    assets_out: u64,
    now: u64,
) -> RegrowResult<()> {
    if !account.has_sufficient(shares) {
        return Err(RegrowError::InsufficientShares {
            available: account.balance,
            requested: shares,
        });
    }

    pool.total_shares = pool
        .total_shares
        .checked_sub(shares)
        .ok_or(RegrowError::InsufficientShares {
            available: pool.total_shares,
            requested: shares,
        })?;
    pool.total_principal_assets =
        math::checked_sub_amount(pool.total_principal_assets, assets_out)?;
    account.balance -= shares;
    account.last_updated = now;
    Ok(())
}

/// Move `shares` between two holders; pool totals are untouched
pub fn transfer_shares(
    from: &mut ShareAccount,
    to: &mut ShareAccount,
    shares: u64,
    now: u64,
) -> RegrowResult<()> {
    if !from.has_sufficient(shares) {
        return Err(RegrowError::InsufficientShares {
            available: from.balance,
            requested: shares,
        });
    }

    from.balance -= shares;
    to.balance = math::checked_add_amount(to.balance, shares)?;
    from.last_updated = now;
    to.last_updated = now;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
