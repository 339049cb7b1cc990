//! Accrual Ledger Module
//!
//! Time-weighted point accumulation, shared by a global accumulator and
//! per-account accumulators. This is the one generic implementation of the
//! "global + per-user accumulator" pattern; the distributor instantiates it
//! per (subject, reward token) so the copies cannot drift.
//!
//! ## Accounting model
//!
//! Accumulated points equal the sum, over all elapsed intervals since
//! genesis, of `principal_at_interval_start * interval_length`. Settlement
//! accrues the elapsed interval at the previously recorded balance and then
//! captures the current balance for the next interval. Callers therefore
//! invoke `settle_*` once per state-changing action, passing the balance as
//! it stands *after* the action's principal side effect; the interval that
//! just ended still accrues at the old balance.
//!
//! All math is a pure multiply-add on unsigned integers. A u64 balance
//! times a u64 elapsed time always fits in u128, so no rounding occurs
//! here; rounding is deferred to claim time.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{RegrowError, RegrowResult};
use crate::types::{is_zero_address, Address, SubjectId};

// ============================================================================
// Types
// ============================================================================

/// Global accumulator for one (subject, reward token) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GlobalAccrualState {
    /// Timestamp of the last settlement
    pub last_update_ts: u64,
    /// Total principal recorded at the last settlement
    pub last_total_principal: u64,
    /// Time-integral of total principal, in unit-seconds
    pub accumulated_points: u128,
}

impl GlobalAccrualState {
    /// Create a ledger at genesis
    pub fn new(now: u64, total_principal: u64) -> Self {
        Self {
            last_update_ts: now,
            last_total_principal: total_principal,
            accumulated_points: 0,
        }
    }

    /// Points the next settlement would add, without mutating
    pub fn pending_points(&self, now: u64) -> u128 {
        let elapsed = now.saturating_sub(self.last_update_ts);
        elapsed as u128 * self.last_total_principal as u128
    }
}

/// Per-account accumulator for one (subject holder, reward token) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UserAccrualState {
    /// Timestamp of the last settlement
    pub last_update_ts: u64,
    /// Account balance recorded at the last settlement
    pub last_balance: u64,
    /// Time-integral of the account balance, in unit-seconds
    pub accumulated_points: u128,
}

impl UserAccrualState {
    /// Create a ledger at first interaction
    pub fn new(now: u64, balance: u64) -> Self {
        Self {
            last_update_ts: now,
            last_balance: balance,
            accumulated_points: 0,
        }
    }

    /// Points the next settlement would add, without mutating
    pub fn pending_points(&self, now: u64) -> u128 {
        let elapsed = now.saturating_sub(self.last_update_ts);
        elapsed as u128 * self.last_balance as u128
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Settle the global ledger for a subject up to `now`.
///
/// Adds `elapsed * last_total_principal` to the accumulator, advances the
/// timestamp, and records `current_total_principal` for the next interval.
/// A regressed clock (`now` before the last update) settles as zero
/// elapsed time, so repeated settlement is a no-op.
///
/// Returns the points added by this settlement.
///
/// # Errors
/// * `InvalidSubject` if `subject` is the zero reference
/// * `Overflow` if the accumulator would exceed u128
pub fn settle_global(
    subject: &SubjectId,
    state: &mut GlobalAccrualState,
    current_total_principal: u64,
    now: u64,
) -> RegrowResult<u128> {
    if is_zero_address(subject) {
        return Err(RegrowError::InvalidSubject);
    }

    let delta = state.pending_points(now);
    state.accumulated_points = state
        .accumulated_points
        .checked_add(delta)
        .ok_or(RegrowError::Overflow)?;
    state.last_update_ts = state.last_update_ts.max(now);
    state.last_total_principal = current_total_principal;

    Ok(delta)
}

/// Settle an account's ledger for a subject up to `now`.
///
/// Symmetric to [`settle_global`], using the account balance instead of the
/// total. The global ledger must be settled in the same logical step; the
/// two are independent data structures and only their joint settlement
/// preserves the conservation law.
///
/// # Errors
/// * `InvalidSubject` if `subject` is the zero reference
/// * `InvalidAccount` if `account` is the zero reference
/// * `Overflow` if the accumulator would exceed u128
pub fn settle_user(
    subject: &SubjectId,
    account: &Address,
    state: &mut UserAccrualState,
    current_balance: u64,
    now: u64,
) -> RegrowResult<u128> {
    if is_zero_address(subject) {
        return Err(RegrowError::InvalidSubject);
    }
    if is_zero_address(account) {
        return Err(RegrowError::InvalidAccount);
    }

    let delta = state.pending_points(now);
    state.accumulated_points = state
        .accumulated_points
        .checked_add(delta)
        .ok_or(RegrowError::Overflow)?;
    state.last_update_ts = state.last_update_ts.max(now);
    state.last_balance = current_balance;

    Ok(delta)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::token::ONE;

    const SUBJECT: SubjectId = [7u8; 32];
    const ALICE: Address = [1u8; 32];

    #[test]
    fn test_settle_global_accrues_time_weighted_points() {
        let mut state = GlobalAccrualState::new(0, ONE);

        let delta = settle_global(&SUBJECT, &mut state, ONE, 3_600).unwrap();

        assert_eq!(delta, ONE as u128 * 3_600);
        assert_eq!(state.accumulated_points, ONE as u128 * 3_600);
        assert_eq!(state.last_update_ts, 3_600);
    }

    #[test]
    fn test_settle_uses_previous_balance_for_elapsed_interval() {
        let mut state = GlobalAccrualState::new(0, 100);

        // Balance grows to 500 at t=10; the first 10 seconds accrue at 100
        settle_global(&SUBJECT, &mut state, 500, 10).unwrap();
        assert_eq!(state.accumulated_points, 1_000);
        assert_eq!(state.last_total_principal, 500);

        // The next 10 seconds accrue at 500
        settle_global(&SUBJECT, &mut state, 500, 20).unwrap();
        assert_eq!(state.accumulated_points, 1_000 + 5_000);
    }

    #[test]
    fn test_settle_twice_same_instant_is_noop() {
        let mut state = GlobalAccrualState::new(0, ONE);
        settle_global(&SUBJECT, &mut state, ONE, 100).unwrap();
        let before = state.accumulated_points;

        let delta = settle_global(&SUBJECT, &mut state, ONE, 100).unwrap();

        assert_eq!(delta, 0);
        assert_eq!(state.accumulated_points, before);
    }

    #[test]
    fn test_settle_clock_regression_is_noop() {
        let mut state = GlobalAccrualState::new(0, ONE);
        settle_global(&SUBJECT, &mut state, ONE, 100).unwrap();

        let delta = settle_global(&SUBJECT, &mut state, ONE, 50).unwrap();

        assert_eq!(delta, 0);
        assert_eq!(state.last_update_ts, 100);
    }

    #[test]
    fn test_settle_global_rejects_zero_subject() {
        let mut state = GlobalAccrualState::new(0, ONE);
        assert_eq!(
            settle_global(&[0u8; 32], &mut state, ONE, 100),
            Err(RegrowError::InvalidSubject)
        );
    }

    #[test]
    fn test_settle_user_rejects_zero_account() {
        let mut state = UserAccrualState::new(0, ONE);
        assert_eq!(
            settle_user(&SUBJECT, &[0u8; 32], &mut state, ONE, 100),
            Err(RegrowError::InvalidAccount)
        );
    }

    #[test]
    fn test_settle_user_mirrors_global() {
        let mut global = GlobalAccrualState::new(0, 2 * ONE);
        let mut alice = UserAccrualState::new(0, ONE);
        let mut bob = UserAccrualState::new(0, ONE);

        settle_global(&SUBJECT, &mut global, 2 * ONE, 3_600).unwrap();
        settle_user(&SUBJECT, &ALICE, &mut alice, ONE, 3_600).unwrap();
        settle_user(&SUBJECT, &[2u8; 32], &mut bob, ONE, 3_600).unwrap();

        assert_eq!(
            alice.accumulated_points + bob.accumulated_points,
            global.accumulated_points
        );
    }

    #[test]
    fn test_no_overflow_for_practical_ranges() {
        // A year at the maximum accountable principal stays well inside u128
        let max_principal = crate::constants::limits::MAX_TOTAL_ASSETS;
        let mut state = GlobalAccrualState::new(0, max_principal);
        let year = crate::constants::time::SECONDS_PER_YEAR;

        let delta = settle_global(&SUBJECT, &mut state, max_principal, year).unwrap();
        assert_eq!(delta, max_principal as u128 * year as u128);
    }
}
