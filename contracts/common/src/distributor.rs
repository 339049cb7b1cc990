//! Reward Distributor Module
//!
//! Maintains one accrual ledger per (subject, reward token) pair: a global
//! accumulator over the accrual basis (pool shares or staked tokens) and
//! one per-holder accumulator. Harvests credit newly pulled yield to a
//! token's distributable balance; claims settle both ledgers and pay out
//! proportionally to accumulated points.
//!
//! ## Conservation
//!
//! After a full settlement pass the sum of all holder points equals the
//! global points for every token. A claim consumes the holder's points and
//! subtracts the same quantity from the global accumulator, so the law
//! holds across claims as well. Truncation loss is bounded to one base
//! unit per claim and remains in the distributable balance.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::accrual::{settle_global, settle_user, GlobalAccrualState, UserAccrualState};
use crate::errors::{RegrowError, RegrowResult};
use crate::events::{EventLog, RegrowEvent};
use crate::math::{self, mul_div};
use crate::types::{is_zero_address, Address, SubjectId, TokenId};
use crate::validation::require_nonzero_address;
use crate::Vec;

// ============================================================================
// Types
// ============================================================================

/// Accounting entry for one tracked reward token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RewardTokenEntry {
    /// Reward token identifier
    pub token: TokenId,
    /// Global accumulator over the accrual basis
    pub global: GlobalAccrualState,
    /// Harvested amount not yet claimed
    pub distributable: u64,
    /// Timestamp of registration
    pub added_at: u64,
}

/// Per-subject reward distributor tracking a set of reward tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RewardDistributor {
    /// Accrual subject this distributor tracks
    pub subject: SubjectId,
    /// Tracked reward tokens
    pub tokens: Vec<RewardTokenEntry>,
}

impl RewardDistributor {
    /// Create a distributor for a subject
    pub fn new(subject: SubjectId) -> RegrowResult<Self> {
        if is_zero_address(&subject) {
            return Err(RegrowError::InvalidSubject);
        }
        Ok(Self {
            subject,
            tokens: Vec::new(),
        })
    }

    /// Look up a tracked token
    pub fn entry(&self, token: &TokenId) -> Option<&RewardTokenEntry> {
        self.tokens.iter().find(|e| e.token == *token)
    }

    fn entry_mut(&mut self, token: &TokenId) -> RegrowResult<&mut RewardTokenEntry> {
        self.tokens
            .iter_mut()
            .find(|e| e.token == *token)
            .ok_or(RegrowError::RewardTokenNotFound { token: *token })
    }

    /// Returns true if a token is tracked
    pub fn is_tracked(&self, token: &TokenId) -> bool {
        self.entry(token).is_some()
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register a reward token, starting its global ledger at the current
    /// accrual basis
    pub fn add_reward_token(
        &mut self,
        token: TokenId,
        current_basis: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<()> {
        require_nonzero_address(&token, "reward_token")?;
        if self.is_tracked(&token) {
            return Err(RegrowError::RewardTokenExists { token });
        }

        self.tokens.push(RewardTokenEntry {
            token,
            global: GlobalAccrualState::new(now, current_basis),
            distributable: 0,
            added_at: now,
        });
        events.emit(RegrowEvent::RewardTokenAdded {
            token,
            timestamp: now,
        });
        Ok(())
    }

    /// Deregister a reward token.
    ///
    /// Refused while the token still holds undistributed value, so
    /// deregistration can never orphan harvested yield.
    pub fn remove_reward_token(
        &mut self,
        token: &TokenId,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<()> {
        let entry = self.entry_mut(token)?;
        if entry.distributable > 0 {
            return Err(RegrowError::RewardsOutstanding {
                token: *token,
                remaining: entry.distributable,
            });
        }

        self.tokens.retain(|e| e.token != *token);
        events.emit(RegrowEvent::RewardTokenRemoved {
            token: *token,
            timestamp: now,
        });
        Ok(())
    }

    // ========================================================================
    // Settlement / Harvest / Claim
    // ========================================================================

    /// Settle a token's global ledger against the current accrual basis
    pub fn settle_token(
        &mut self,
        token: &TokenId,
        current_basis: u64,
        now: u64,
    ) -> RegrowResult<u128> {
        let subject = self.subject;
        let entry = self.entry_mut(token)?;
        settle_global(&subject, &mut entry.global, current_basis, now)
    }

    /// Settle every tracked token's global ledger. Invoked by share-mutating
    /// actions before the basis changes hands.
    pub fn settle_all(&mut self, current_basis: u64, now: u64) -> RegrowResult<()> {
        let subject = self.subject;
        for entry in self.tokens.iter_mut() {
            settle_global(&subject, &mut entry.global, current_basis, now)?;
        }
        Ok(())
    }

    /// Credit newly pulled yield to a token after settling its ledger.
    ///
    /// A zero harvest settles and returns without emitting.
    pub fn harvest(
        &mut self,
        token: &TokenId,
        claimed_amount: u64,
        current_basis: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<u64> {
        let subject = self.subject;
        let entry = self.entry_mut(token)?;
        settle_global(&subject, &mut entry.global, current_basis, now)?;

        if claimed_amount == 0 {
            return Ok(entry.distributable);
        }

        entry.distributable = math::checked_add_amount(entry.distributable, claimed_amount)?;
        let new_distributable = entry.distributable;
        events.emit(RegrowEvent::RewardHarvested {
            token: *token,
            amount: claimed_amount,
            new_distributable,
            timestamp: now,
        });
        Ok(new_distributable)
    }

    /// Settle and pay out an account's share of the distributable balance.
    ///
    /// `claimable = user_points * distributable / global_points`, floor
    /// division. The consumed points leave both the user and the global
    /// accumulator. A computed amount of zero is a legal no-op: nothing is
    /// consumed and no event is emitted, so entitlement carries over to the
    /// next harvest.
    #[allow(clippy::too_many_arguments)]
    pub fn claim(
        &mut self,
        token: &TokenId,
        account: &Address,
        receiver: &Address,
        user: &mut UserAccrualState,
        current_balance: u64,
        current_basis: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<u64> {
        require_nonzero_address(receiver, "receiver")?;

        let subject = self.subject;
        let entry = self.entry_mut(token)?;
        settle_global(&subject, &mut entry.global, current_basis, now)?;
        settle_user(&subject, account, user, current_balance, now)?;

        let global_points = entry.global.accumulated_points;
        if global_points == 0 {
            return Ok(0);
        }

        // Settled user points can never exceed the global accumulator
        let consumed = user.accumulated_points.min(global_points);
        let claimable =
            u64::try_from(mul_div(consumed, entry.distributable as u128, global_points)?)
                .map_err(|_| RegrowError::Overflow)?;
        if claimable == 0 {
            return Ok(0);
        }

        user.accumulated_points -= consumed;
        entry.global.accumulated_points -= consumed;
        entry.distributable -= claimable;

        events.emit(RegrowEvent::RewardClaimed {
            token: *token,
            account: *account,
            receiver: *receiver,
            amount: claimable,
            points_consumed: consumed,
            timestamp: now,
        });
        Ok(claimable)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Amount a claim would pay right now, without mutating
    pub fn claimable(
        &self,
        token: &TokenId,
        user: &UserAccrualState,
        now: u64,
    ) -> RegrowResult<u64> {
        let entry = self
            .entry(token)
            .ok_or(RegrowError::RewardTokenNotFound { token: *token })?;

        let global_points = entry
            .global
            .accumulated_points
            .saturating_add(entry.global.pending_points(now));
        if global_points == 0 {
            return Ok(0);
        }
        let user_points = user
            .accumulated_points
            .saturating_add(user.pending_points(now))
            .min(global_points);

        u64::try_from(mul_div(user_points, entry.distributable as u128, global_points)?)
            .map_err(|_| RegrowError::Overflow)
    }

    /// Undistributed balance for a token
    pub fn distributable(&self, token: &TokenId) -> u64 {
        self.entry(token).map(|e| e.distributable).unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: SubjectId = [9u8; 32];
    const REWARD: TokenId = [3u8; 32];
    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    fn distributor_with_token(basis: u64, now: u64) -> (RewardDistributor, EventLog) {
        let mut events = EventLog::new();
        let mut dist = RewardDistributor::new(SUBJECT).unwrap();
        dist.add_reward_token(REWARD, basis, now, &mut events).unwrap();
        (dist, events)
    }

    #[test]
    fn test_new_rejects_zero_subject() {
        assert_eq!(
            RewardDistributor::new([0u8; 32]).unwrap_err(),
            RegrowError::InvalidSubject
        );
    }

    #[test]
    fn test_add_and_remove_reward_token() {
        let (mut dist, mut events) = distributor_with_token(0, 0);
        assert!(dist.is_tracked(&REWARD));

        assert_eq!(
            dist.add_reward_token(REWARD, 0, 0, &mut events),
            Err(RegrowError::RewardTokenExists { token: REWARD })
        );

        dist.remove_reward_token(&REWARD, 10, &mut events).unwrap();
        assert!(!dist.is_tracked(&REWARD));
        assert_eq!(
            dist.remove_reward_token(&REWARD, 10, &mut events),
            Err(RegrowError::RewardTokenNotFound { token: REWARD })
        );
    }

    #[test]
    fn test_add_rejects_zero_token() {
        let mut events = EventLog::new();
        let mut dist = RewardDistributor::new(SUBJECT).unwrap();
        assert!(matches!(
            dist.add_reward_token([0u8; 32], 0, 0, &mut events),
            Err(RegrowError::ZeroAddress { .. })
        ));
    }

    #[test]
    fn test_remove_refused_while_rewards_outstanding() {
        let (mut dist, mut events) = distributor_with_token(100, 0);
        dist.harvest(&REWARD, 50, 100, 10, &mut events).unwrap();

        assert_eq!(
            dist.remove_reward_token(&REWARD, 10, &mut events),
            Err(RegrowError::RewardsOutstanding {
                token: REWARD,
                remaining: 50,
            })
        );
    }

    #[test]
    fn test_claim_with_zero_global_points_returns_zero() {
        let (mut dist, mut events) = distributor_with_token(0, 0);
        let mut user = UserAccrualState::new(0, 0);

        // No principal ever existed: defined as 0, not a division fault
        let paid = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut user, 0, 0, 100, &mut events)
            .unwrap();
        assert_eq!(paid, 0);
    }

    #[test]
    fn test_claim_rejects_zero_receiver() {
        let (mut dist, mut events) = distributor_with_token(0, 0);
        let mut user = UserAccrualState::new(0, 0);

        assert!(matches!(
            dist.claim(&REWARD, &ALICE, &[0u8; 32], &mut user, 0, 0, 100, &mut events),
            Err(RegrowError::ZeroAddress { .. })
        ));
    }

    #[test]
    fn test_claim_pays_proportionally_and_consumes_points() {
        // Alice holds 30 of 100 units of basis for 100 seconds
        let (mut dist, mut events) = distributor_with_token(100, 0);
        let mut alice = UserAccrualState::new(0, 30);

        dist.harvest(&REWARD, 1_000, 100, 100, &mut events).unwrap();

        let paid = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 30, 100, 100, &mut events)
            .unwrap();

        // 3000/10000 of 1000
        assert_eq!(paid, 300);
        assert_eq!(alice.accumulated_points, 0);
        assert_eq!(dist.entry(&REWARD).unwrap().global.accumulated_points, 7_000);
        assert_eq!(dist.distributable(&REWARD), 700);
    }

    #[test]
    fn test_second_claim_without_new_accrual_pays_nothing() {
        let (mut dist, mut events) = distributor_with_token(100, 0);
        let mut alice = UserAccrualState::new(0, 100);

        dist.harvest(&REWARD, 1_000, 100, 100, &mut events).unwrap();
        let first = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 100, 100, 100, &mut events)
            .unwrap();
        let second = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 100, 100, 100, &mut events)
            .unwrap();

        assert_eq!(first, 1_000);
        assert_eq!(second, 0);
    }

    #[test]
    fn test_zero_claimable_preserves_entitlement() {
        // Points accrued but nothing harvested yet: claim must not burn them
        let (mut dist, mut events) = distributor_with_token(100, 0);
        let mut alice = UserAccrualState::new(0, 100);

        let paid = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 100, 100, 50, &mut events)
            .unwrap();
        assert_eq!(paid, 0);
        assert_eq!(alice.accumulated_points, 100 * 50);

        // Harvest arrives later; the earlier points still pay out
        dist.harvest(&REWARD, 500, 100, 50, &mut events).unwrap();
        let paid = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 100, 100, 50, &mut events)
            .unwrap();
        assert_eq!(paid, 500);
    }

    #[test]
    fn test_conservation_across_two_holders() {
        let (mut dist, mut events) = distributor_with_token(100, 0);
        let mut alice = UserAccrualState::new(0, 70);
        let mut bob = UserAccrualState::new(0, 30);

        dist.harvest(&REWARD, 999, 100, 60, &mut events).unwrap();

        let paid_a = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 70, 100, 60, &mut events)
            .unwrap();
        let paid_b = dist
            .claim(&REWARD, &BOB, &BOB, &mut bob, 30, 100, 60, &mut events)
            .unwrap();

        // Truncation loss bounded by one unit per claim
        assert!(paid_a + paid_b <= 999);
        assert!(999 - (paid_a + paid_b) <= 2);
        // Whatever was not paid is still distributable, not lost
        assert_eq!(dist.distributable(&REWARD), 999 - paid_a - paid_b);
        // Conservation of points after both claims
        assert_eq!(
            alice.accumulated_points + bob.accumulated_points,
            dist.entry(&REWARD).unwrap().global.accumulated_points
        );
    }

    #[test]
    fn test_claimable_view_matches_claim() {
        let (mut dist, mut events) = distributor_with_token(100, 0);
        let mut alice = UserAccrualState::new(0, 40);

        dist.harvest(&REWARD, 800, 100, 25, &mut events).unwrap();

        let preview = dist.claimable(&REWARD, &alice, 25).unwrap();
        let paid = dist
            .claim(&REWARD, &ALICE, &ALICE, &mut alice, 40, 100, 25, &mut events)
            .unwrap();
        assert_eq!(preview, paid);
        assert_eq!(paid, 320); // 40*25 of 100*25 points -> 40% of 800
    }
}
