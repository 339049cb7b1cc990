//! Streaming Reward Allocator Module
//!
//! Rate-based linear distribution for the staking pool: a notified lump
//! amount becomes a per-second emission rate over a fixed window, and each
//! staker earns in proportion to balance held while the stream runs.
//!
//! ## Key Features
//!
//! - **Notify**: arms a 7-day emission window, rolling any undistributed
//!   remainder of the current window into the new rate
//! - **Settle-before-mutate**: stake and withdraw settle the per-token
//!   accumulator and the staker's pending reward before any balance moves
//! - **Vault-gated**: only the registered vault may stake or withdraw
//! - **Recovery**: stray tokens can be swept, but never the staked asset
//!   or a tracked reward asset
//!
//! Rates are carried in 1e18 fixed point. Within one window
//! `elapsed * rate <= amount * SCALE`, which fits u128 for any u64 amount.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{accrual::SCALE_FACTOR, streaming::REWARDS_DURATION};
use crate::errors::{RegrowError, RegrowResult};
use crate::events::{EventLog, RegrowEvent};
use crate::math::{self, mul_div};
use crate::types::{Address, TokenId};
use crate::validation::{require_nonzero_address, require_positive_amount};
use crate::Vec;

// ============================================================================
// Types
// ============================================================================

/// Emission state for one streamed reward token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StreamingRewardState {
    /// Reward token identifier
    pub token: TokenId,
    /// End of the current emission window
    pub period_finish: u64,
    /// Emission rate in 1e18-scaled units per second
    pub reward_rate: u128,
    /// Timestamp the accumulator was last settled
    pub last_update_time: u64,
    /// Accumulated reward per staked unit, 1e18-scaled
    pub reward_per_token_stored: u128,
}

impl StreamingRewardState {
    /// Create an idle stream for a token
    pub fn new(token: TokenId) -> Self {
        Self {
            token,
            period_finish: 0,
            reward_rate: 0,
            last_update_time: 0,
            reward_per_token_stored: 0,
        }
    }

    /// The accumulator as it would stand after settling at `now`
    pub fn reward_per_token(&self, total_staked: u64, now: u64) -> u128 {
        if total_staked == 0 {
            return self.reward_per_token_stored;
        }
        let last_applicable = now.min(self.period_finish);
        let elapsed = last_applicable.saturating_sub(self.last_update_time);
        self.reward_per_token_stored
            .saturating_add(elapsed as u128 * self.reward_rate / total_staked as u128)
    }
}

/// Per-staker marker for one reward token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StakerRewardState {
    /// Reward token identifier
    pub token: TokenId,
    /// Accumulator position already credited to `pending_reward`
    pub reward_per_token_paid: u128,
    /// Settled but unpaid reward
    pub pending_reward: u64,
}

/// One staker's position in the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StakerAccount {
    /// Staker address
    pub owner: Address,
    /// Staked balance
    pub balance: u64,
    /// Per-token reward markers
    pub rewards: Vec<StakerRewardState>,
}

impl StakerAccount {
    /// Create an empty position
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            balance: 0,
            rewards: Vec::new(),
        }
    }

    fn marker_mut(&mut self, token: &TokenId) -> &mut StakerRewardState {
        let idx = match self.rewards.iter().position(|r| r.token == *token) {
            Some(idx) => idx,
            None => {
                self.rewards.push(StakerRewardState {
                    token: *token,
                    reward_per_token_paid: 0,
                    pending_reward: 0,
                });
                self.rewards.len() - 1
            }
        };
        &mut self.rewards[idx]
    }
}

/// The staking pool: staked totals plus one stream per reward token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StreamingPool {
    /// The only address allowed to stake and withdraw
    pub vault: Address,
    /// Address allowed to configure streams and recover stray tokens
    pub admin: Address,
    /// The staked asset
    pub staked_token: TokenId,
    /// Total staked balance
    pub total_staked: u64,
    /// Streams, one per reward token
    pub streams: Vec<StreamingRewardState>,
}

impl StreamingPool {
    /// Create a pool bound to a vault and an admin
    pub fn new(vault: Address, admin: Address, staked_token: TokenId) -> RegrowResult<Self> {
        require_nonzero_address(&vault, "vault")?;
        require_nonzero_address(&admin, "admin")?;
        require_nonzero_address(&staked_token, "staked_token")?;
        Ok(Self {
            vault,
            admin,
            staked_token,
            total_staked: 0,
            streams: Vec::new(),
        })
    }

    /// Look up a stream
    pub fn stream(&self, token: &TokenId) -> Option<&StreamingRewardState> {
        self.streams.iter().find(|s| s.token == *token)
    }

    fn stream_mut(&mut self, token: &TokenId) -> RegrowResult<&mut StreamingRewardState> {
        self.streams
            .iter_mut()
            .find(|s| s.token == *token)
            .ok_or(RegrowError::RewardTokenNotFound { token: *token })
    }

    /// Register a reward token stream
    pub fn add_stream(&mut self, token: TokenId) -> RegrowResult<()> {
        require_nonzero_address(&token, "reward_token")?;
        if self.stream(&token).is_some() {
            return Err(RegrowError::RewardTokenExists { token });
        }
        self.streams.push(StreamingRewardState::new(token));
        Ok(())
    }

    // ========================================================================
    // Accumulator settlement
    // ========================================================================

    /// Settle one stream's accumulator up to `now`.
    ///
    /// With nothing staked the increment is skipped but the clock still
    /// advances, so rewards emitted into an empty pool are not credited
    /// retroactively once someone stakes.
    pub fn update_reward_per_token(&mut self, token: &TokenId, now: u64) -> RegrowResult<u128> {
        let total_staked = self.total_staked;
        let stream = self.stream_mut(token)?;
        let last_applicable = now.min(stream.period_finish);
        if total_staked > 0 {
            stream.reward_per_token_stored = stream.reward_per_token(total_staked, now);
        }
        stream.last_update_time = stream.last_update_time.max(last_applicable);
        Ok(stream.reward_per_token_stored)
    }

    fn settle_staker(&mut self, staker: &mut StakerAccount, now: u64) -> RegrowResult<()> {
        let tokens: Vec<TokenId> = self.streams.iter().map(|s| s.token).collect();
        for token in tokens {
            let stored = self.update_reward_per_token(&token, now)?;
            let balance = staker.balance;
            let marker = staker.marker_mut(&token);
            let delta = stored.saturating_sub(marker.reward_per_token_paid);
            if delta > 0 && balance > 0 {
                let owed = u64::try_from(mul_div(balance as u128, delta, SCALE_FACTOR)?)
                    .map_err(|_| RegrowError::Overflow)?;
                marker.pending_reward = math::checked_add_amount(marker.pending_reward, owed)?;
            }
            marker.reward_per_token_paid = stored;
        }
        Ok(())
    }

    /// Reward settled plus accrued-but-unsettled for one staker and token
    pub fn earned(&self, staker: &StakerAccount, token: &TokenId, now: u64) -> RegrowResult<u64> {
        let stream = self
            .stream(token)
            .ok_or(RegrowError::RewardTokenNotFound { token: *token })?;
        let stored = stream.reward_per_token(self.total_staked, now);
        let marker = staker.rewards.iter().find(|r| r.token == *token);
        let (paid, pending) = marker
            .map(|m| (m.reward_per_token_paid, m.pending_reward))
            .unwrap_or((0, 0));

        let delta = stored.saturating_sub(paid);
        let owed = u64::try_from(mul_div(staker.balance as u128, delta, SCALE_FACTOR)?)
            .map_err(|_| RegrowError::Overflow)?;
        math::checked_add_amount(pending, owed)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Arm a new emission window for `amount` of a reward token.
    ///
    /// Settles the accumulator under the old rate first; changing the rate
    /// before settling would leak value between windows. If the current
    /// window has not finished, its undistributed remainder rolls into the
    /// new rate. The finish time always moves to `now + REWARDS_DURATION`.
    pub fn notify_reward(
        &mut self,
        token: &TokenId,
        amount: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<()> {
        require_positive_amount(amount)?;
        self.update_reward_per_token(token, now)?;

        let stream = self.stream_mut(token)?;
        let remainder = if now < stream.period_finish {
            (stream.period_finish - now) as u128 * stream.reward_rate
        } else {
            0
        };
        let scaled = (amount as u128)
            .checked_mul(SCALE_FACTOR)
            .ok_or(RegrowError::Overflow)?
            .checked_add(remainder)
            .ok_or(RegrowError::Overflow)?;
        stream.reward_rate = scaled / REWARDS_DURATION as u128;
        stream.period_finish = now + REWARDS_DURATION;
        stream.last_update_time = now;

        events.emit(RegrowEvent::RewardNotified {
            token: *token,
            amount,
            rolled_remainder: (remainder / SCALE_FACTOR) as u64,
            period_finish: stream.period_finish,
            timestamp: now,
        });
        Ok(())
    }

    /// Stake on behalf of an account. Vault-only.
    pub fn stake(
        &mut self,
        caller: &Address,
        staker: &mut StakerAccount,
        amount: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<()> {
        if *caller != self.vault {
            return Err(RegrowError::NotVault { caller: *caller });
        }
        require_positive_amount(amount)?;

        self.settle_staker(staker, now)?;

        self.total_staked = math::checked_add_amount(self.total_staked, amount)?;
        staker.balance = math::checked_add_amount(staker.balance, amount)?;

        events.emit(RegrowEvent::Staked {
            account: staker.owner,
            amount,
            new_total_staked: self.total_staked,
            timestamp: now,
        });
        Ok(())
    }

    /// Withdraw stake on behalf of an account. Vault-only.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        staker: &mut StakerAccount,
        amount: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<()> {
        if *caller != self.vault {
            return Err(RegrowError::NotVault { caller: *caller });
        }
        require_positive_amount(amount)?;
        if staker.balance < amount {
            return Err(RegrowError::InsufficientBalance {
                available: staker.balance,
                requested: amount,
            });
        }

        self.settle_staker(staker, now)?;

        self.total_staked = math::checked_sub_amount(self.total_staked, amount)?;
        staker.balance -= amount;

        events.emit(RegrowEvent::Unstaked {
            account: staker.owner,
            amount,
            new_total_staked: self.total_staked,
            timestamp: now,
        });
        Ok(())
    }

    /// Settle and pay out every pending reward for a staker.
    ///
    /// Returns (token, amount) pairs for the paid rewards.
    pub fn pay_rewards(
        &mut self,
        staker: &mut StakerAccount,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<Vec<(TokenId, u64)>> {
        self.settle_staker(staker, now)?;

        let mut paid = Vec::new();
        for marker in staker.rewards.iter_mut() {
            if marker.pending_reward == 0 {
                continue;
            }
            let amount = marker.pending_reward;
            marker.pending_reward = 0;
            events.emit(RegrowEvent::RewardPaid {
                token: marker.token,
                account: staker.owner,
                amount,
                timestamp: now,
            });
            paid.push((marker.token, amount));
        }
        Ok(paid)
    }

    /// Sweep a stray token from the pool. Admin-only; the staked asset and
    /// tracked reward assets are never sweepable.
    pub fn recover_token(
        &mut self,
        caller: &Address,
        token: &TokenId,
        receiver: &Address,
        amount: u64,
        now: u64,
        events: &mut EventLog,
    ) -> RegrowResult<()> {
        if *caller != self.admin {
            return Err(RegrowError::Unauthorized {
                expected: self.admin,
                actual: *caller,
            });
        }
        require_nonzero_address(token, "token")?;
        require_nonzero_address(receiver, "receiver")?;
        if *token == self.staked_token || self.stream(token).is_some() {
            return Err(RegrowError::InvalidToken { token: *token });
        }

        events.emit(RegrowEvent::TokenRecovered {
            token: *token,
            receiver: *receiver,
            amount,
            timestamp: now,
        });
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
