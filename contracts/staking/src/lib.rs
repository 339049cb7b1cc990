//! Streaming Reward Pool Contract
//!
//! Entry surface for the staking pool: stake and withdraw (vault-only),
//! reward payout, reward notification, stream registration, and stray
//! token recovery. The rate math lives in `regrow-common::streaming`;
//! this crate assembles the per-call context, dispatches, and checks the
//! token amounts moving with the call.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use regrow_common::{
    errors::{RegrowError, RegrowResult},
    events::EventLog,
    streaming::{StakerAccount, StreamingPool},
    types::{Address, TokenId},
};

// ============ Actions ============

/// All operations the staking pool accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum StakingAction {
    /// Stake on behalf of an account (vault-only)
    Stake { amount: u64 },
    /// Withdraw stake on behalf of an account (vault-only)
    Withdraw { amount: u64 },
    /// Pay out every pending reward for the staker
    ClaimRewards,
    /// Arm a new emission window (vault or admin)
    NotifyReward { token: TokenId, amount: u64 },
    /// Register a reward token stream (admin)
    AddStream { token: TokenId },
    /// Sweep a stray token (admin)
    RecoverToken {
        token: TokenId,
        receiver: Address,
        amount: u64,
    },
}

// ============ Execution Context ============

/// Context for one staking-pool call, assembled by the host
pub struct StakingCallContext {
    /// Pool state
    pub pool: StreamingPool,
    /// The staker position the call acts on
    pub staker: StakerAccount,
    /// Staked tokens arriving with the call
    pub staked_inputs: u64,
    /// Staked tokens leaving with the call
    pub staked_outputs: u64,
    /// Reward tokens leaving with the call, summed over tokens
    pub reward_outputs: u64,
    /// Signer address
    pub signer: Address,
    /// Current timestamp
    pub now: u64,
    /// Event log
    pub events: EventLog,
}

// ============ Execution Functions ============

/// Main entry point
pub fn execute(ctx: &mut StakingCallContext, action: &StakingAction) -> RegrowResult<()> {
    match action {
        StakingAction::Stake { amount } => execute_stake(ctx, *amount),
        StakingAction::Withdraw { amount } => execute_withdraw(ctx, *amount),
        StakingAction::ClaimRewards => execute_claim(ctx),
        StakingAction::NotifyReward { token, amount } => execute_notify(ctx, token, *amount),
        StakingAction::AddStream { token } => execute_add_stream(ctx, *token),
        StakingAction::RecoverToken {
            token,
            receiver,
            amount,
        } => ctx.pool.recover_token(
            &ctx.signer,
            token,
            receiver,
            *amount,
            ctx.now,
            &mut ctx.events,
        ),
    }
}

/// Stake: the call must carry the staked tokens
fn execute_stake(ctx: &mut StakingCallContext, amount: u64) -> RegrowResult<()> {
    if ctx.staked_inputs < amount {
        return Err(RegrowError::InsufficientBalance {
            available: ctx.staked_inputs,
            requested: amount,
        });
    }
    let signer = ctx.signer;
    ctx.pool
        .stake(&signer, &mut ctx.staker, amount, ctx.now, &mut ctx.events)
}

/// Withdraw: the call must release exactly the unstaked amount
fn execute_withdraw(ctx: &mut StakingCallContext, amount: u64) -> RegrowResult<()> {
    let signer = ctx.signer;
    ctx.pool
        .withdraw(&signer, &mut ctx.staker, amount, ctx.now, &mut ctx.events)?;
    if ctx.staked_outputs != amount {
        return Err(RegrowError::InvalidParam {
            param: "staked_outputs",
            reason: "must equal the withdrawn amount",
        });
    }
    Ok(())
}

/// Claim: pay out all pending rewards; outputs must match the sum paid
fn execute_claim(ctx: &mut StakingCallContext) -> RegrowResult<()> {
    if ctx.staker.owner != ctx.signer {
        return Err(RegrowError::Unauthorized {
            expected: ctx.staker.owner,
            actual: ctx.signer,
        });
    }
    let paid = ctx
        .pool
        .pay_rewards(&mut ctx.staker, ctx.now, &mut ctx.events)?;
    let total: u64 = paid.iter().map(|(_, amount)| *amount).sum();
    if ctx.reward_outputs != total {
        return Err(RegrowError::InvalidParam {
            param: "reward_outputs",
            reason: "must equal the rewards paid",
        });
    }
    Ok(())
}

/// Notify: only the vault (via compound) or the admin may arm a window
fn execute_notify(ctx: &mut StakingCallContext, token: &TokenId, amount: u64) -> RegrowResult<()> {
    if ctx.signer != ctx.pool.vault && ctx.signer != ctx.pool.admin {
        return Err(RegrowError::Unauthorized {
            expected: ctx.pool.admin,
            actual: ctx.signer,
        });
    }
    ctx.pool
        .notify_reward(token, amount, ctx.now, &mut ctx.events)
}

/// Register a new stream; admin-only
fn execute_add_stream(ctx: &mut StakingCallContext, token: TokenId) -> RegrowResult<()> {
    if ctx.signer != ctx.pool.admin {
        return Err(RegrowError::Unauthorized {
            expected: ctx.pool.admin,
            actual: ctx.signer,
        });
    }
    ctx.pool.add_stream(token)
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use regrow_common::constants::streaming::REWARDS_DURATION;
    use regrow_common::constants::token::ONE;

    const VAULT_ADDR: Address = [10u8; 32];
    const ADMIN: Address = [11u8; 32];
    const STAKED: TokenId = [20u8; 32];
    const REWARD: TokenId = [21u8; 32];
    const ALICE: Address = [1u8; 32];

    fn test_context(signer: Address) -> StakingCallContext {
        let mut pool = StreamingPool::new(VAULT_ADDR, ADMIN, STAKED).unwrap();
        pool.add_stream(REWARD).unwrap();

        StakingCallContext {
            pool,
            staker: StakerAccount::new(ALICE),
            staked_inputs: 0,
            staked_outputs: 0,
            reward_outputs: 0,
            signer,
            now: 0,
            events: EventLog::new(),
        }
    }

    #[test]
    fn test_stake_is_vault_gated() {
        let mut ctx = test_context(ALICE);
        ctx.staked_inputs = ONE;

        assert!(matches!(
            execute(&mut ctx, &StakingAction::Stake { amount: ONE }),
            Err(RegrowError::NotVault { .. })
        ));

        let mut vault_ctx = test_context(VAULT_ADDR);
        vault_ctx.staked_inputs = ONE;
        execute(&mut vault_ctx, &StakingAction::Stake { amount: ONE }).unwrap();
        assert_eq!(vault_ctx.pool.total_staked, ONE);
    }

    #[test]
    fn test_stake_requires_carried_tokens() {
        let mut ctx = test_context(VAULT_ADDR);
        ctx.staked_inputs = ONE - 1;

        assert!(matches!(
            execute(&mut ctx, &StakingAction::Stake { amount: ONE }),
            Err(RegrowError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_withdraw_checks_outputs() {
        let mut ctx = test_context(VAULT_ADDR);
        ctx.staked_inputs = ONE;
        execute(&mut ctx, &StakingAction::Stake { amount: ONE }).unwrap();

        ctx.staked_outputs = ONE - 1;
        assert!(matches!(
            execute(&mut ctx, &StakingAction::Withdraw { amount: ONE }),
            Err(RegrowError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_notify_gated_to_vault_or_admin() {
        let mut ctx = test_context(ALICE);
        assert!(matches!(
            execute(
                &mut ctx,
                &StakingAction::NotifyReward {
                    token: REWARD,
                    amount: ONE,
                }
            ),
            Err(RegrowError::Unauthorized { .. })
        ));

        for signer in [VAULT_ADDR, ADMIN] {
            let mut ok_ctx = test_context(signer);
            execute(
                &mut ok_ctx,
                &StakingAction::NotifyReward {
                    token: REWARD,
                    amount: ONE,
                },
            )
            .unwrap();
            assert_eq!(
                ok_ctx.pool.stream(&REWARD).unwrap().period_finish,
                REWARDS_DURATION
            );
        }
    }

    #[test]
    fn test_claim_pays_streamed_rewards() {
        let mut ctx = test_context(VAULT_ADDR);
        ctx.staked_inputs = 100 * ONE;
        execute(&mut ctx, &StakingAction::Stake { amount: 100 * ONE }).unwrap();
        execute(
            &mut ctx,
            &StakingAction::NotifyReward {
                token: REWARD,
                amount: 7 * ONE,
            },
        )
        .unwrap();

        // Hand the context to the staker at the end of the window
        ctx.signer = ALICE;
        ctx.now = REWARDS_DURATION;
        ctx.reward_outputs = ctx.pool.earned(&ctx.staker, &REWARD, ctx.now).unwrap();
        execute(&mut ctx, &StakingAction::ClaimRewards).unwrap();

        // Pending was zeroed; a second claim pays nothing
        ctx.reward_outputs = 0;
        execute(&mut ctx, &StakingAction::ClaimRewards).unwrap();
    }

    #[test]
    fn test_recover_is_admin_gated() {
        let mut ctx = test_context(ALICE);
        let stray: TokenId = [99u8; 32];

        assert!(matches!(
            execute(
                &mut ctx,
                &StakingAction::RecoverToken {
                    token: stray,
                    receiver: ALICE,
                    amount: 5,
                }
            ),
            Err(RegrowError::Unauthorized { .. })
        ));

        let mut admin_ctx = test_context(ADMIN);
        execute(
            &mut admin_ctx,
            &StakingAction::RecoverToken {
                token: stray,
                receiver: ALICE,
                amount: 5,
            },
        )
        .unwrap();
    }
}
