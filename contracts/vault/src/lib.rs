//! Compounding Vault Contract
//!
//! Entry surface for the Regrow vault: deposits, withdrawals, share
//! transfers, compounding, reward claims, and the fee configuration
//! surface. All accounting lives in `regrow-common`; this crate assembles
//! a per-call context, dispatches the action, and enforces that the token
//! amounts moving with the call match what the accounting produced.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use regrow_common::{
    check,
    errors::{RegrowError, RegrowResult},
    events::EventLog,
    streaming::StreamingPool,
    types::{Address, TokenId},
    validation::share_amounts_balanced,
    vault::{
        self, add_share_reward_token, checkpoint_holder, claim_share_reward,
        execute_compound, harvest_share_reward, remove_share_reward_token,
        set_compound_incentive, set_fee_recipient, set_platform_fee,
        set_withdrawal_penalty, CompoundRequest, HarvestReceipts, HolderState, VaultState,
    },
};

// ============ Actions ============

/// All operations the vault accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum VaultAction {
    /// Deposit principal for shares
    Deposit { assets: u64 },
    /// Withdraw an exact asset amount
    Withdraw { assets: u64, receiver: Address },
    /// Redeem an exact share amount
    Redeem { shares: u64, receiver: Address },
    /// Transfer shares to another holder
    Transfer { shares: u64 },
    /// Harvest, split, and reinvest pending yield
    Compound {
        min_swap_out: u64,
        min_deposit_out: u64,
        opt_out_incentive: bool,
    },
    /// Claim accrued share-basis rewards for one token
    ClaimReward { token: TokenId, receiver: Address },
    /// Settle accrual ledgers without moving balances
    Checkpoint,
    /// Update the platform fee (admin)
    SetPlatformFee { bps: u16 },
    /// Update the compound incentive (admin)
    SetCompoundIncentive { bps: u16 },
    /// Update the withdrawal penalty (admin)
    SetWithdrawalPenalty { bps: u16 },
    /// Change the platform fee recipient (admin)
    SetFeeRecipient { recipient: Address },
    /// Register a share-basis reward token (admin)
    AddRewardToken { token: TokenId },
    /// Deregister a share-basis reward token (admin)
    RemoveRewardToken { token: TokenId },
    /// Credit harvested value for a share-basis reward token (admin)
    HarvestRewardToken { token: TokenId, amount: u64 },
}

// ============ Execution Context ============

/// Context for one vault call, assembled by the host
pub struct VaultCallContext {
    /// Vault state
    pub state: VaultState,
    /// Streaming pool fed by compound
    pub staking: StreamingPool,
    /// The signer's position
    pub holder: HolderState,
    /// Transfer counterparty's position, when the action needs one
    pub counterparty: Option<HolderState>,
    /// Venue results, when the action is a compound
    pub receipts: HarvestReceipts,
    /// Principal arriving with the call
    pub principal_inputs: u64,
    /// Principal leaving with the call
    pub principal_outputs: u64,
    /// Signer address
    pub signer: Address,
    /// Current timestamp
    pub now: u64,
    /// Event log
    pub events: EventLog,
}

// ============ Execution Functions ============

/// Main entry point
pub fn execute(ctx: &mut VaultCallContext, action: &VaultAction) -> RegrowResult<()> {
    match action {
        VaultAction::Deposit { assets } => execute_deposit(ctx, *assets),
        VaultAction::Withdraw { assets, receiver } => execute_withdraw(ctx, *assets, receiver),
        VaultAction::Redeem { shares, receiver } => execute_redeem(ctx, *shares, receiver),
        VaultAction::Transfer { shares } => execute_transfer(ctx, *shares),
        VaultAction::Compound {
            min_swap_out,
            min_deposit_out,
            opt_out_incentive,
        } => execute_compound_action(ctx, *min_swap_out, *min_deposit_out, *opt_out_incentive),
        VaultAction::ClaimReward { token, receiver } => {
            claim_share_reward(
                &mut ctx.state,
                &mut ctx.holder,
                token,
                receiver,
                ctx.now,
                &mut ctx.events,
            )?;
            Ok(())
        }
        VaultAction::Checkpoint => checkpoint_holder(&mut ctx.state, &mut ctx.holder, ctx.now),
        VaultAction::SetPlatformFee { bps } => {
            set_platform_fee(&mut ctx.state, &ctx.signer, *bps, ctx.now, &mut ctx.events)
        }
        VaultAction::SetCompoundIncentive { bps } => {
            set_compound_incentive(&mut ctx.state, &ctx.signer, *bps, ctx.now, &mut ctx.events)
        }
        VaultAction::SetWithdrawalPenalty { bps } => {
            set_withdrawal_penalty(&mut ctx.state, &ctx.signer, *bps, ctx.now, &mut ctx.events)
        }
        VaultAction::SetFeeRecipient { recipient } => {
            set_fee_recipient(&mut ctx.state, &ctx.signer, *recipient, ctx.now, &mut ctx.events)
        }
        VaultAction::AddRewardToken { token } => {
            add_share_reward_token(&mut ctx.state, &ctx.signer, *token, ctx.now, &mut ctx.events)
        }
        VaultAction::RemoveRewardToken { token } => {
            remove_share_reward_token(&mut ctx.state, &ctx.signer, token, ctx.now, &mut ctx.events)
        }
        VaultAction::HarvestRewardToken { token, amount } => {
            harvest_share_reward(
                &mut ctx.state,
                &ctx.signer,
                token,
                *amount,
                ctx.now,
                &mut ctx.events,
            )?;
            Ok(())
        }
    }
}

/// Only the position's owner may act on it
fn require_position_owner(ctx: &VaultCallContext) -> RegrowResult<()> {
    check!(
        ctx.holder.account.owner == ctx.signer,
        RegrowError::Unauthorized {
            expected: ctx.holder.account.owner,
            actual: ctx.signer,
        }
    );
    Ok(())
}

/// Deposit: the call must carry the principal being deposited
fn execute_deposit(ctx: &mut VaultCallContext, assets: u64) -> RegrowResult<()> {
    check!(
        ctx.principal_inputs >= assets,
        RegrowError::InsufficientBalance {
            available: ctx.principal_inputs,
            requested: assets,
        }
    );
    require_position_owner(ctx)?;

    let minted = vault::execute_deposit(
        &mut ctx.state,
        &mut ctx.holder,
        assets,
        ctx.now,
        &mut ctx.events,
    )?;
    share_amounts_balanced(0, minted, minted, 0)
}

/// Withdraw: the call must pay out exactly the net assets
fn execute_withdraw(
    ctx: &mut VaultCallContext,
    assets: u64,
    receiver: &Address,
) -> RegrowResult<()> {
    require_position_owner(ctx)?;

    let assets_before = ctx.state.pool.total_principal_assets;
    let burned = vault::execute_withdraw(
        &mut ctx.state,
        &mut ctx.holder,
        assets,
        receiver,
        ctx.now,
        &mut ctx.events,
    )?;
    let released = assets_before - ctx.state.pool.total_principal_assets;
    if ctx.principal_outputs != released {
        return Err(RegrowError::InvalidParam {
            param: "principal_outputs",
            reason: "must equal the net assets released",
        });
    }
    share_amounts_balanced(burned, 0, 0, burned)
}

/// Redeem: like withdraw, denominated in shares
fn execute_redeem(
    ctx: &mut VaultCallContext,
    shares: u64,
    receiver: &Address,
) -> RegrowResult<()> {
    require_position_owner(ctx)?;

    let net = vault::execute_redeem(
        &mut ctx.state,
        &mut ctx.holder,
        shares,
        receiver,
        ctx.now,
        &mut ctx.events,
    )?;
    if ctx.principal_outputs != net {
        return Err(RegrowError::InvalidParam {
            param: "principal_outputs",
            reason: "must equal the net assets released",
        });
    }
    share_amounts_balanced(shares, 0, 0, shares)
}

/// Transfer between the signer and the counterparty position
fn execute_transfer(ctx: &mut VaultCallContext, shares: u64) -> RegrowResult<()> {
    require_position_owner(ctx)?;
    let counterparty = ctx
        .counterparty
        .as_mut()
        .ok_or(RegrowError::InvalidParam {
            param: "counterparty",
            reason: "transfer requires a receiving position",
        })?;

    vault::execute_transfer(
        &mut ctx.state,
        &mut ctx.holder,
        counterparty,
        shares,
        ctx.now,
        &mut ctx.events,
    )?;
    share_amounts_balanced(shares, shares, 0, 0)
}

/// Compound with the venue receipts carried by the context
fn execute_compound_action(
    ctx: &mut VaultCallContext,
    min_swap_out: u64,
    min_deposit_out: u64,
    opt_out_incentive: bool,
) -> RegrowResult<()> {
    let request = CompoundRequest {
        min_swap_out,
        min_deposit_out,
        opt_out_incentive,
        caller: ctx.signer,
        now: ctx.now,
    };
    let receipts = ctx.receipts;
    execute_compound(
        &mut ctx.state,
        &mut ctx.staking,
        &request,
        &receipts,
        &mut ctx.events,
    )?;
    Ok(())
}

// ============ Tests ============
