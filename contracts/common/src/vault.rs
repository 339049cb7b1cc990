//! Compounding Vault Module
//!
//! Orchestrates the accounting core: deposits and withdrawals against the
//! share pool, share-basis reward distribution, and the compound state
//! machine that turns harvested venue yield into principal growth, platform
//! fee, and caller incentive.
//!
//! ## Ordering
//!
//! Every share-mutating entry point settles the accrual ledgers for the
//! affected subjects first, mutates share accounting second, and then
//! re-captures the post-mutation balances as the snapshots for the next
//! interval. The elapsed interval always accrues at the pre-mutation
//! balance.
//!
//! ## Compounding
//!
//! `Idle -> Harvesting -> Splitting -> Reinvested -> Idle` runs inside one
//! call: validation happens before any value moves, the fee/incentive
//! split is computed as a pure outcome, and only then is state committed.
//! No intermediate state survives a failure.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::accrual::{settle_user, UserAccrualState};
use crate::constants::limits;
use crate::distributor::RewardDistributor;
use crate::errors::{RegrowError, RegrowResult};
use crate::events::{EventLog, RegrowEvent};
use crate::math::{self, fee_amount};
use crate::shares::{self, ShareAccount};
use crate::streaming::StreamingPool;
use crate::types::{derive_subject_id, Address, FeeConfig, PoolState, SubjectId, TokenId};
use crate::validation::{require_at_least, require_nonzero_address, require_positive_amount};
use crate::Vec;

// ============================================================================
// Types
// ============================================================================

/// Immutable vault wiring: addresses and token identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultConfig {
    /// The vault's own address
    pub vault_address: Address,
    /// Admin allowed to change fees and reward tokens
    pub admin: Address,
    /// Platform fee recipient
    pub fee_recipient: Address,
    /// The pool's principal asset
    pub principal_token: TokenId,
    /// Venue yield token converted into principal on compound
    pub primary_yield_token: TokenId,
    /// Second reward token, streamed to stakers on compound
    pub secondary_token: TokenId,
}

/// Full vault state: pool, fees, and the two accrual bases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultState {
    /// Wiring
    pub config: VaultConfig,
    /// Share and principal totals
    pub pool: PoolState,
    /// Mutable fee parameters
    pub fees: FeeConfig,
    /// Distributor over the vault's venue position (basis: total principal)
    pub harvest_dist: RewardDistributor,
    /// The vault's own holder ledgers in `harvest_dist`, one per token
    pub harvest_ledgers: Vec<(TokenId, UserAccrualState)>,
    /// Distributor over pool shares (basis: total shares, holders: users)
    pub share_dist: RewardDistributor,
    /// Subject id of the share-basis ledger
    pub share_subject: SubjectId,
}

/// One shareholder's position: share balance plus reward ledgers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct HolderState {
    /// Share balance entry
    pub account: ShareAccount,
    /// Per-token accrual ledgers in the share distributor
    pub reward_ledgers: Vec<(TokenId, UserAccrualState)>,
}

impl HolderState {
    /// Create an empty position
    pub fn new(owner: Address, now: u64) -> Self {
        Self {
            account: ShareAccount::new(owner, now),
            reward_ledgers: Vec::new(),
        }
    }

    /// Fetch or lazily create the ledger for a token.
    ///
    /// A missing ledger starts at the token's registration time with the
    /// holder's current balance: any balance change since registration
    /// would already have created the ledger, so the balance has been
    /// constant over that whole interval and the backdated start accrues
    /// it exactly. This keeps per-holder points summing to the global
    /// accumulator even for tokens added after the holder existed.
    fn ledger_mut(&mut self, token: &TokenId, token_added_at: u64) -> &mut UserAccrualState {
        let idx = match self.reward_ledgers.iter().position(|(t, _)| t == token) {
            Some(idx) => idx,
            None => {
                let balance = self.account.balance;
                self.reward_ledgers
                    .push((*token, UserAccrualState::new(token_added_at, balance)));
                self.reward_ledgers.len() - 1
            }
        };
        &mut self.reward_ledgers[idx].1
    }
}

/// Caller parameters for a compound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundRequest {
    /// Floor on the first conversion hop (yield token out)
    pub min_swap_out: u64,
    /// Floor on the second conversion hop (principal units in)
    pub min_deposit_out: u64,
    /// Forfeit the caller incentive, leaving the full fee to the platform
    pub opt_out_incentive: bool,
    /// Compound caller (incentive recipient)
    pub caller: Address,
    /// Current timestamp
    pub now: u64,
}

/// Venue results fed into a compound. The venue itself is an external
/// collaborator; the core only validates and records these amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestReceipts {
    /// Primary yield claimed from the venue
    pub primary_claimed: u64,
    /// Output of the first conversion hop
    pub primary_swap_out: u64,
    /// Output of the second hop: principal units gained
    pub primary_deposit_out: u64,
    /// Secondary reward token claimed from the venue
    pub secondary_claimed: u64,
}

/// Pure fee/incentive decomposition of one compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompoundOutcome {
    /// Principal units gained gross of fees
    pub gross_primary: u64,
    /// Platform fee on the primary gain (incentive included)
    pub fee_primary: u64,
    /// Caller incentive carved from `fee_primary`
    pub incentive_primary: u64,
    /// Secondary units claimed gross of fees
    pub gross_secondary: u64,
    /// Platform fee on the secondary gain (incentive included)
    pub fee_secondary: u64,
    /// Caller incentive carved from `fee_secondary`
    pub incentive_secondary: u64,
}

impl CompoundOutcome {
    /// Primary units reinvested into the pool
    pub fn net_primary(&self) -> u64 {
        self.gross_primary - self.fee_primary
    }

    /// Secondary units streamed to stakers
    pub fn net_secondary(&self) -> u64 {
        self.gross_secondary - self.fee_secondary
    }

    /// Platform's share of the primary fee after the incentive carve-out
    pub fn platform_primary(&self) -> u64 {
        self.fee_primary - self.incentive_primary
    }

    /// Platform's share of the secondary fee after the incentive carve-out
    pub fn platform_secondary(&self) -> u64 {
        self.fee_secondary - self.incentive_secondary
    }
}

// ============================================================================
// Construction
// ============================================================================

impl VaultState {
    /// Create a vault, registering both harvest tokens and deriving the
    /// accrual subjects
    pub fn new(config: VaultConfig, fees: FeeConfig, now: u64) -> RegrowResult<Self> {
        require_nonzero_address(&config.vault_address, "vault_address")?;
        require_nonzero_address(&config.admin, "admin")?;
        require_nonzero_address(&config.fee_recipient, "fee_recipient")?;
        require_nonzero_address(&config.principal_token, "principal_token")?;
        require_nonzero_address(&config.primary_yield_token, "primary_yield_token")?;
        require_nonzero_address(&config.secondary_token, "secondary_token")?;
        fees.validate()?;

        let harvest_subject =
            derive_subject_id(&config.vault_address, &config.principal_token, 0);
        let share_subject = derive_subject_id(&config.vault_address, &config.principal_token, 1);

        let mut setup_events = EventLog::new();
        let mut harvest_dist = RewardDistributor::new(harvest_subject)?;
        harvest_dist.add_reward_token(config.primary_yield_token, 0, now, &mut setup_events)?;
        harvest_dist.add_reward_token(config.secondary_token, 0, now, &mut setup_events)?;

        let mut harvest_ledgers = Vec::new();
        harvest_ledgers.push((config.primary_yield_token, UserAccrualState::new(now, 0)));
        harvest_ledgers.push((config.secondary_token, UserAccrualState::new(now, 0)));

        Ok(Self {
            config,
            pool: PoolState::new(),
            fees,
            harvest_dist,
            harvest_ledgers,
            share_dist: RewardDistributor::new(share_subject)?,
            share_subject,
        })
    }

    fn harvest_ledger_mut(&mut self, token: &TokenId) -> RegrowResult<&mut UserAccrualState> {
        self.harvest_ledgers
            .iter_mut()
            .find(|(t, _)| t == token)
            .map(|(_, ledger)| ledger)
            .ok_or(RegrowError::RewardTokenNotFound { token: *token })
    }

    /// Settle every share-basis ledger for one holder, plus the globals.
    ///
    /// Invoked with the balances as they stand; share-mutating actions call
    /// it twice, around the mutation.
    fn settle_holder(&mut self, holder: &mut HolderState, now: u64) -> RegrowResult<()> {
        let total_shares = self.pool.total_shares;
        self.share_dist.settle_all(total_shares, now)?;
        let subject = self.share_subject;
        let tokens: Vec<(TokenId, u64)> = self
            .share_dist
            .tokens
            .iter()
            .map(|e| (e.token, e.added_at))
            .collect();
        let owner = holder.account.owner;
        let balance = holder.account.balance;
        for (token, added_at) in tokens {
            let ledger = holder.ledger_mut(&token, added_at);
            settle_user(&subject, &owner, ledger, balance, now)?;
        }
        Ok(())
    }
}

// ============================================================================
// Share Entry Points
// ============================================================================

/// Deposit principal for newly minted shares
pub fn execute_deposit(
    state: &mut VaultState,
    holder: &mut HolderState,
    assets: u64,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<u64> {
    require_at_least(assets, limits::MIN_DEPOSIT)?;
    let shares = shares::preview_deposit(assets, &state.pool)?;
    require_positive_amount(shares)?;

    state.settle_holder(holder, now)?;
    shares::mint_shares(&mut state.pool, &mut holder.account, shares, assets, now)?;
    state.settle_holder(holder, now)?;

    events.emit(RegrowEvent::Deposited {
        owner: holder.account.owner,
        assets,
        shares_minted: shares,
        new_total_shares: state.pool.total_shares,
        new_total_assets: state.pool.total_principal_assets,
        timestamp: now,
    });
    Ok(shares)
}

/// Redeem shares for principal, net of the withdrawal penalty.
///
/// The penalty is not collected anywhere: the retained assets stay in the
/// pool and accrue to the remaining holders.
pub fn execute_redeem(
    state: &mut VaultState,
    holder: &mut HolderState,
    shares_in: u64,
    receiver: &Address,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<u64> {
    require_nonzero_address(receiver, "receiver")?;
    require_positive_amount(shares_in)?;

    let gross = shares::preview_redeem(shares_in, &state.pool)?;
    let (net, retained) = shares::apply_withdrawal_penalty(gross, state.fees.withdrawal_penalty_bps);

    state.settle_holder(holder, now)?;
    shares::burn_shares(&mut state.pool, &mut holder.account, shares_in, net, now)?;
    state.settle_holder(holder, now)?;

    events.emit(RegrowEvent::Withdrawn {
        owner: holder.account.owner,
        receiver: *receiver,
        shares_burned: shares_in,
        assets_out: net,
        penalty_retained: retained,
        new_total_shares: state.pool.total_shares,
        new_total_assets: state.pool.total_principal_assets,
        timestamp: now,
    });
    Ok(net)
}

/// Withdraw an exact amount of assets, burning the required shares.
///
/// The share charge rounds up and the penalty comes out of the requested
/// amount, so the pool never releases more than the shares are worth.
pub fn execute_withdraw(
    state: &mut VaultState,
    holder: &mut HolderState,
    assets: u64,
    receiver: &Address,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<u64> {
    require_nonzero_address(receiver, "receiver")?;
    require_positive_amount(assets)?;

    let shares_needed = shares::preview_withdraw(assets, &state.pool)?;
    let (net, retained) = shares::apply_withdrawal_penalty(assets, state.fees.withdrawal_penalty_bps);

    state.settle_holder(holder, now)?;
    shares::burn_shares(&mut state.pool, &mut holder.account, shares_needed, net, now)?;
    state.settle_holder(holder, now)?;

    events.emit(RegrowEvent::Withdrawn {
        owner: holder.account.owner,
        receiver: *receiver,
        shares_burned: shares_needed,
        assets_out: net,
        penalty_retained: retained,
        new_total_shares: state.pool.total_shares,
        new_total_assets: state.pool.total_principal_assets,
        timestamp: now,
    });
    Ok(shares_needed)
}

/// Transfer shares between holders, settling both sides first
pub fn execute_transfer(
    state: &mut VaultState,
    from: &mut HolderState,
    to: &mut HolderState,
    shares_amount: u64,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_positive_amount(shares_amount)?;

    state.settle_holder(from, now)?;
    state.settle_holder(to, now)?;
    shares::transfer_shares(&mut from.account, &mut to.account, shares_amount, now)?;
    state.settle_holder(from, now)?;
    state.settle_holder(to, now)?;

    events.emit(RegrowEvent::SharesTransferred {
        from: from.account.owner,
        to: to.account.owner,
        shares: shares_amount,
        timestamp: now,
    });
    Ok(())
}

/// Settle a holder's accrual ledgers without changing any balance.
///
/// Safe to call at any time; settling twice at the same instant is a
/// no-op.
pub fn checkpoint_holder(
    state: &mut VaultState,
    holder: &mut HolderState,
    now: u64,
) -> RegrowResult<()> {
    state.settle_holder(holder, now)
}

/// Claim a holder's accrued share-basis rewards for one token
pub fn claim_share_reward(
    state: &mut VaultState,
    holder: &mut HolderState,
    token: &TokenId,
    receiver: &Address,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<u64> {
    let basis = state.pool.total_shares;
    let owner = holder.account.owner;
    let balance = holder.account.balance;
    let added_at = state
        .share_dist
        .entry(token)
        .map(|e| e.added_at)
        .ok_or(RegrowError::RewardTokenNotFound { token: *token })?;
    let ledger = holder.ledger_mut(token, added_at);
    state
        .share_dist
        .claim(token, &owner, receiver, ledger, balance, basis, now, events)
}

// ============================================================================
// Compound State Machine
// ============================================================================

/// Validate a compound request and receipts, producing the fee split.
///
/// Pure: performs the whole Harvesting -> Splitting computation without
/// touching state, so a failure leaves the ledgers exactly as before.
pub fn prepare_compound(
    state: &VaultState,
    request: &CompoundRequest,
    receipts: &HarvestReceipts,
) -> RegrowResult<CompoundOutcome> {
    // A zero minimum disables slippage protection and is disallowed
    // regardless of the other inputs.
    if request.min_swap_out == 0 {
        return Err(RegrowError::InvalidParam {
            param: "min_swap_out",
            reason: "zero minimum disables slippage protection",
        });
    }
    if request.min_deposit_out == 0 {
        return Err(RegrowError::InvalidParam {
            param: "min_deposit_out",
            reason: "zero minimum disables slippage protection",
        });
    }
    require_nonzero_address(&request.caller, "caller")?;

    // Slippage floors bind whenever the primary leg ran at all
    if receipts.primary_claimed > 0 {
        if receipts.primary_swap_out < request.min_swap_out {
            return Err(RegrowError::SlippageExceeded {
                received: receipts.primary_swap_out,
                minimum: request.min_swap_out,
            });
        }
        if receipts.primary_deposit_out < request.min_deposit_out {
            return Err(RegrowError::SlippageExceeded {
                received: receipts.primary_deposit_out,
                minimum: request.min_deposit_out,
            });
        }
    }

    let gross_primary = if receipts.primary_claimed > 0 {
        receipts.primary_deposit_out
    } else {
        0
    };
    let gross_secondary = receipts.secondary_claimed;

    let fee_primary = fee_amount(gross_primary, state.fees.platform_fee_bps);
    let fee_secondary = fee_amount(gross_secondary, state.fees.platform_fee_bps);

    let pays_incentive =
        !request.opt_out_incentive && request.caller != state.config.fee_recipient;
    let (incentive_primary, incentive_secondary) = if pays_incentive {
        (
            fee_amount(fee_primary, state.fees.compound_incentive_bps),
            fee_amount(fee_secondary, state.fees.compound_incentive_bps),
        )
    } else {
        (0, 0)
    };

    // Reinvestment must fit the pool ceiling before anything is committed
    let net_primary = gross_primary - fee_primary;
    let new_total = math::checked_add_amount(state.pool.total_principal_assets, net_primary)?;
    if new_total > limits::MAX_TOTAL_ASSETS {
        return Err(RegrowError::ExceedsCapacity {
            current: state.pool.total_principal_assets,
            added: net_primary,
            maximum: limits::MAX_TOTAL_ASSETS,
        });
    }

    Ok(CompoundOutcome {
        gross_primary,
        fee_primary,
        incentive_primary,
        gross_secondary,
        fee_secondary,
        incentive_secondary,
    })
}

/// Run a full compound: harvest venue yield, split fees, reinvest, and
/// stream the secondary reward.
///
/// Atomic: `prepare_compound` validates everything first; the commit phase
/// below performs no fallible economic checks. A compound with nothing
/// harvested is a legal no-op and emits nothing.
pub fn execute_compound(
    state: &mut VaultState,
    staking: &mut StreamingPool,
    request: &CompoundRequest,
    receipts: &HarvestReceipts,
    events: &mut EventLog,
) -> RegrowResult<CompoundOutcome> {
    let outcome = prepare_compound(state, request, receipts)?;
    let now = request.now;
    let vault = state.config.vault_address;
    let basis = state.pool.total_principal_assets;
    let secondary_token = state.config.secondary_token;

    // The streaming leg must be wired up before anything is committed
    if outcome.net_secondary() > 0 && staking.stream(&secondary_token).is_none() {
        return Err(RegrowError::RewardTokenNotFound {
            token: secondary_token,
        });
    }

    // Harvesting: record the pulled yield and consume it as the vault's
    // own claim. The vault is the sole holder of its venue position, so
    // the claim drains the full distributable balance.
    let primary_token = state.config.primary_yield_token;
    state
        .harvest_dist
        .harvest(&primary_token, receipts.primary_claimed, basis, now, events)?;
    state
        .harvest_dist
        .harvest(&secondary_token, receipts.secondary_claimed, basis, now, events)?;
    for token in [primary_token, secondary_token] {
        let mut ledger = *state.harvest_ledger_mut(&token)?;
        state
            .harvest_dist
            .claim(&token, &vault, &vault, &mut ledger, basis, basis, now, events)?;
        *state.harvest_ledger_mut(&token)? = ledger;
    }

    if outcome.gross_primary == 0 && outcome.gross_secondary == 0 {
        return Ok(outcome);
    }

    // Reinvested: principal grows without minting shares, raising the
    // share price for existing holders.
    state.pool.total_principal_assets += outcome.net_primary();
    state
        .share_dist
        .settle_all(state.pool.total_shares, now)?;

    // The secondary net streams to stakers over the next window
    if outcome.net_secondary() > 0 {
        staking.notify_reward(&secondary_token, outcome.net_secondary(), now, events)?;
    }

    events.emit(RegrowEvent::Compounded {
        caller: request.caller,
        gross_primary: outcome.gross_primary,
        fee_primary: outcome.fee_primary,
        incentive_primary: outcome.incentive_primary,
        gross_secondary: outcome.gross_secondary,
        fee_secondary: outcome.fee_secondary,
        incentive_secondary: outcome.incentive_secondary,
        new_total_assets: state.pool.total_principal_assets,
        timestamp: now,
    });
    Ok(outcome)
}

// ============================================================================
// Configuration Surface
// ============================================================================

fn require_admin(state: &VaultState, caller: &Address) -> RegrowResult<()> {
    if *caller != state.config.admin {
        return Err(RegrowError::Unauthorized {
            expected: state.config.admin,
            actual: *caller,
        });
    }
    Ok(())
}

/// Update the platform fee. Admin-only, bounded by `MAX_PLATFORM_FEE_BPS`.
pub fn set_platform_fee(
    state: &mut VaultState,
    caller: &Address,
    new_bps: u16,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_admin(state, caller)?;
    let updated = FeeConfig {
        platform_fee_bps: new_bps,
        ..state.fees
    };
    updated.validate()?;

    let old_bps = state.fees.platform_fee_bps;
    state.fees = updated;
    events.emit(RegrowEvent::PlatformFeeUpdated {
        old_bps,
        new_bps,
        timestamp: now,
    });
    Ok(())
}

/// Update the compound incentive. Admin-only, bounded by
/// `MAX_COMPOUND_INCENTIVE_BPS`.
pub fn set_compound_incentive(
    state: &mut VaultState,
    caller: &Address,
    new_bps: u16,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_admin(state, caller)?;
    let updated = FeeConfig {
        compound_incentive_bps: new_bps,
        ..state.fees
    };
    updated.validate()?;

    let old_bps = state.fees.compound_incentive_bps;
    state.fees = updated;
    events.emit(RegrowEvent::CompoundIncentiveUpdated {
        old_bps,
        new_bps,
        timestamp: now,
    });
    Ok(())
}

/// Update the withdrawal penalty. Admin-only, bounded by
/// `MAX_WITHDRAWAL_PENALTY_BPS`.
pub fn set_withdrawal_penalty(
    state: &mut VaultState,
    caller: &Address,
    new_bps: u16,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_admin(state, caller)?;
    let updated = FeeConfig {
        withdrawal_penalty_bps: new_bps,
        ..state.fees
    };
    updated.validate()?;

    let old_bps = state.fees.withdrawal_penalty_bps;
    state.fees = updated;
    events.emit(RegrowEvent::WithdrawalPenaltyUpdated {
        old_bps,
        new_bps,
        timestamp: now,
    });
    Ok(())
}

/// Change the platform fee recipient. Admin-only, never the null address.
pub fn set_fee_recipient(
    state: &mut VaultState,
    caller: &Address,
    new_recipient: Address,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_admin(state, caller)?;
    require_nonzero_address(&new_recipient, "fee_recipient")?;

    let old_recipient = state.config.fee_recipient;
    state.config.fee_recipient = new_recipient;
    events.emit(RegrowEvent::FeeRecipientUpdated {
        old_recipient,
        new_recipient,
        timestamp: now,
    });
    Ok(())
}

/// Register an extra share-basis reward token. Admin-only.
pub fn add_share_reward_token(
    state: &mut VaultState,
    caller: &Address,
    token: TokenId,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_admin(state, caller)?;
    let basis = state.pool.total_shares;
    state.share_dist.add_reward_token(token, basis, now, events)
}

/// Deregister a share-basis reward token. Admin-only; refused while
/// undistributed value remains.
pub fn remove_share_reward_token(
    state: &mut VaultState,
    caller: &Address,
    token: &TokenId,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<()> {
    require_admin(state, caller)?;
    state.share_dist.remove_reward_token(token, now, events)
}

/// Credit harvested value for a share-basis reward token. Admin-only;
/// called by keepers when forwarding stray venue rewards to shareholders.
pub fn harvest_share_reward(
    state: &mut VaultState,
    caller: &Address,
    token: &TokenId,
    amount: u64,
    now: u64,
    events: &mut EventLog,
) -> RegrowResult<u64> {
    require_admin(state, caller)?;
    let basis = state.pool.total_shares;
    state.share_dist.harvest(token, amount, basis, now, events)
}

// ============================================================================
// Tests
// ============================================================================
