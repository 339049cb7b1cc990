//! Integration Tests
//!
//! End-to-end tests that verify the interaction between multiple modules.
//! These tests simulate real accounting scenarios in the Regrow protocol:
//! deposits, transfers, compounds, and streamed rewards interleaved over
//! time, with the conservation and share-price properties checked after
//! every step.

#[cfg(test)]
mod tests {
    use crate::accrual::{settle_user, UserAccrualState};
    use crate::constants::streaming::REWARDS_DURATION;
    use crate::constants::token::ONE;
    use crate::distributor::RewardDistributor;
    use crate::errors::RegrowError;
    use crate::events::{EventLog, EventType};
    use crate::streaming::{StakerAccount, StreamingPool};
    use crate::types::{Address, FeeConfig, TokenId};
    use crate::vault::*;

    const VAULT_ADDR: Address = [10u8; 32];
    const ADMIN: Address = [11u8; 32];
    const FEE_RECIPIENT: Address = [12u8; 32];
    const PRINCIPAL: TokenId = [20u8; 32];
    const YIELD_TOKEN: TokenId = [21u8; 32];
    const SECONDARY: TokenId = [22u8; 32];

    fn alice() -> Address {
        [1u8; 32]
    }

    fn bob() -> Address {
        [2u8; 32]
    }

    fn keeper() -> Address {
        [3u8; 32]
    }

    fn new_vault() -> (VaultState, StreamingPool, EventLog) {
        let config = VaultConfig {
            vault_address: VAULT_ADDR,
            admin: ADMIN,
            fee_recipient: FEE_RECIPIENT,
            principal_token: PRINCIPAL,
            primary_yield_token: YIELD_TOKEN,
            secondary_token: SECONDARY,
        };
        let state = VaultState::new(config, FeeConfig::default(), 0).unwrap();
        let mut staking = StreamingPool::new(VAULT_ADDR, ADMIN, PRINCIPAL).unwrap();
        staking.add_stream(SECONDARY).unwrap();
        (state, staking, EventLog::new())
    }

    fn compound_request(now: u64) -> CompoundRequest {
        CompoundRequest {
            min_swap_out: 1,
            min_deposit_out: 1,
            opt_out_incentive: false,
            caller: keeper(),
            now,
        }
    }

    fn simple_receipts(primary: u64, secondary: u64) -> HarvestReceipts {
        HarvestReceipts {
            primary_claimed: primary,
            primary_swap_out: primary,
            primary_deposit_out: primary,
            secondary_claimed: secondary,
        }
    }

    // ========================================================================
    // Accrual Scenario (shared accumulator over share balances)
    // ========================================================================

    #[test]
    fn test_accrual_scenario_with_mid_period_transfer() {
        // Deposit 1 token of principal at t=0; advance 3600s; transfer half
        // the shares; advance another 3600s. Each holder's accrual after
        // the transfer must follow their new balance exactly.
        let (mut state, _staking, mut events) = new_vault();
        let extra: TokenId = [30u8; 32];
        let mut a = HolderState::new(alice(), 0);
        let mut b = HolderState::new(bob(), 0);

        execute_deposit(&mut state, &mut a, ONE, 0, &mut events).unwrap();
        add_share_reward_token(&mut state, &ADMIN, extra, 0, &mut events).unwrap();

        // t=3600: global accumulated points equal principal(t=0) * 3600
        state.share_dist.settle_all(state.pool.total_shares, 3_600).unwrap();
        let global = state.share_dist.entry(&extra).unwrap().global;
        assert_eq!(global.accumulated_points, ONE as u128 * 3_600);

        // Transfer 50% of the shares at t=3600
        execute_transfer(&mut state, &mut a, &mut b, ONE / 2, 3_600, &mut events).unwrap();

        let points_at_transfer = |h: &HolderState| {
            h.reward_ledgers
                .iter()
                .find(|(t, _)| *t == extra)
                .map(|(_, l)| l.accumulated_points)
                .unwrap()
        };
        let a_before = points_at_transfer(&a);
        let b_before = points_at_transfer(&b);
        assert_eq!(a_before, ONE as u128 * 3_600);
        assert_eq!(b_before, 0);

        // t=7200: each holder accrued proportionally to the new balance
        checkpoint_holder(&mut state, &mut a, 7_200).unwrap();
        checkpoint_holder(&mut state, &mut b, 7_200).unwrap();
        assert_eq!(
            points_at_transfer(&a) - a_before,
            (ONE / 2) as u128 * 3_600
        );
        assert_eq!(
            points_at_transfer(&b) - b_before,
            (ONE / 2) as u128 * 3_600
        );

        // Conservation: user points sum to the global accumulator
        let global = state.share_dist.entry(&extra).unwrap().global;
        assert_eq!(
            points_at_transfer(&a) + points_at_transfer(&b),
            global.accumulated_points
        );
    }

    // ========================================================================
    // Compounding Properties
    // ========================================================================

    #[test]
    fn test_compound_is_monotonic_and_price_never_decreases() {
        let (mut state, mut staking, mut events) = new_vault();
        let mut a = HolderState::new(alice(), 0);
        execute_deposit(&mut state, &mut a, 50 * ONE, 0, &mut events).unwrap();

        let mut t = 0;
        for gross in [ONE, 3 * ONE, 7, 1] {
            t += 3_600;
            let assets_before = state.pool.total_principal_assets;
            let price_before = state.pool.share_price();

            execute_compound(
                &mut state,
                &mut staking,
                &compound_request(t),
                &simple_receipts(gross, 0),
                &mut events,
            )
            .unwrap();

            assert!(state.pool.total_principal_assets > assets_before);
            assert!(state.pool.share_price() >= price_before);
        }
    }

    #[test]
    fn test_withdrawal_penalty_never_lowers_price_for_remaining_holders() {
        let (mut state, _staking, mut events) = new_vault();
        let mut a = HolderState::new(alice(), 0);
        let mut b = HolderState::new(bob(), 0);
        execute_deposit(&mut state, &mut a, 100 * ONE, 0, &mut events).unwrap();
        execute_deposit(&mut state, &mut b, 33 * ONE, 0, &mut events).unwrap();

        let price_before = state.pool.share_price();
        execute_redeem(&mut state, &mut a, 100 * ONE, &alice(), 100, &mut events).unwrap();

        assert!(state.pool.share_price() >= price_before);
    }

    #[test]
    fn test_failed_compound_leaves_all_ledgers_untouched() {
        let (mut state, mut staking, mut events) = new_vault();
        let mut a = HolderState::new(alice(), 0);
        execute_deposit(&mut state, &mut a, 100 * ONE, 0, &mut events).unwrap();

        let snapshot = state.clone();
        let request = CompoundRequest {
            min_swap_out: u64::MAX,
            min_deposit_out: 1,
            opt_out_incentive: false,
            caller: keeper(),
            now: 500,
        };
        let result = execute_compound(
            &mut state,
            &mut staking,
            &request,
            &simple_receipts(10 * ONE, 5 * ONE),
            &mut events,
        );

        assert!(matches!(result, Err(RegrowError::SlippageExceeded { .. })));
        assert_eq!(state, snapshot);
    }

    // ========================================================================
    // Full Lifecycle
    // ========================================================================

    #[test]
    fn test_full_lifecycle_deposit_compound_stream_withdraw() {
        let (mut state, mut staking, mut events) = new_vault();
        let mut a = HolderState::new(alice(), 0);
        let mut b = HolderState::new(bob(), 0);

        // 1. Two depositors enter at t=0
        execute_deposit(&mut state, &mut a, 100 * ONE, 0, &mut events).unwrap();
        execute_deposit(&mut state, &mut b, 100 * ONE, 0, &mut events).unwrap();

        // 2. Bob stakes his shares in the streaming pool
        let mut bob_stake = StakerAccount::new(bob());
        staking
            .stake(&VAULT_ADDR, &mut bob_stake, 100 * ONE, 0, &mut events)
            .unwrap();

        // 3. A day later the keeper compounds harvested yield
        let day = 86_400;
        let outcome = execute_compound(
            &mut state,
            &mut staking,
            &compound_request(day),
            &simple_receipts(20 * ONE, 10 * ONE),
            &mut events,
        )
        .unwrap();

        // Fee split: 10% platform fee, 10% of that to the keeper
        assert_eq!(outcome.fee_primary, 2 * ONE);
        assert_eq!(outcome.incentive_primary, 2 * ONE / 10);
        assert_eq!(outcome.net_primary(), 18 * ONE);
        assert_eq!(state.pool.total_principal_assets, 218 * ONE);

        // 4. The secondary stream pays bob over the following window
        let after_window = day + REWARDS_DURATION;
        let earned = staking.earned(&bob_stake, &SECONDARY, after_window).unwrap();
        let streamed = outcome.net_secondary();
        assert!(streamed - earned <= REWARDS_DURATION);

        let paid = staking
            .pay_rewards(&mut bob_stake, after_window, &mut events)
            .unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].0, SECONDARY);

        // 5. Alice exits; her share of the growth came through the price
        let net = execute_redeem(
            &mut state,
            &mut a,
            100 * ONE,
            &alice(),
            after_window,
            &mut events,
        )
        .unwrap();
        assert!(net > 100 * ONE, "alice must exit with more than she put in");

        // 6. The event stream reconstructs the whole history
        assert_eq!(log_count(&events, EventType::Deposited), 2);
        assert_eq!(log_count(&events, EventType::Compounded), 1);
        assert_eq!(log_count(&events, EventType::Staked), 1);
        assert_eq!(log_count(&events, EventType::RewardNotified), 1);
        assert_eq!(log_count(&events, EventType::RewardPaid), 1);
        assert_eq!(log_count(&events, EventType::Withdrawn), 1);
    }

    fn log_count(events: &EventLog, event_type: EventType) -> usize {
        events.filter_by_type(event_type).len()
    }

    // ========================================================================
    // Distributor Conservation Under Interleaving
    // ========================================================================

    #[test]
    fn test_distributor_conservation_across_many_holders() {
        let subject = [9u8; 32];
        let token: TokenId = [30u8; 32];
        let mut events = EventLog::new();
        let mut dist = RewardDistributor::new(subject).unwrap();
        dist.add_reward_token(token, 1_000, 0, &mut events).unwrap();

        // Five holders with uneven balances summing to the basis
        let balances = [500u64, 250, 125, 100, 25];
        let mut users: Vec<UserAccrualState> = balances
            .iter()
            .map(|&bal| UserAccrualState::new(0, bal))
            .collect();

        // Interleave settlements at ragged times, then a full pass
        for (i, (u, bal)) in users.iter_mut().zip(balances).enumerate() {
            settle_user(&subject, &[i as u8 + 1; 32], u, bal, 1_000 + i as u64 * 97).unwrap();
        }
        dist.settle_token(&token, 1_000, 2_000).unwrap();
        for (i, (u, bal)) in users.iter_mut().zip(balances).enumerate() {
            settle_user(&subject, &[i as u8 + 1; 32], u, bal, 2_000).unwrap();
        }

        let total_user_points: u128 = users.iter().map(|u| u.accumulated_points).sum();
        let global_points = dist.entry(&token).unwrap().global.accumulated_points;
        assert_eq!(total_user_points, global_points);

        // Harvest and let everyone claim: payouts never exceed the pot and
        // the truncation loss is bounded by one unit per holder
        dist.harvest(&token, 999_983, 1_000, 2_000, &mut events).unwrap();
        let mut paid_total = 0u64;
        for (i, (u, bal)) in users.iter_mut().zip(balances).enumerate() {
            let paid = dist
                .claim(
                    &token,
                    &[i as u8 + 1; 32],
                    &[i as u8 + 1; 32],
                    u,
                    bal,
                    1_000,
                    2_000,
                    &mut events,
                )
                .unwrap();
            paid_total += paid;
        }
        assert!(paid_total <= 999_983);
        assert!(999_983 - paid_total <= balances.len() as u64);
        assert_eq!(dist.distributable(&token), 999_983 - paid_total);
    }
}
