//! Protocol Events for Regrow
//!
//! Events are emitted during execution and can be indexed off-chain for
//! building UIs, analytics, and notifications. Every record carries enough
//! fields to reconstruct the before/after accounting deltas of the
//! operation that emitted it.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use crate::types::{Address, TokenId};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Vault Events (0x01 - 0x1F)
    Deposited = 0x01,
    Withdrawn = 0x02,
    SharesTransferred = 0x03,
    Compounded = 0x04,

    // Distributor Events (0x20 - 0x3F)
    RewardTokenAdded = 0x20,
    RewardTokenRemoved = 0x21,
    RewardHarvested = 0x22,
    RewardClaimed = 0x23,

    // Streaming Pool Events (0x40 - 0x5F)
    Staked = 0x40,
    Unstaked = 0x41,
    RewardNotified = 0x42,
    RewardPaid = 0x43,
    TokenRecovered = 0x44,

    // Configuration Events (0x80 - 0x9F)
    PlatformFeeUpdated = 0x80,
    CompoundIncentiveUpdated = 0x81,
    WithdrawalPenaltyUpdated = 0x82,
    FeeRecipientUpdated = 0x83,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum RegrowEvent {
    // ============ Vault Events ============

    /// Emitted when principal is deposited for shares
    Deposited {
        owner: Address,
        assets: u64,
        shares_minted: u64,
        new_total_shares: u64,
        new_total_assets: u64,
        timestamp: u64,
    },

    /// Emitted when shares are redeemed for principal
    Withdrawn {
        owner: Address,
        receiver: Address,
        shares_burned: u64,
        assets_out: u64,
        penalty_retained: u64,
        new_total_shares: u64,
        new_total_assets: u64,
        timestamp: u64,
    },

    /// Emitted on share transfer between holders
    SharesTransferred {
        from: Address,
        to: Address,
        shares: u64,
        timestamp: u64,
    },

    /// Emitted after a successful compound, with the full split for both
    /// the principal token and the secondary reward token
    Compounded {
        caller: Address,
        gross_primary: u64,
        fee_primary: u64,
        incentive_primary: u64,
        gross_secondary: u64,
        fee_secondary: u64,
        incentive_secondary: u64,
        new_total_assets: u64,
        timestamp: u64,
    },

    // ============ Distributor Events ============

    /// Emitted when a reward token is registered
    RewardTokenAdded {
        token: TokenId,
        timestamp: u64,
    },

    /// Emitted when a reward token is deregistered
    RewardTokenRemoved {
        token: TokenId,
        timestamp: u64,
    },

    /// Emitted when newly pulled yield is credited to a reward token
    RewardHarvested {
        token: TokenId,
        amount: u64,
        new_distributable: u64,
        timestamp: u64,
    },

    /// Emitted when accrued rewards are claimed
    RewardClaimed {
        token: TokenId,
        account: Address,
        receiver: Address,
        amount: u64,
        points_consumed: u128,
        timestamp: u64,
    },

    // ============ Streaming Pool Events ============

    /// Emitted when the vault stakes on behalf of an account
    Staked {
        account: Address,
        amount: u64,
        new_total_staked: u64,
        timestamp: u64,
    },

    /// Emitted when the vault unstakes on behalf of an account
    Unstaked {
        account: Address,
        amount: u64,
        new_total_staked: u64,
        timestamp: u64,
    },

    /// Emitted when a reward amount is armed for streaming
    RewardNotified {
        token: TokenId,
        amount: u64,
        rolled_remainder: u64,
        period_finish: u64,
        timestamp: u64,
    },

    /// Emitted when streamed rewards are paid out
    RewardPaid {
        token: TokenId,
        account: Address,
        amount: u64,
        timestamp: u64,
    },

    /// Emitted when a non-reward token is swept from the pool
    TokenRecovered {
        token: TokenId,
        receiver: Address,
        amount: u64,
        timestamp: u64,
    },

    // ============ Configuration Events ============

    /// Emitted when the platform fee changes
    PlatformFeeUpdated {
        old_bps: u16,
        new_bps: u16,
        timestamp: u64,
    },

    /// Emitted when the compound incentive changes
    CompoundIncentiveUpdated {
        old_bps: u16,
        new_bps: u16,
        timestamp: u64,
    },

    /// Emitted when the withdrawal penalty changes
    WithdrawalPenaltyUpdated {
        old_bps: u16,
        new_bps: u16,
        timestamp: u64,
    },

    /// Emitted when the platform fee recipient changes
    FeeRecipientUpdated {
        old_recipient: Address,
        new_recipient: Address,
        timestamp: u64,
    },
}

impl RegrowEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Deposited { .. } => EventType::Deposited,
            Self::Withdrawn { .. } => EventType::Withdrawn,
            Self::SharesTransferred { .. } => EventType::SharesTransferred,
            Self::Compounded { .. } => EventType::Compounded,
            Self::RewardTokenAdded { .. } => EventType::RewardTokenAdded,
            Self::RewardTokenRemoved { .. } => EventType::RewardTokenRemoved,
            Self::RewardHarvested { .. } => EventType::RewardHarvested,
            Self::RewardClaimed { .. } => EventType::RewardClaimed,
            Self::Staked { .. } => EventType::Staked,
            Self::Unstaked { .. } => EventType::Unstaked,
            Self::RewardNotified { .. } => EventType::RewardNotified,
            Self::RewardPaid { .. } => EventType::RewardPaid,
            Self::TokenRecovered { .. } => EventType::TokenRecovered,
            Self::PlatformFeeUpdated { .. } => EventType::PlatformFeeUpdated,
            Self::CompoundIncentiveUpdated { .. } => EventType::CompoundIncentiveUpdated,
            Self::WithdrawalPenaltyUpdated { .. } => EventType::WithdrawalPenaltyUpdated,
            Self::FeeRecipientUpdated { .. } => EventType::FeeRecipientUpdated,
        }
    }

    /// Get the timestamp when the event occurred
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Deposited { timestamp, .. } => *timestamp,
            Self::Withdrawn { timestamp, .. } => *timestamp,
            Self::SharesTransferred { timestamp, .. } => *timestamp,
            Self::Compounded { timestamp, .. } => *timestamp,
            Self::RewardTokenAdded { timestamp, .. } => *timestamp,
            Self::RewardTokenRemoved { timestamp, .. } => *timestamp,
            Self::RewardHarvested { timestamp, .. } => *timestamp,
            Self::RewardClaimed { timestamp, .. } => *timestamp,
            Self::Staked { timestamp, .. } => *timestamp,
            Self::Unstaked { timestamp, .. } => *timestamp,
            Self::RewardNotified { timestamp, .. } => *timestamp,
            Self::RewardPaid { timestamp, .. } => *timestamp,
            Self::TokenRecovered { timestamp, .. } => *timestamp,
            Self::PlatformFeeUpdated { timestamp, .. } => *timestamp,
            Self::CompoundIncentiveUpdated { timestamp, .. } => *timestamp,
            Self::WithdrawalPenaltyUpdated { timestamp, .. } => *timestamp,
            Self::FeeRecipientUpdated { timestamp, .. } => *timestamp,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting multiple events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<RegrowEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: RegrowEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[RegrowEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<RegrowEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&RegrowEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when no events were emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = RegrowEvent::Compounded {
            caller: [1u8; 32],
            gross_primary: 1_000_000,
            fee_primary: 100_000,
            incentive_primary: 10_000,
            gross_secondary: 0,
            fee_secondary: 0,
            incentive_secondary: 0,
            new_total_assets: 5_000_000,
            timestamp: 1_700_000_000,
        };

        assert_eq!(event.event_type(), EventType::Compounded);
        assert_eq!(event.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_event_serialization() {
        let event = RegrowEvent::RewardClaimed {
            token: [3u8; 32],
            account: [1u8; 32],
            receiver: [2u8; 32],
            amount: 42_000,
            points_consumed: 7,
            timestamp: 200,
        };

        let bytes = event.to_bytes();
        let restored = RegrowEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();

        log.emit(RegrowEvent::Staked {
            account: [1u8; 32],
            amount: 500,
            new_total_staked: 500,
            timestamp: 100,
        });

        log.emit(RegrowEvent::RewardNotified {
            token: [2u8; 32],
            amount: 700,
            rolled_remainder: 0,
            period_finish: 100 + 604_800,
            timestamp: 100,
        });

        assert_eq!(log.len(), 2);
        assert!(log.has_events());

        let staked = log.filter_by_type(EventType::Staked);
        assert_eq!(staked.len(), 1);
    }
}
