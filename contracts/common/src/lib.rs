//! Regrow Common Library
//!
//! Shared accounting core for the Regrow auto-compounding protocol.
//! This crate holds the full reward-accrual and compounding engine; the
//! contract crates wrap it with their entry surfaces.
//!
//! ## Components
//!
//! - **Accrual Ledger**: time-weighted point accumulation, one generic
//!   implementation instantiated per (subject, reward token)
//! - **Reward Distributor**: harvest-triggered proportional distribution
//!   over an accrual basis (pool shares or the vault's venue position)
//! - **Streaming Allocator**: rate-based linear emission over a fixed
//!   window for the staking pool
//! - **Compounding Vault**: harvest, fee/incentive split, reinvestment,
//!   and share-price update in one atomic step
//! - **Share Accounting**: proportional share pool with pool-favoring
//!   rounding and penalty retention
//!
//! Every state-changing operation settles accrual for the affected
//! subjects before the balances it depends on change; value is conserved
//! across arbitrary interleavings of deposits, withdrawals, transfers,
//! and harvests.
//!
//! This crate is `no_std` compatible for WASM compilation when built
//! with the `no_std` feature enabled.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export Vec for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::vec::Vec;

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod validation;
pub mod accrual;
pub mod distributor;
pub mod streaming;
pub mod shares;
pub mod vault;

#[cfg(test)]
mod integration_tests;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use validation::*;
pub use accrual::*;
pub use distributor::*;
pub use streaming::*;
pub use shares::*;
pub use vault::*;
