//! # wallet-miner-test-utils
//!
//! An in-memory [`LedgerClient`](wallet_miner_common::LedgerClient) with scripted contracts, and
//! the wallet mining world built on top of it.

#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

mod ledger;
pub use ledger::{Frame, MemoryLedger, Program, Revert};

pub mod fixtures;
pub use fixtures::WalletMiningWorld;

pub mod programs;

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
