//! # wallet-miner-common
//!
//! The ledger boundary used by every wallet-miner component: the [`LedgerClient`] trait, its
//! JSON-RPC implementation and the historical transaction records that get replayed through it.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod abi;
pub mod errors;
pub mod history;
pub mod ledger;
pub mod provider;
pub mod record;
pub mod rpc;
pub mod slots;

pub use ledger::*;
pub use record::*;
pub use rpc::RpcLedger;
