//! # wallet-miner
//!
//! Reconstructs a historical deployment state, mines a proxy deployment onto a chosen address and
//! takes over uninitialized implementations of upgradeable proxies.
//!
//! Each stage borrows a [`LedgerClient`](wallet_miner_common::LedgerClient) and never caches what
//! it reads from it:
//!
//! 1. [`replay::Replayer`] applies pre-signed historical transactions verbatim.
//! 2. [`mine::AddressMiner`] submits proxy creations until one lands on the target.
//! 3. [`probe`] reads EIP-1967 slots and [`hijack::Hijacker`] claims the implementation.

#[macro_use]
extern crate tracing;

pub mod hijack;
pub mod mine;
pub mod pipeline;
pub mod probe;
pub mod replay;

pub use hijack::{HijackError, HijackOutcome, Hijacker, InitPayload, InitializerLayout};
pub use mine::{AddressMiner, DeploymentTemplate, LogSchema, MinedAddress, MiningError};
pub use pipeline::{Pipeline, PipelineError, PipelineReport};
pub use probe::{ProxyLineage, lineage, probe_implementation};
pub use replay::{ReplayError, ReplaySummary, Replayer};
