//! Subcommands of the `wallet-miner` binary.

use alloy_primitives::Address;
use wallet_miner::mine::{CreationScheme, DeploymentTemplate};
use wallet_miner_config::Config;

pub mod fetch;
pub mod hijack;
pub mod mine;
pub mod predict;
pub mod probe;
pub mod replay;
pub mod run;

/// The configured deployment template, with the scheme overridden if requested.
fn template(config: &Config, sender: Address, scheme: Option<CreationScheme>) -> DeploymentTemplate {
    let template = DeploymentTemplate::from_config(&config.mining, sender);
    match scheme {
        Some(scheme) => template.with_scheme(scheme),
        None => template,
    }
}
