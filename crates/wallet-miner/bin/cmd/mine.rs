use crate::{args::GlobalArgs, utils};
use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use std::time::Instant;
use wallet_miner::mine::{AddressMiner, CreationScheme, sequential_salts};

/// CLI arguments for `wallet-miner mine`.
#[derive(Clone, Debug, Parser)]
pub struct MineArgs {
    /// The address the wallet has to land on. Defaults to the configured target.
    #[arg(long, value_name = "ADDRESS")]
    pub target: Option<Address>,

    /// Maximum number of deployments.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u64>,

    /// Creation scheme: `nonce` (`createProxy`) or `salted` (`createProxyWithNonce`).
    #[arg(long, value_name = "SCHEME")]
    pub scheme: Option<CreationScheme>,
}

impl MineArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let sender = config.sender()?;
        let mining = &config.mining;
        let template = super::template(&config, sender, self.scheme);
        let target = self.target.unwrap_or(mining.target);
        let max_attempts = self.max_attempts.unwrap_or(mining.max_attempts);

        let ledger = utils::connect(&config.rpc_url).await?;
        let timer = Instant::now();
        let mined = AddressMiner::new(&ledger, sender)
            .with_gas_limit(mining.gas_limit)
            .mine(&template, sequential_salts(mining.salt_start), target, max_attempts)
            .await?;

        if global.json {
            return utils::print_json(&mined);
        }
        println!(
            "Deployed {} at attempt {} in {:?}",
            mined.address,
            mined.attempt,
            timer.elapsed()
        );
        Ok(())
    }
}
