use crate::{args::GlobalArgs, utils};
use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use wallet_miner_config::MiningConfig;
use wallet_miner::mine::{CreationScheme, distance, predict, sequential_salts};

/// CLI arguments for `wallet-miner predict`.
#[derive(Clone, Debug, Parser)]
pub struct PredictArgs {
    /// Creation scheme: `nonce` (`createProxy`) or `salted` (`createProxyWithNonce`).
    #[arg(long, value_name = "SCHEME")]
    pub scheme: Option<CreationScheme>,

    /// The address to reach. Defaults to the configured target.
    #[arg(long, value_name = "ADDRESS")]
    pub target: Option<Address>,

    /// How many attempts to look ahead.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u64>,
}

impl PredictArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let sender = config.sender()?;
        let mining = &config.mining;
        let template = super::template(&config, sender, self.scheme);
        let perturb = sequential_salts(mining.salt_start);
        let code = creation_code(mining);
        let target = self.target.unwrap_or(mining.target);

        let ledger = utils::connect(&config.rpc_url).await?;
        let next = predict(&ledger, &template.with_salt(perturb(0)), code).await?;
        let max_attempts = self.max_attempts.unwrap_or(mining.max_attempts);
        let attempts = distance(&ledger, &template, perturb, target, max_attempts, code).await?;

        if global.json {
            let report = serde_json::json!({ "next": next, "target": target, "attempt": attempts });
            return utils::print_json(&report);
        }
        println!("Next deployment: {next}");
        match attempts {
            Some(attempt) => println!("{target} is reached at attempt {attempt}"),
            None => println!("{target} is not reached within {max_attempts} attempts"),
        }
        Ok(())
    }
}

/// The configured proxy creation code, needed to predict salted deployments.
fn creation_code(mining: &MiningConfig) -> Option<&[u8]> {
    mining.proxy_creation_code.as_ref().map(|code| &code[..])
}
