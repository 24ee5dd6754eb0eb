use crate::{args::GlobalArgs, utils};
use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use wallet_miner::probe::{lineage, probe_admin, probe_beacon};

/// CLI arguments for `wallet-miner probe`.
#[derive(Clone, Debug, Parser)]
pub struct ProbeArgs {
    /// The proxy to inspect. Defaults to the configured hijack proxy.
    #[arg(value_name = "PROXY")]
    proxy: Option<Address>,
}

impl ProbeArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let proxy = self
            .proxy
            .or(config.hijack.proxy)
            .ok_or_else(|| eyre::eyre!("no proxy given and `hijack.proxy` is not configured"))?;

        let ledger = utils::connect(&config.rpc_url).await?;
        let lineage = lineage(&ledger, proxy).await?;
        let admin = probe_admin(&ledger, proxy).await?;
        let beacon = probe_beacon(&ledger, proxy).await?;

        if global.json {
            let report = serde_json::json!({ "lineage": lineage, "admin": admin, "beacon": beacon });
            return utils::print_json(&report);
        }
        println!("Proxy:          {proxy}");
        println!("Implementation: {}", lineage.implementation);
        match lineage.owner {
            Some(owner) => println!("Owner:          {owner}"),
            None => println!("Owner:          unknown"),
        }
        println!("Admin:          {admin}");
        println!("Beacon:         {beacon}");
        Ok(())
    }
}
