use crate::{args::GlobalArgs, utils};
use alloy_primitives::Address;
use clap::{Parser, ValueHint};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use wallet_miner::Replayer;
use wallet_miner_common::history::load_records;

/// CLI arguments for `wallet-miner replay`.
#[derive(Clone, Debug, Parser)]
pub struct ReplayArgs {
    /// The records file. Defaults to the configured one.
    #[arg(value_hint = ValueHint::FilePath, value_name = "PATH")]
    records: Option<PathBuf>,

    /// Do not set the balance of replayed senders.
    #[arg(long)]
    no_fund: bool,

    /// Account that must have code afterwards, in addition to the configured ones.
    #[arg(long = "target", value_name = "ADDRESS")]
    targets: Vec<Address>,
}

impl ReplayArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let path = self.records.unwrap_or(config.replay.records);
        let records = load_records(&path)
            .wrap_err_with(|| format!("failed to load records from {}", path.display()))?;

        let ledger = utils::connect(&config.rpc_url).await?;
        let funding = if self.no_fund { None } else { config.replay.fund };
        let summary = Replayer::new(&ledger)
            .with_targets(config.replay.targets.into_iter().chain(self.targets))
            .with_funding(funding)
            .replay(&records)
            .await?;

        if global.json {
            return utils::print_json(&summary);
        }
        for applied in &summary.applied {
            match applied.deployed {
                Some(address) => println!(
                    "{} {} nonce {} deployed {address}",
                    applied.tx_hash, applied.sender, applied.nonce
                ),
                None => println!("{} {} nonce {}", applied.tx_hash, applied.sender, applied.nonce),
            }
        }
        Ok(())
    }
}
