use crate::{args::GlobalArgs, utils};
use clap::{Parser, ValueHint};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use wallet_miner::Pipeline;
use wallet_miner_common::history::load_records;

/// CLI arguments for `wallet-miner run`.
#[derive(Clone, Debug, Parser)]
pub struct RunArgs {
    /// The records file. Defaults to the configured one.
    #[arg(value_hint = ValueHint::FilePath, value_name = "PATH")]
    records: Option<PathBuf>,
}

impl RunArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let path = self.records.unwrap_or_else(|| config.replay.records.clone());
        let records = load_records(&path)
            .wrap_err_with(|| format!("failed to load records from {}", path.display()))?;

        let ledger = utils::connect(&config.rpc_url).await?;
        let report = Pipeline::new(&ledger, &config).run(&records).await?;

        if global.json {
            return utils::print_json(&report);
        }
        println!("Replayed {} records", report.replay.applied.len());
        println!("Mined {} at attempt {}", report.mined.address, report.mined.attempt);
        if let Some(outcome) = report.hijack {
            println!("Claimed implementation {}", outcome.implementation);
        }
        Ok(())
    }
}
