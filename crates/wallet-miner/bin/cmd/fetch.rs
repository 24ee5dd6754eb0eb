use crate::args::GlobalArgs;
use alloy_primitives::TxHash;
use clap::{Parser, ValueHint};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use wallet_miner_common::{
    history::{fetch_records, save_records},
    provider,
};

/// CLI arguments for `wallet-miner fetch`.
#[derive(Clone, Debug, Parser)]
pub struct FetchArgs {
    /// Transaction hashes in replay order. Defaults to the configured ones.
    #[arg(value_name = "TX_HASH")]
    hashes: Vec<TxHash>,

    /// RPC endpoint of a chain that still has the transactions.
    #[arg(long, value_name = "URL")]
    history_rpc_url: Option<String>,

    /// Where to write the records. Defaults to the configured records file.
    #[arg(long, short, value_hint = ValueHint::FilePath, value_name = "PATH")]
    out: Option<PathBuf>,
}

impl FetchArgs {
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let url = self.history_rpc_url.or(config.replay.history_rpc_url).ok_or_else(|| {
            eyre::eyre!("no history RPC URL, pass --history-rpc-url or set `replay.history_rpc_url`")
        })?;
        let hashes = if self.hashes.is_empty() { config.replay.tx_hashes } else { self.hashes };
        let out = self.out.unwrap_or(config.replay.records);

        let provider = provider::connect(&url).await?;
        let records = fetch_records(&provider, &hashes).await?;
        save_records(&out, &records)
            .wrap_err_with(|| format!("failed to write records to {}", out.display()))?;

        if global.json {
            return crate::utils::print_json(&records);
        }
        for record in &records {
            println!("{} {} nonce {}", record.hash(), record.sender, record.nonce);
        }
        println!("Wrote {} records to {}", records.len(), out.display());
        Ok(())
    }
}
