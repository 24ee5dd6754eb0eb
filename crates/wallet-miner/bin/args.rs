use crate::cmd::{
    fetch::FetchArgs, hijack::HijackArgs, mine::MineArgs, predict::PredictArgs, probe::ProbeArgs,
    replay::ReplayArgs, run::RunArgs,
};
use alloy_primitives::Address;
use clap::{Parser, Subcommand, ValueHint};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use wallet_miner_config::Config;

/// Replay historical deployments, mine a wallet onto a dormant address and take over
/// uninitialized implementations.
#[derive(Parser)]
#[command(name = "wallet-miner", version, next_display_order = None)]
pub struct WalletMiner {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: WalletMinerSubcommand,
}

#[derive(Subcommand)]
pub enum WalletMinerSubcommand {
    /// Fetch historical transactions by hash and store them as replayable records.
    Fetch(FetchArgs),

    /// Replay the stored records, in order, on the ledger.
    Replay(ReplayArgs),

    /// Predict the next deployment address and how many attempts the target is away.
    Predict(PredictArgs),

    /// Deploy wallets through the factory until one lands on the target address.
    Mine(MineArgs),

    /// Read the EIP-1967 slots of a proxy.
    #[command(visible_alias = "impl")]
    Probe(ProbeArgs),

    /// Claim the uninitialized implementation behind a proxy.
    Hijack(HijackArgs),

    /// Replay, mine and hijack in one go.
    Run(RunArgs),
}

/// Options shared by every subcommand. They override the config file.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct GlobalArgs {
    /// Path to the config file.
    #[arg(long, short, global = true, value_hint = ValueHint::FilePath, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The RPC endpoint of the ledger.
    #[arg(long, short, global = true, env = "ETH_RPC_URL", value_name = "URL")]
    pub rpc_url: Option<String>,

    /// The account sending every non-replayed transaction. Must be unlocked on the ledger.
    #[arg(long, short, global = true, value_name = "ADDRESS")]
    pub from: Option<Address>,

    /// Print results as JSON.
    #[arg(long, short, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    /// Loads the config and applies the command line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_file(path)
                .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
            None => Config::load()?,
        };
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url.clone_from(rpc_url);
        }
        if let Some(from) = self.from {
            config.sender = Some(from);
        }
        Ok(config)
    }
}
