#[macro_use]
extern crate tracing;

use clap::Parser;
use eyre::Result;

mod args;
mod cmd;
mod handler;
mod utils;

use args::{WalletMiner, WalletMinerSubcommand};

fn main() -> Result<()> {
    handler::install();
    utils::subscriber();
    let args = WalletMiner::parse();
    main_args(args)
}

#[tokio::main]
async fn main_args(args: WalletMiner) -> Result<()> {
    let WalletMiner { global, cmd } = args;
    match cmd {
        WalletMinerSubcommand::Fetch(cmd) => cmd.run(&global).await,
        WalletMinerSubcommand::Replay(cmd) => cmd.run(&global).await,
        WalletMinerSubcommand::Predict(cmd) => cmd.run(&global).await,
        WalletMinerSubcommand::Mine(cmd) => cmd.run(&global).await,
        WalletMinerSubcommand::Probe(cmd) => cmd.run(&global).await,
        WalletMinerSubcommand::Hijack(cmd) => cmd.run(&global).await,
        WalletMinerSubcommand::Run(cmd) => cmd.run(&global).await,
    }
}
