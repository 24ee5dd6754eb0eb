use alloy_provider::DynProvider;
use wallet_miner_common::{RpcLedger, provider};

/// Installs the global tracing subscriber, filtered by `RUST_LOG`.
pub fn subscriber() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

pub async fn connect(url: &str) -> eyre::Result<RpcLedger<DynProvider>> {
    Ok(RpcLedger::new(provider::connect(url).await?))
}

/// Prints `value` as pretty JSON.
pub fn print_json(value: &impl serde::Serialize) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
