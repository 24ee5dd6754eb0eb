//! Commonly used helpers to construct `Provider`s

use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_transport::TransportResult;

/// Connects to `url`, prepending `http://` when no scheme is given (`localhost:8545`).
pub async fn connect(url: &str) -> TransportResult<DynProvider> {
    let url = normalize_url(url);
    debug!(%url, "connecting to ledger");
    Ok(ProviderBuilder::new().connect(&url).await?.erased())
}

fn normalize_url(url: &str) -> String {
    if url.contains("://") || url.ends_with(".ipc") { url.to_string() } else { format!("http://{url}") }
}
