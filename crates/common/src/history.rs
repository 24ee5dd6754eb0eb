//! Sourcing [`SignedTransactionRecord`]s: fetched once from a historical chain, then stored as
//! JSON next to the config.

use crate::{RecordError, SignedTransactionRecord};
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use alloy_transport::TransportError;
use std::{fs, io, path::Path};

/// Failures while fetching, loading or saving records.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The node does not know the transaction.
    #[error("transaction {0} not found")]
    NotFound(TxHash),
    /// Only legacy transactions are recorded.
    #[error("transaction {0} is not a legacy transaction and cannot be replayed verbatim")]
    NotLegacy(TxHash),
    /// A record failed its signature check.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// A JSON-RPC request failed.
    #[error(transparent)]
    Rpc(#[from] TransportError),
    /// Reading or writing the records file failed.
    #[error("failed to access records file: {0}")]
    Io(#[from] io::Error),
    /// The records file is not a JSON array of records.
    #[error("malformed records file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fetches the given transactions, in order, from a node that still has them.
pub async fn fetch_records<P: Provider>(
    provider: &P,
    hashes: &[TxHash],
) -> Result<Vec<SignedTransactionRecord>, HistoryError> {
    let mut records = Vec::with_capacity(hashes.len());
    for &hash in hashes {
        let tx =
            provider.get_transaction_by_hash(hash).await?.ok_or(HistoryError::NotFound(hash))?;
        let sender = tx.inner.signer();
        let signed = tx.inner.inner().as_legacy().ok_or(HistoryError::NotLegacy(hash))?;
        let record = SignedTransactionRecord::from_signed(sender, signed);
        record.verify_sender()?;
        debug!(%hash, %sender, nonce = record.nonce, "fetched historical transaction");
        records.push(record);
    }
    Ok(records)
}

/// Reads the records at `path` and checks every signature against its sender.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<SignedTransactionRecord>, HistoryError> {
    let path = path.as_ref();
    trace!(path = %path.display(), "loading records");
    let records: Vec<SignedTransactionRecord> = serde_json::from_slice(&fs::read(path)?)?;
    for record in &records {
        record.verify_sender()?;
    }
    Ok(records)
}

/// Writes `records` to `path` as pretty-printed JSON.
pub fn save_records(
    path: impl AsRef<Path>,
    records: &[SignedTransactionRecord],
) -> Result<(), HistoryError> {
    fs::write(path, serde_json::to_vec_pretty(records)?)?;
    Ok(())
}
