//! Verbatim replay of historical signed transactions.
//!
//! Replaying is a one-shot reconstruction: records are applied one at a time and the first
//! failure stops the sequence, leaving everything applied before it in place.

use alloy_primitives::{Address, TxHash, U256};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use wallet_miner_common::{LedgerClient, LedgerError, SignedTransactionRecord, Submission};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("record {index} has nonce {nonce} for {sender}, which does not follow nonce {previous}")]
    OutOfOrder { index: usize, sender: Address, nonce: u64, previous: u64 },
    #[error(
        "record {index} carries nonce {got} for {sender} but the ledger is at {expected}; \
         the records were computed against a different starting state"
    )]
    NonceConflict { index: usize, sender: Address, expected: u64, got: u64 },
    #[error("record {index} should have deployed code to {expected}, got {}", display_actual(.actual))]
    UnexpectedDeploymentTarget { index: usize, expected: Address, actual: Option<Address> },
    #[error("record {index} ({tx_hash}) reverted")]
    Reverted { index: usize, tx_hash: TxHash },
    #[error("{0} has no code after the replay")]
    MissingCode(Address),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

fn display_actual(actual: &Option<Address>) -> String {
    actual.map_or_else(|| "no deployment".to_string(), |address| address.to_string())
}

/// A record that made it into the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRecord {
    pub index: usize,
    pub sender: Address,
    pub nonce: u64,
    pub tx_hash: TxHash,
    pub deployed: Option<Address>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: Vec<AppliedRecord>,
    /// Addresses that received code, in replay order.
    pub deployed: Vec<Address>,
}

/// Checks that the records of every sender carry strictly increasing nonces.
pub fn check_order(records: &[SignedTransactionRecord]) -> Result<(), ReplayError> {
    let mut last = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        if let Some(previous) = last.insert(record.sender, record.nonce)
            && record.nonce <= previous
        {
            return Err(ReplayError::OutOfOrder {
                index,
                sender: record.sender,
                nonce: record.nonce,
                previous,
            });
        }
    }
    Ok(())
}

/// Applies [`SignedTransactionRecord`]s to a ledger, in order.
#[derive(Debug)]
pub struct Replayer<'a, L: ?Sized> {
    ledger: &'a L,
    targets: Vec<Address>,
    funding: Option<U256>,
}

impl<'a, L: LedgerClient + ?Sized> Replayer<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger, targets: Vec::new(), funding: None }
    }

    /// Accounts that must carry code once every record is applied.
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = Address>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Sets the balance of every sender to `amount` right before its first record.
    pub fn with_funding(mut self, amount: impl Into<Option<U256>>) -> Self {
        self.funding = amount.into();
        self
    }

    pub async fn replay(
        &self,
        records: &[SignedTransactionRecord],
    ) -> Result<ReplaySummary, ReplayError> {
        check_order(records)?;

        let mut summary = ReplaySummary::default();
        let mut funded = HashSet::new();
        for (index, record) in records.iter().enumerate() {
            let sender = record.sender;
            if let Some(amount) = self.funding
                && funded.insert(sender)
            {
                debug!(%sender, %amount, "funding sender");
                self.ledger.set_balance(sender, amount).await?;
            }

            let expected = self.ledger.nonce(sender).await?;
            if expected != record.nonce {
                return Err(ReplayError::NonceConflict {
                    index,
                    sender,
                    expected,
                    got: record.nonce,
                });
            }

            let applied = self.apply(index, record).await?;
            if let Some(address) = applied.deployed {
                summary.deployed.push(address);
            }
            summary.applied.push(applied);
        }

        for &target in &self.targets {
            if !self.ledger.has_code(target).await? {
                return Err(ReplayError::MissingCode(target));
            }
        }
        info!(
            records = summary.applied.len(),
            deployed = summary.deployed.len(),
            "replay finished"
        );
        Ok(summary)
    }

    async fn apply(
        &self,
        index: usize,
        record: &SignedTransactionRecord,
    ) -> Result<AppliedRecord, ReplayError> {
        let receipt =
            self.ledger.submit(Submission::Replay(record.clone())).await.map_err(|err| match err {
                LedgerError::NonceMismatch { sender, expected, got } => {
                    ReplayError::NonceConflict { index, sender, expected, got }
                }
                err => err.into(),
            })?;
        if !receipt.status {
            return Err(ReplayError::Reverted { index, tx_hash: receipt.tx_hash });
        }

        let deployed = match record.expected_deployment() {
            Some(expected) => {
                let actual = receipt.created_address;
                if actual != Some(expected) || !self.ledger.has_code(expected).await? {
                    return Err(ReplayError::UnexpectedDeploymentTarget { index, expected, actual });
                }
                Some(expected)
            }
            None => None,
        };
        debug!(index, sender = %record.sender, nonce = record.nonce, tx = %receipt.tx_hash, ?deployed, "replayed record");

        Ok(AppliedRecord {
            index,
            sender: record.sender,
            nonce: record.nonce,
            tx_hash: receipt.tx_hash,
            deployed,
        })
    }
}
