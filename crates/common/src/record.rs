//! Pre-signed historical transactions.

use alloy_consensus::{SignableTransaction, Signed, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, Signature, TxHash, TxKind, U256};
use serde::{Deserialize, Serialize};

/// Errors raised while checking a [`SignedTransactionRecord`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The signature does not recover to any address.
    #[error("failed to recover signer of {hash}: {reason}")]
    Recovery {
        /// Hash of the record.
        hash: TxHash,
        /// Why recovery failed.
        reason: String,
    },
    /// The signature recovers to another address than the recorded sender.
    #[error("record {hash} claims sender {claimed} but is signed by {recovered}")]
    SenderMismatch {
        /// Hash of the record.
        hash: TxHash,
        /// [`SignedTransactionRecord::sender`].
        claimed: Address,
        /// The actual signer.
        recovered: Address,
    },
}

/// A historical legacy transaction, replayed verbatim.
///
/// The record is never re-signed: the signature covers the original chain id (or none at all
/// for pre-EIP-155 transactions), the gas fields and the payload, so every field here is part
/// of what gets broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransactionRecord {
    /// The signer.
    pub sender: Address,
    /// The sender's nonce at the time of signing.
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
    /// `None` for contract creations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Calldata, or init code for creations.
    #[serde(default)]
    pub input: Bytes,
    /// Wei transferred.
    #[serde(default)]
    pub value: U256,
    /// Legacy gas price in wei.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_price: u128,
    /// Gas limit.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    #[serde(default, with = "alloy_serde::quantity::opt", skip_serializing_if = "Option::is_none")]
    /// `None` for pre-EIP-155 transactions, which replay on any chain.
    pub chain_id: Option<u64>,
    /// The original signature.
    pub signature: Signature,
}

impl SignedTransactionRecord {
    /// Builds a record from an already signed legacy transaction and its known sender.
    pub fn from_signed(sender: Address, signed: &Signed<TxLegacy>) -> Self {
        let tx = signed.tx();
        Self {
            sender,
            nonce: tx.nonce,
            to: tx.to.to().copied(),
            input: tx.input.clone(),
            value: tx.value,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            chain_id: tx.chain_id,
            signature: *signed.signature(),
        }
    }

    /// Whether the record deploys a contract.
    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Address the record deploys to, if it is a creation.
    pub fn expected_deployment(&self) -> Option<Address> {
        self.is_creation().then(|| self.sender.create(self.nonce))
    }

    fn unsigned(&self) -> TxLegacy {
        TxLegacy {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to.map_or(TxKind::Create, TxKind::Call),
            value: self.value,
            input: self.input.clone(),
        }
    }

    /// The legacy transaction with its original signature.
    pub fn signed(&self) -> Signed<TxLegacy> {
        self.unsigned().into_signed(self.signature)
    }

    /// The raw bytes accepted by `eth_sendRawTransaction`.
    pub fn encoded_2718(&self) -> Vec<u8> {
        TxEnvelope::Legacy(self.signed()).encoded_2718()
    }

    /// The historical transaction hash.
    pub fn hash(&self) -> TxHash {
        *self.signed().hash()
    }

    /// Checks that the signature actually recovers to [`Self::sender`].
    pub fn verify_sender(&self) -> Result<(), RecordError> {
        let signed = self.signed();
        let hash = *signed.hash();
        let recovered = signed
            .recover_signer()
            .map_err(|err| RecordError::Recovery { hash, reason: err.to_string() })?;
        if recovered != self.sender {
            return Err(RecordError::SenderMismatch { hash, claimed: self.sender, recovered });
        }
        Ok(())
    }
}
