//! The ledger boundary.
//!
//! Everything the wallet-miner core knows about chain state comes through [`LedgerClient`]. The
//! client is the only owner of account state; callers never cache what it returns.

use crate::SignedTransactionRecord;
use alloy_primitives::{Address, B256, Bytes, Log, TxHash, U256};
use alloy_provider::PendingTransactionError;
use alloy_transport::TransportError;
use async_trait::async_trait;

/// A transaction sent from an account the ledger can sign for (unlocked or impersonated).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallRequest {
    /// Account the ledger signs for.
    pub from: Address,
    /// Callee.
    pub to: Address,
    /// Calldata.
    pub input: Bytes,
    /// Wei sent along with the call.
    pub value: U256,
    /// Gas limit of the transaction. `None` lets the ledger estimate it.
    pub gas_limit: Option<u64>,
}

impl CallRequest {
    /// A call from `from` to `to` without value or gas limit.
    pub fn new(from: Address, to: Address, input: impl Into<Bytes>) -> Self {
        Self { from, to, input: input.into(), ..Default::default() }
    }

    /// Sets the [`CallRequest::value`].
    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the [`CallRequest::gas_limit`].
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Something to include in the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// A historical, already signed transaction broadcast as-is.
    Replay(SignedTransactionRecord),
    /// A fresh call signed by the ledger on behalf of `from`.
    Call(CallRequest),
}

/// Outcome of an included [`Submission`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Hash of the included transaction.
    pub tx_hash: TxHash,
    /// `false` if execution reverted.
    pub status: bool,
    /// Address of the contract created by a creation transaction.
    pub created_address: Option<Address>,
    /// Logs in emission order.
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Logs emitted by `emitter` whose first topic is `topic`.
    pub fn logs_matching(&self, emitter: Address, topic: B256) -> impl Iterator<Item = &Log> {
        self.logs
            .iter()
            .filter(move |log| log.address == emitter && log.topics().first() == Some(&topic))
    }
}

/// Failures of a [`LedgerClient`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The submission's nonce is not the sender's next nonce.
    #[error("nonce mismatch for {sender}: ledger is at {expected}, submission carries {got}")]
    NonceMismatch {
        /// The account whose nonce did not match.
        sender: Address,
        /// The sender's nonce on the ledger.
        expected: u64,
        /// The nonce the submission carried.
        got: u64,
    },
    /// The ledger refused the submission, e.g. for lack of funds.
    #[error("submission rejected: {0}")]
    Rejected(String),
    /// A JSON-RPC request failed.
    #[error(transparent)]
    Rpc(#[from] TransportError),
    /// Waiting for a receipt failed.
    #[error(transparent)]
    Pending(#[from] PendingTransactionError),
    /// The ledger lacks a capability, such as overriding balances.
    #[error("{0} is not supported by this ledger")]
    Unsupported(&'static str),
}

/// Serialized access to a ledger.
///
/// Submissions are applied strictly in the order they are made and each call resolves only once
/// its effects are visible to subsequent reads.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submits a transaction and waits for its inclusion.
    async fn submit(&self, submission: Submission) -> Result<Receipt, LedgerError>;

    /// Executes a read-only call against the latest state.
    async fn call(&self, request: CallRequest) -> Result<Bytes, LedgerError>;

    /// Runtime code of `address`, empty for accounts without code.
    async fn code(&self, address: Address) -> Result<Bytes, LedgerError>;

    /// Raw 32 byte word stored at `slot` of `address`.
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, LedgerError>;

    /// Number of transactions sent by `address`, or contracts created by it.
    async fn nonce(&self, address: Address) -> Result<u64, LedgerError>;

    /// Overrides an account balance. Only development ledgers support this.
    async fn set_balance(&self, address: Address, balance: U256) -> Result<(), LedgerError>;

    /// Whether `address` carries code.
    async fn has_code(&self, address: Address) -> Result<bool, LedgerError> {
        Ok(!self.code(address).await?.is_empty())
    }
}
