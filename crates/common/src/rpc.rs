//! [`LedgerClient`] over JSON-RPC.

use crate::{CallRequest, LedgerClient, LedgerError, Receipt, Submission};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use alloy_transport::TransportError;
use async_trait::async_trait;

/// A ledger reached through an alloy [`Provider`], typically a local anvil node.
#[derive(Clone, Debug)]
pub struct RpcLedger<P> {
    provider: P,
}

impl<P: Provider> RpcLedger<P> {
    /// Wraps `provider`. Calls are signed by the node, so senders must be unlocked or
    /// impersonated.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Turns a broadcast rejection into [`LedgerError::NonceMismatch`] when the node complains
    /// about the nonce, re-querying the sender's current nonce for the report.
    async fn classify(&self, sender: Address, got: u64, err: TransportError) -> LedgerError {
        if is_nonce_rejection(&err.to_string()) {
            match self.provider.get_transaction_count(sender).await {
                Ok(expected) => return LedgerError::NonceMismatch { sender, expected, got },
                Err(lookup) => debug!(%sender, %lookup, "failed to query nonce after rejection"),
            }
        }
        LedgerError::Rpc(err)
    }
}

/// Whether a node's rejection message complains about the transaction nonce, as in geth's
/// `nonce too low` or anvil's `nonce too high`.
fn is_nonce_rejection(message: &str) -> bool {
    message.to_ascii_lowercase().contains("nonce")
}

fn into_request(call: CallRequest) -> TransactionRequest {
    let CallRequest { from, to, input, value, gas_limit } = call;
    let tx = TransactionRequest::default().from(from).to(to).value(value).input(input.into());
    match gas_limit {
        Some(gas) => tx.gas_limit(gas),
        None => tx,
    }
}

fn from_rpc_receipt(receipt: TransactionReceipt) -> Receipt {
    Receipt {
        tx_hash: receipt.transaction_hash,
        status: receipt.status(),
        created_address: receipt.contract_address,
        logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
    }
}

#[async_trait]
impl<P> LedgerClient for RpcLedger<P>
where
    P: Provider + Send + Sync,
{
    async fn submit(&self, submission: Submission) -> Result<Receipt, LedgerError> {
        let pending = match submission {
            Submission::Replay(record) => {
                trace!(hash = %record.hash(), sender = %record.sender, nonce = record.nonce, "broadcasting raw transaction");
                match self.provider.send_raw_transaction(&record.encoded_2718()).await {
                    Ok(pending) => pending,
                    Err(err) => return Err(self.classify(record.sender, record.nonce, err).await),
                }
            }
            Submission::Call(call) => {
                trace!(from = %call.from, to = %call.to, "sending transaction");
                self.provider.send_transaction(into_request(call)).await?
            }
        };
        let receipt = pending.get_receipt().await?;
        Ok(from_rpc_receipt(receipt))
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, LedgerError> {
        Ok(self.provider.call(into_request(request)).await?)
    }

    async fn code(&self, address: Address) -> Result<Bytes, LedgerError> {
        Ok(self.provider.get_code_at(address).await?)
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, LedgerError> {
        let value = self.provider.get_storage_at(address, slot.into()).await?;
        Ok(B256::from(value.to_be_bytes::<32>()))
    }

    async fn nonce(&self, address: Address) -> Result<u64, LedgerError> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    async fn set_balance(&self, address: Address, balance: U256) -> Result<(), LedgerError> {
        self.provider.raw_request::<_, ()>("anvil_setBalance".into(), (address, balance)).await?;
        Ok(())
    }
}
