//! Raw storage reads of upgradeable proxies.

use alloy_primitives::{Address, B256};
use alloy_sol_types::SolCall;
use serde::Serialize;
use wallet_miner_common::{
    CallRequest, LedgerClient, LedgerError,
    abi::IAuthorizer,
    slots::{ADMIN_SLOT, BEACON_SLOT, IMPLEMENTATION_SLOT},
};

/// Reads `slot` of `proxy` and decodes the word as an address.
pub async fn probe_slot<L: LedgerClient + ?Sized>(
    ledger: &L,
    proxy: Address,
    slot: B256,
) -> Result<Address, LedgerError> {
    let word = ledger.storage_at(proxy, slot).await?;
    let address = Address::from_word(word);
    trace!(%proxy, %slot, %address, "probed slot");
    Ok(address)
}

/// The EIP-1967 implementation of `proxy`, or the zero address if none is set.
///
/// Only storage is read; the proxy's own accessors are never called.
pub async fn probe_implementation<L: LedgerClient + ?Sized>(
    ledger: &L,
    proxy: Address,
) -> Result<Address, LedgerError> {
    probe_slot(ledger, proxy, IMPLEMENTATION_SLOT).await
}

pub async fn probe_admin<L: LedgerClient + ?Sized>(
    ledger: &L,
    proxy: Address,
) -> Result<Address, LedgerError> {
    probe_slot(ledger, proxy, ADMIN_SLOT).await
}

pub async fn probe_beacon<L: LedgerClient + ?Sized>(
    ledger: &L,
    proxy: Address,
) -> Result<Address, LedgerError> {
    probe_slot(ledger, proxy, BEACON_SLOT).await
}

/// A proxy, the implementation it points at and its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProxyLineage {
    pub proxy: Address,
    pub implementation: Address,
    /// `None` if `owner()` reverted or returned less than a word.
    pub owner: Option<Address>,
}

/// Recomputes the lineage of `proxy` from the ledger.
pub async fn lineage<L: LedgerClient + ?Sized>(
    ledger: &L,
    proxy: Address,
) -> Result<ProxyLineage, LedgerError> {
    let implementation = probe_implementation(ledger, proxy).await?;
    let owner = owner_of(ledger, proxy).await;
    Ok(ProxyLineage { proxy, implementation, owner })
}

async fn owner_of<L: LedgerClient + ?Sized>(ledger: &L, account: Address) -> Option<Address> {
    let input = IAuthorizer::ownerCall {}.abi_encode();
    match ledger.call(CallRequest::new(Address::ZERO, account, input)).await {
        Ok(output) if output.len() >= 32 => {
            Some(Address::from_word(B256::from_slice(&output[..32])))
        }
        Ok(output) => {
            debug!(%account, len = output.len(), "owner() returned less than a word");
            None
        }
        Err(err) => {
            debug!(%account, %err, "owner() failed");
            None
        }
    }
}
