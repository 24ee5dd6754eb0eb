//! Mining a proxy deployment onto a target address.
//!
//! Every attempt is a real creation call through the factory. The resulting address is read back
//! from the factory's creation event; [`predict`] and [`distance`] only report expectations.

use alloy_primitives::{Address, B256, Bytes, Log, U256, keccak256};
use alloy_sol_types::{SolCall, SolEvent};
use serde::Serialize;
use wallet_miner_common::{
    CallRequest, LedgerClient, LedgerError, Receipt, Submission,
    abi::{IProxyFactory, ISafe},
};
use wallet_miner_config::MiningConfig;

pub use wallet_miner_config::CreationScheme;

#[derive(Debug, thiserror::Error)]
pub enum MiningError {
    #[error("no deployment matched the target within {attempts} attempts")]
    ExhaustedBudget { attempts: u64 },
    #[error("attempt {attempt} was rejected by the ledger: {source}")]
    LedgerRejected {
        attempt: u64,
        #[source]
        source: LedgerError,
    },
    #[error("attempt {attempt} emitted no creation event")]
    MissingCreationEvent { attempt: u64 },
    #[error("attempt {attempt} emitted {count} creation events, expected exactly one")]
    AmbiguousCreationEvent { attempt: u64, count: usize },
    #[error("predicting salted deployments requires the proxy creation code")]
    MissingCreationCode,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Where a creation event carries the new address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogSchema {
    pub topic: B256,
    /// Byte offset of the address inside the log data.
    pub offset: usize,
}

impl LogSchema {
    /// `ProxyCreation(address)` of the Safe v1.1.1 factory: the address is the only, unindexed
    /// parameter, right-aligned in the first data word.
    pub const PROXY_CREATION: Self =
        Self { topic: IProxyFactory::ProxyCreation::SIGNATURE_HASH, offset: 12 };

    pub fn decode(&self, log: &Log) -> Option<Address> {
        let end = self.offset.checked_add(20)?;
        let data = log.data.data.get(self.offset..end)?;
        Some(Address::from_slice(data))
    }

    /// The address carried by the single matching event `emitter` put in `receipt`.
    pub fn created_address(
        &self,
        receipt: &Receipt,
        emitter: Address,
        attempt: u64,
    ) -> Result<Address, MiningError> {
        let events: Vec<_> = receipt.logs_matching(emitter, self.topic).collect();
        match events.as_slice() {
            [] => Err(MiningError::MissingCreationEvent { attempt }),
            [log] => self.decode(log).ok_or(MiningError::MissingCreationEvent { attempt }),
            logs => Err(MiningError::AmbiguousCreationEvent { attempt, count: logs.len() }),
        }
    }
}

impl Default for LogSchema {
    fn default() -> Self {
        Self::PROXY_CREATION
    }
}

/// A Safe proxy deployment request with one mutable field, [`DeploymentTemplate::salt`].
///
/// Under [`CreationScheme::Nonce`] the deployed address only depends on the factory nonce and the
/// salt never reaches the ledger. Under [`CreationScheme::Salted`] the salt is free-form data
/// turned into the salt nonce by [`DeploymentTemplate::salt_nonce`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentTemplate {
    pub factory: Address,
    pub master_copy: Address,
    pub owners: Vec<Address>,
    pub threshold: U256,
    /// Contract the new wallet delegate-calls during setup.
    pub module: Address,
    /// Calldata of that delegate call.
    pub subcall: Bytes,
    pub fallback_handler: Address,
    pub payment_token: Address,
    pub payment: U256,
    pub payment_receiver: Address,
    pub scheme: CreationScheme,
    pub salt: Bytes,
}

impl DeploymentTemplate {
    /// A single-owner wallet of `owner` that delegate-calls `module` with `subcall` on setup.
    pub fn new(
        factory: Address,
        master_copy: Address,
        owner: Address,
        module: Address,
        subcall: Bytes,
    ) -> Self {
        Self {
            factory,
            master_copy,
            owners: vec![owner],
            threshold: U256::from(1),
            module,
            subcall,
            fallback_handler: Address::ZERO,
            payment_token: Address::ZERO,
            payment: U256::ZERO,
            payment_receiver: owner,
            scheme: CreationScheme::Nonce,
            salt: Bytes::new(),
        }
    }

    /// The template described by `config`, owned by `sender` unless owners are configured.
    pub fn from_config(config: &MiningConfig, sender: Address) -> Self {
        let owners = if config.owners.is_empty() { vec![sender] } else { config.owners.clone() };
        Self {
            owners,
            threshold: U256::from(config.threshold),
            scheme: config.scheme,
            ..Self::new(
                config.factory,
                config.master_copy,
                sender,
                config.module,
                config.subcall.clone(),
            )
        }
    }

    pub fn with_scheme(mut self, scheme: CreationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// A copy with the mutable field replaced.
    pub fn with_salt(&self, salt: impl Into<Bytes>) -> Self {
        Self { salt: salt.into(), ..self.clone() }
    }

    /// The Safe `setup(...)` call the new proxy is initialized with.
    pub fn initializer(&self) -> Bytes {
        ISafe::setupCall {
            owners: self.owners.clone(),
            threshold: self.threshold,
            to: self.module,
            data: self.subcall.clone(),
            fallbackHandler: self.fallback_handler,
            paymentToken: self.payment_token,
            payment: self.payment,
            paymentReceiver: self.payment_receiver,
        }
        .abi_encode()
        .into()
    }

    /// The `saltNonce` of a salted creation. Salts longer than a word are hashed.
    pub fn salt_nonce(&self) -> U256 {
        U256::try_from_be_slice(&self.salt)
            .unwrap_or_else(|| U256::from_be_bytes(keccak256(&self.salt).0))
    }

    /// Whether a non-empty salt is set that the factory call never carries.
    pub fn ignores_salt(&self) -> bool {
        self.scheme == CreationScheme::Nonce && !self.salt.is_empty()
    }

    /// Calldata of the factory call deploying this template.
    pub fn creation_call(&self) -> Bytes {
        let call = match self.scheme {
            CreationScheme::Nonce => IProxyFactory::createProxyCall {
                masterCopy: self.master_copy,
                data: self.initializer(),
            }
            .abi_encode(),
            CreationScheme::Salted => IProxyFactory::createProxyWithNonceCall {
                masterCopy: self.master_copy,
                initializer: self.initializer(),
                saltNonce: self.salt_nonce(),
            }
            .abi_encode(),
        };
        call.into()
    }

    /// Address this template deploys to while the factory is at `factory_nonce`.
    ///
    /// `proxy_creation_code` is only needed for [`CreationScheme::Salted`].
    pub fn predict_at(
        &self,
        factory_nonce: u64,
        proxy_creation_code: Option<&[u8]>,
    ) -> Result<Address, MiningError> {
        match self.scheme {
            CreationScheme::Nonce => Ok(self.factory.create(factory_nonce)),
            CreationScheme::Salted => {
                let code = proxy_creation_code.ok_or(MiningError::MissingCreationCode)?;
                let salt_nonce = self.salt_nonce().to_be_bytes::<32>();
                let salt =
                    keccak256([keccak256(self.initializer()).as_slice(), &salt_nonce].concat());
                let init_code_hash =
                    keccak256([code, self.master_copy.into_word().as_slice()].concat());
                Ok(self.factory.create2(salt, init_code_hash))
            }
        }
    }
}

/// Perturbation producing consecutive 32 byte salt nonces, starting at `start`.
pub fn sequential_salts(start: u64) -> impl Fn(u64) -> Bytes {
    move |attempt| {
        let nonce = U256::from(start) + U256::from(attempt);
        Bytes::from(nonce.to_be_bytes::<32>())
    }
}

/// Outcome of a mining run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MinedAddress {
    pub address: Address,
    /// Zero-based index of the attempt that produced `address`.
    pub attempt: u64,
    pub success: bool,
}

/// Predicts where `template` deploys next, without submitting anything.
pub async fn predict<L: LedgerClient + ?Sized>(
    ledger: &L,
    template: &DeploymentTemplate,
    proxy_creation_code: Option<&[u8]>,
) -> Result<Address, MiningError> {
    let nonce = ledger.nonce(template.factory).await?;
    template.predict_at(nonce, proxy_creation_code)
}

/// Number of attempts [`AddressMiner::mine`] needs before it reaches `target`, if it does so
/// within `max_attempts`.
///
/// Assumes nothing else deploys through the factory in between.
pub async fn distance<L: LedgerClient + ?Sized>(
    ledger: &L,
    template: &DeploymentTemplate,
    perturb: impl Fn(u64) -> Bytes,
    target: Address,
    max_attempts: u64,
    proxy_creation_code: Option<&[u8]>,
) -> Result<Option<u64>, MiningError> {
    let nonce = ledger.nonce(template.factory).await?;
    for attempt in 0..max_attempts {
        let candidate = template.with_salt(perturb(attempt));
        if candidate.predict_at(nonce + attempt, proxy_creation_code)? == target {
            return Ok(Some(attempt));
        }
    }
    Ok(None)
}

/// Submits creation calls until one lands on the target.
#[derive(Debug)]
pub struct AddressMiner<'a, L: ?Sized> {
    ledger: &'a L,
    from: Address,
    schema: LogSchema,
    gas_limit: Option<u64>,
}

impl<'a, L: LedgerClient + ?Sized> AddressMiner<'a, L> {
    pub fn new(ledger: &'a L, from: Address) -> Self {
        Self { ledger, from, schema: LogSchema::default(), gas_limit: None }
    }

    pub fn with_schema(mut self, schema: LogSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Deploys `template`, perturbed by `perturb(attempt)`, for attempts `0..max_attempts` and
    /// stops at the first deployment whose address equals `target`.
    ///
    /// Every attempt leaves a deployed proxy behind, including on failure. Under
    /// [`CreationScheme::Nonce`] the perturbation is ignored and only the factory nonce moves.
    pub async fn mine(
        &self,
        template: &DeploymentTemplate,
        perturb: impl Fn(u64) -> Bytes,
        target: Address,
        max_attempts: u64,
    ) -> Result<MinedAddress, MiningError> {
        let mut ignored_salt_reported = false;
        for attempt in 0..max_attempts {
            let candidate = template.with_salt(perturb(attempt));
            if candidate.ignores_salt() && !ignored_salt_reported {
                warn!(
                    attempt,
                    "createProxy takes no salt, the perturbation is ignored and only the factory \
                     nonce changes the address"
                );
                ignored_salt_reported = true;
            }
            let address = self.attempt(&candidate, attempt).await?;
            if address == target {
                info!(attempt, %address, "mined target address");
                return Ok(MinedAddress { address, attempt, success: true });
            }
            debug!(attempt, %address, "deployment missed target");
        }
        Err(MiningError::ExhaustedBudget { attempts: max_attempts })
    }

    async fn attempt(
        &self,
        candidate: &DeploymentTemplate,
        attempt: u64,
    ) -> Result<Address, MiningError> {
        let mut request = CallRequest::new(self.from, candidate.factory, candidate.creation_call());
        request.gas_limit = self.gas_limit;

        let receipt = self
            .ledger
            .submit(Submission::Call(request))
            .await
            .map_err(|source| MiningError::LedgerRejected { attempt, source })?;
        if !receipt.status {
            let source = LedgerError::Rejected(format!("creation {} reverted", receipt.tx_hash));
            return Err(MiningError::LedgerRejected { attempt, source });
        }
        self.schema.created_address(&receipt, candidate.factory, attempt)
    }
}
