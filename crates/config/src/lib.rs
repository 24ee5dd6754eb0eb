//! # wallet-miner-config
//!
//! Configuration for the replay, mining and hijack stages.
//!
//! Values are resolved, lowest precedence first, from [`Config::default`], the
//! `wallet-miner.toml` file at the project root (or the file named by `WALLET_MINER_CONFIG`) and
//! `WALLET_MINER_`-prefixed environment variables. Nested keys use a double underscore:
//! `WALLET_MINER_MINING__MAX_ATTEMPTS=200`.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use alloy_primitives::{Address, B256, Bytes, TxHash, U256, address, b256};
use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
pub use error::{ExtractConfigError, MissingValue};

/// The historical deployer of the Safe master copy and proxy factory.
pub const SAFE_DEPLOYER: Address = address!("1aa7451DD11b8cb16AC089ED7fE05eFa00100A6A");
/// Safe master copy v1.1.1, deployed by [`SAFE_DEPLOYER`] at nonce 0.
pub const SAFE_MASTER_COPY: Address = address!("34CfAC646f301356fAa8B21e94227e3583Fe3F5F");
/// Safe proxy factory v1.1.1, deployed by [`SAFE_DEPLOYER`] at nonce 2.
pub const SAFE_PROXY_FACTORY: Address = address!("76E2cFc1F5Fa8F6a5b3fC4c8F4788F0116861F9B");
/// The pre-funded deposit address that has no code yet.
pub const DEPOSIT_ADDRESS: Address = address!("9b6fb606a9f5789444c17768c6dfcf2f83563801");

/// Mainnet transactions of [`SAFE_DEPLOYER`] with nonces 0, 1 and 2.
pub const SAFE_DEPLOYMENT_TXS: [TxHash; 3] = [
    b256!("06d2fa464546e99d2147e1fc997ddb624cec9c8c5e25a050cc381ee8a384eed3"),
    b256!("31ae8a26075d0f18b81d3abe2ad8aeca8816c97aff87728f2b10af0241e9b3d4"),
    b256!("75a42f240d229518979199f56cd7c82e4fc1f1a20ad9a4864c635354b4a34261"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint of the ledger everything is replayed on and mined against.
    pub rpc_url: String,
    /// Account used for every non-replayed transaction. Must be unlocked on the ledger.
    pub sender: Option<Address>,
    pub replay: ReplayConfig,
    pub mining: MiningConfig,
    pub hijack: HijackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            sender: None,
            replay: ReplayConfig::default(),
            mining: MiningConfig::default(),
            hijack: HijackConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// JSON file holding the ordered records.
    pub records: PathBuf,
    /// Endpoint of a chain that still has the historical transactions, used by `fetch`.
    pub history_rpc_url: Option<String>,
    /// Hashes fetched from `history_rpc_url`, in replay order.
    pub tx_hashes: Vec<TxHash>,
    /// Balance given to every replayed sender before its first record, so that it can pay gas.
    pub fund: Option<U256>,
    /// Accounts that must carry code once the whole sequence is replayed.
    pub targets: Vec<Address>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            records: PathBuf::from("records.json"),
            history_rpc_url: None,
            tx_hashes: SAFE_DEPLOYMENT_TXS.to_vec(),
            // 0.1 ether
            fund: Some(U256::from(100_000_000_000_000_000u128)),
            targets: vec![SAFE_MASTER_COPY, SAFE_PROXY_FACTORY],
        }
    }
}

/// Which factory entry point creates the proxies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationScheme {
    /// `createProxy(masterCopy, data)`: plain `CREATE`, the address follows the factory nonce.
    #[default]
    Nonce,
    /// `createProxyWithNonce(masterCopy, initializer, saltNonce)`: `CREATE2`.
    Salted,
}

impl std::str::FromStr for CreationScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nonce" | "create" => Ok(Self::Nonce),
            "salted" | "create2" => Ok(Self::Salted),
            _ => Err(format!("unknown creation scheme `{s}`, expected `nonce` or `salted`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub factory: Address,
    pub master_copy: Address,
    /// The address the mined proxy has to land on.
    pub target: Address,
    pub max_attempts: u64,
    pub scheme: CreationScheme,
    /// Owners of the new wallet. Defaults to the sender.
    pub owners: Vec<Address>,
    pub threshold: u64,
    /// Contract delegate-called by the wallet during setup.
    pub module: Address,
    /// Calldata of the setup delegate call.
    pub subcall: Bytes,
    /// First salt nonce tried by the `salted` scheme.
    pub salt_start: u64,
    /// Proxy creation code, needed to predict `salted` addresses offline.
    pub proxy_creation_code: Option<Bytes>,
    pub gas_limit: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            factory: SAFE_PROXY_FACTORY,
            master_copy: SAFE_MASTER_COPY,
            target: DEPOSIT_ADDRESS,
            max_attempts: 100,
            scheme: CreationScheme::Nonce,
            owners: Vec::new(),
            threshold: 1,
            module: Address::ZERO,
            subcall: Bytes::new(),
            salt_start: 0,
            proxy_creation_code: None,
            gas_limit: 10_000_000,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HijackConfig {
    /// Proxy whose implementation gets taken over.
    pub proxy: Option<Address>,
    /// `init` arguments claiming the implementation.
    pub wards: Vec<Address>,
    pub aims: Vec<Address>,
    /// Implementation the hijacked one is upgraded to.
    pub new_implementation: Address,
    /// Calldata executed on `new_implementation` during the upgrade.
    pub upgrade_call: Bytes,
    /// Storage slot holding the initialization marker byte.
    pub initializer_slot: B256,
    /// Byte offset of the marker inside the slot, counted from the low-order end.
    pub initializer_offset: usize,
    /// Gas limit of the takeover calls. Falls back to `mining.gas_limit`.
    pub gas_limit: Option<u64>,
}

impl Config {
    /// The default config file name.
    pub const FILE_NAME: &'static str = "wallet-miner.toml";

    /// Environment variable overriding the config file location.
    pub const CONFIG_ENV: &'static str = "WALLET_MINER_CONFIG";

    /// Loads the config relative to the current directory.
    pub fn load() -> Result<Self, ExtractConfigError> {
        Self::load_with_root(".")
    }

    pub fn load_with_root(root: impl AsRef<Path>) -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment_with_root(root))
    }

    /// Loads the config from an explicit file, ignoring [`Config::CONFIG_ENV`].
    pub fn load_file(file: impl AsRef<Path>) -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment_with_file(file))
    }

    /// Returns the [`Figment`] that [`Config::load_with_root`] extracts from.
    pub fn figment_with_root(root: impl AsRef<Path>) -> Figment {
        let file = std::env::var_os(Self::CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| root.as_ref().join(Self::FILE_NAME));
        Self::figment_with_file(file)
    }

    pub fn figment_with_file(file: impl AsRef<Path>) -> Figment {
        let file = file.as_ref();
        trace!(file = %file.display(), "resolving config");
        Figment::from(Self::default())
            .merge(Toml::file(file))
            .merge(Env::prefixed("WALLET_MINER_").ignore(&["CONFIG"]).split("__"))
    }

    /// Attempts to extract a `Config` from `provider`.
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        Figment::from(provider).extract::<Self>().map_err(ExtractConfigError::new)
    }

    /// The sender, or an error naming the missing key.
    pub fn sender(&self) -> Result<Address, MissingValue> {
        self.sender.ok_or(MissingValue("sender"))
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("wallet-miner defaults")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
