//! The wallet mining world: the state of the ledger right before the Safe deployments are
//! replayed.

use crate::{
    MemoryLedger,
    programs::{Authorizer, Destructor, Erc1967Proxy, ProxyFactory, SafeMasterCopy, Sweeper, Token},
};
use alloy_primitives::{Address, B256, Bytes, Signature, U256, address, bytes};
use alloy_sol_types::SolCall;
use wallet_miner_common::{
    CallRequest, LedgerClient, LedgerError, SignedTransactionRecord, Submission,
    abi::{IAuthorizer, IERC20},
    slots::IMPLEMENTATION_SLOT,
};
use wallet_miner_config::{DEPOSIT_ADDRESS, SAFE_DEPLOYER, SAFE_PROXY_FACTORY};

/// Creation payload of the master copy record. Only its hash matters to [`MemoryLedger`].
pub const MASTER_COPY_CREATION: Bytes = bytes!("608060405234801561001057600080fd5b5001");
/// Creation payload of the proxy factory record.
pub const PROXY_FACTORY_CREATION: Bytes = bytes!("608060405234801561001057600080fd5b5002");

/// Tokens sitting at [`DEPOSIT_ADDRESS`] before the wallet is mined.
pub const DEPOSIT_TOKEN_AMOUNT: U256 = U256::from_limbs([0x2c28029094000000, 0x108b2a, 0, 0]);

/// The three records of [`SAFE_DEPLOYER`]: master copy creation, an unrelated transfer and the
/// proxy factory creation.
///
/// Signatures are placeholders, [`MemoryLedger`] does not recover senders.
pub fn safe_deployment_records() -> Vec<SignedTransactionRecord> {
    let record = |nonce, to, input| SignedTransactionRecord {
        sender: SAFE_DEPLOYER,
        nonce,
        to,
        input,
        value: U256::ZERO,
        gas_price: 1_000_000_000,
        gas_limit: 6_000_000,
        chain_id: None,
        signature: Signature::new(U256::from(nonce + 1), U256::from(nonce + 2), false),
    };
    vec![
        record(0, None, MASTER_COPY_CREATION),
        record(1, Some(address!("b4c79daB8f259C7Aee6E5b2Aa729821864227e84")), Bytes::new()),
        record(2, None, PROXY_FACTORY_CREATION),
    ]
}

/// Factory nonce whose `CREATE` address is [`DEPOSIT_ADDRESS`].
pub fn deposit_nonce() -> Option<u64> {
    (1..=100).find(|&nonce| SAFE_PROXY_FACTORY.create(nonce) == DEPOSIT_ADDRESS)
}

/// A [`MemoryLedger`] holding the token, the module, the initialized authorizer proxy and its
/// never initialized implementation. The Safe contracts only appear once
/// [`safe_deployment_records`] are replayed.
#[derive(Debug)]
pub struct WalletMiningWorld {
    pub ledger: MemoryLedger,
    pub records: Vec<SignedTransactionRecord>,
}

impl WalletMiningWorld {
    pub const PLAYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    pub const WARD: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
    pub const CHIEF: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    pub const TOKEN: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    pub const SWEEPER: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
    pub const DESTRUCTOR: Address = address!("Cf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9");
    pub const AUTHORIZER_IMPLEMENTATION: Address =
        address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
    pub const AUTHORIZER_PROXY: Address = address!("Dc64a140Aa3E981100a9becA4E685f962f0cF6C9");

    /// Pre-Cancun world.
    pub async fn new() -> Result<Self, LedgerError> {
        Self::build(MemoryLedger::new()).await
    }

    /// World whose `SELFDESTRUCT` keeps code in place.
    pub async fn cancun() -> Result<Self, LedgerError> {
        Self::build(MemoryLedger::cancun()).await
    }

    async fn build(ledger: MemoryLedger) -> Result<Self, LedgerError> {
        ledger.register_creation(&MASTER_COPY_CREATION, SafeMasterCopy);
        ledger.register_creation(&PROXY_FACTORY_CREATION, ProxyFactory);

        ledger.install(Self::TOKEN, bytes!("01"), Token, []);
        ledger.set_storage(
            Self::TOKEN,
            Token::balance_slot(DEPOSIT_ADDRESS),
            B256::from(DEPOSIT_TOKEN_AMOUNT.to_be_bytes::<32>()),
        );
        ledger.install(Self::SWEEPER, bytes!("02"), Sweeper, []);
        ledger.install(Self::DESTRUCTOR, bytes!("03"), Destructor, []);
        ledger.install(Self::AUTHORIZER_IMPLEMENTATION, bytes!("04"), Authorizer, []);
        ledger.install(
            Self::AUTHORIZER_PROXY,
            bytes!("05"),
            Erc1967Proxy,
            [(IMPLEMENTATION_SLOT, Self::AUTHORIZER_IMPLEMENTATION.into_word())],
        );

        let init =
            IAuthorizer::initCall { wards: vec![Self::WARD], aims: vec![DEPOSIT_ADDRESS] }.abi_encode();
        let receipt = ledger
            .submit(Submission::Call(CallRequest::new(Self::CHIEF, Self::AUTHORIZER_PROXY, init)))
            .await?;
        if !receipt.status {
            return Err(LedgerError::Rejected("authorizer proxy initialization reverted".into()));
        }
        debug!(proxy = %Self::AUTHORIZER_PROXY, "wallet mining world ready");

        Ok(Self { ledger, records: safe_deployment_records() })
    }

    pub async fn token_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        let input = IERC20::balanceOfCall { owner }.abi_encode();
        let output = self.ledger.call(CallRequest::new(owner, Self::TOKEN, input)).await?;
        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|err| LedgerError::Rejected(err.to_string()))
    }
}
