//! Contract stand-ins for the wallet mining setup.

use crate::{Frame, Program, Revert};
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::{SolCall, SolEvent, SolInterface, SolValue};
use std::sync::Arc;
use wallet_miner_common::{
    abi::{
        IAuthorizer::IAuthorizerCalls,
        IERC20::{self, IERC20Calls},
        IProxyFactory::{self, IProxyFactoryCalls},
        ISafe::ISafeCalls,
        ISweeper::ISweeperCalls,
    },
    slots::IMPLEMENTATION_SLOT,
};

/// Runtime code placeholder of every proxy the factory deploys.
pub const PROXY_RUNTIME_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0x73];

/// Creation code the factory hashes into `CREATE2` addresses.
pub const PROXY_CREATION_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15];

fn slot(index: u64) -> B256 {
    B256::from(U256::from(index).to_be_bytes::<32>())
}

fn word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

fn mapping_slot(key: Address, index: u64) -> B256 {
    keccak256((key, U256::from(index)).abi_encode())
}

/// Safe v1.1.1 proxy factory.
#[derive(Debug, Default)]
pub struct ProxyFactory;

impl ProxyFactory {
    fn finish(frame: &mut Frame<'_>, proxy: Address, data: Bytes) -> Result<Bytes, Revert> {
        if !data.is_empty() {
            frame.call(proxy, data)?;
        }
        frame.emit(IProxyFactory::ProxyCreation { proxy }.encode_log_data());
        Ok(proxy.abi_encode().into())
    }
}

impl Program for ProxyFactory {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        match IProxyFactoryCalls::abi_decode(&frame.input)? {
            IProxyFactoryCalls::createProxy(call) => {
                let storage = [(B256::ZERO, call.masterCopy.into_word())];
                let proxy = frame.create(PROXY_RUNTIME_CODE.into(), Arc::new(SafeProxy), storage);
                Self::finish(frame, proxy, call.data)
            }
            IProxyFactoryCalls::createProxyWithNonce(call) => {
                let salt = keccak256(
                    [keccak256(&call.initializer).as_slice(), &call.saltNonce.to_be_bytes::<32>()]
                        .concat(),
                );
                let init_code_hash =
                    keccak256([PROXY_CREATION_CODE, call.masterCopy.into_word().as_slice()].concat());
                let storage = [(B256::ZERO, call.masterCopy.into_word())];
                let proxy = frame.create2(
                    salt,
                    init_code_hash,
                    PROXY_RUNTIME_CODE.into(),
                    Arc::new(SafeProxy),
                    storage,
                )?;
                Self::finish(frame, proxy, call.initializer)
            }
        }
    }
}

/// Safe proxy: delegates everything to the master copy stored in slot 0.
#[derive(Debug, Default)]
pub struct SafeProxy;

impl Program for SafeProxy {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        let master_copy = Address::from_word(frame.sload(B256::ZERO));
        let input = frame.input.clone();
        frame.delegate(master_copy, input)
    }
}

/// Safe v1.1.1 master copy, reduced to `setup`.
#[derive(Debug, Default)]
pub struct SafeMasterCopy;

impl SafeMasterCopy {
    pub const OWNERS_SLOT: u64 = 2;
    pub const OWNER_COUNT_SLOT: u64 = 3;
    pub const THRESHOLD_SLOT: u64 = 4;
}

impl Program for SafeMasterCopy {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        let ISafeCalls::setup(setup) = ISafeCalls::abi_decode(&frame.input)?;
        if frame.sload(slot(Self::THRESHOLD_SLOT)) != B256::ZERO {
            return Err("Owners have already been setup".into());
        }
        if setup.threshold.is_zero() || setup.threshold > U256::from(setup.owners.len()) {
            return Err("Threshold cannot exceed owner count".into());
        }
        for owner in &setup.owners {
            frame.sstore(mapping_slot(*owner, Self::OWNERS_SLOT), word(U256::from(1)));
        }
        frame.sstore(slot(Self::OWNER_COUNT_SLOT), word(U256::from(setup.owners.len())));
        frame.sstore(slot(Self::THRESHOLD_SLOT), word(setup.threshold));
        if !setup.to.is_zero() {
            frame
                .delegate(setup.to, setup.data)
                .map_err(|Revert(reason)| Revert(format!("Could not finish initialization: {reason}")))?;
        }
        Ok(Bytes::new())
    }
}

/// Module that, delegate-called by a wallet, moves the wallet's whole token balance out.
#[derive(Debug, Default)]
pub struct Sweeper;

impl Program for Sweeper {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        let ISweeperCalls::yoink(call) = ISweeperCalls::abi_decode(&frame.input)?;
        let balance_of = IERC20::balanceOfCall { owner: frame.this }.abi_encode();
        let balance = U256::abi_decode(&frame.call(call.token, balance_of.into())?)?;
        let transfer = IERC20::transferCall { to: call.receiver, amount: balance }.abi_encode();
        frame.call(call.token, transfer.into())?;
        Ok(Bytes::new())
    }
}

/// Minimal ERC-20 keeping balances in the slot-0 mapping.
#[derive(Debug, Default)]
pub struct Token;

impl Token {
    pub fn balance_slot(owner: Address) -> B256 {
        mapping_slot(owner, 0)
    }
}

impl Program for Token {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        let balance = |frame: &Frame<'_>, owner| U256::from_be_bytes(frame.sload(Self::balance_slot(owner)).0);
        match IERC20Calls::abi_decode(&frame.input)? {
            IERC20Calls::balanceOf(call) => Ok(balance(frame, call.owner).abi_encode().into()),
            IERC20Calls::transfer(call) => {
                let from = frame.caller;
                let available = balance(frame, from);
                if available < call.amount {
                    return Err("ERC20: transfer amount exceeds balance".into());
                }
                let credited = balance(frame, call.to);
                frame.sstore(Self::balance_slot(from), word(available - call.amount));
                frame.sstore(Self::balance_slot(call.to), word(credited + call.amount));
                Ok(true.abi_encode().into())
            }
        }
    }
}

/// UUPS authorizer implementation with an OpenZeppelin-style one-shot initializer.
#[derive(Debug, Default)]
pub struct Authorizer;

impl Authorizer {
    /// `Initializable._initialized` lives in the lowest byte of slot 0.
    pub const INITIALIZED_SLOT: B256 = B256::ZERO;
    /// `OwnableUpgradeable._owner`, after `Initializable` and the 50 word context gap.
    pub const OWNER_SLOT: u64 = 0x33;
    const WARDS_SLOT: u64 = 0x97;

    fn ward_slot(usr: Address, aim: Address) -> B256 {
        keccak256((usr, aim, U256::from(Self::WARDS_SLOT)).abi_encode())
    }

    fn owner(frame: &Frame<'_>) -> Address {
        Address::from_word(frame.sload(slot(Self::OWNER_SLOT)))
    }
}

impl Program for Authorizer {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        match IAuthorizerCalls::abi_decode(&frame.input)? {
            IAuthorizerCalls::init(call) => {
                if frame.sload(Self::INITIALIZED_SLOT)[31] != 0 {
                    return Err("Initializable: contract is already initialized".into());
                }
                if call.wards.len() != call.aims.len() {
                    return Err("wards and aims differ in length".into());
                }
                frame.sstore(Self::INITIALIZED_SLOT, word(U256::from(1)));
                frame.sstore(slot(Self::OWNER_SLOT), frame.caller.into_word());
                for (usr, aim) in call.wards.iter().zip(&call.aims) {
                    frame.sstore(Self::ward_slot(*usr, *aim), word(U256::from(1)));
                }
                Ok(Bytes::new())
            }
            IAuthorizerCalls::owner(_) => Ok(Self::owner(frame).abi_encode().into()),
            IAuthorizerCalls::can(call) => {
                let allowed = frame.sload(Self::ward_slot(call.usr, call.aim)) != B256::ZERO;
                Ok(allowed.abi_encode().into())
            }
            IAuthorizerCalls::upgradeToAndCall(call) => {
                if frame.caller != Self::owner(frame) {
                    return Err("Ownable: caller is not the owner".into());
                }
                frame.sstore(IMPLEMENTATION_SLOT, call.newImplementation.into_word());
                if !call.data.is_empty() {
                    frame.delegate(call.newImplementation, call.data)?;
                }
                Ok(Bytes::new())
            }
        }
    }
}

/// ERC-1967 proxy forwarding to the implementation in [`IMPLEMENTATION_SLOT`].
#[derive(Debug, Default)]
pub struct Erc1967Proxy;

impl Program for Erc1967Proxy {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        let implementation = Address::from_word(frame.sload(IMPLEMENTATION_SLOT));
        let input = frame.input.clone();
        frame.delegate(implementation, input)
    }
}

/// Self-destructs whatever account delegate-calls it.
#[derive(Debug, Default)]
pub struct Destructor;

impl Program for Destructor {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert> {
        frame.self_destruct();
        Ok(Bytes::new())
    }
}
