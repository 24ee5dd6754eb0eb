//! An in-process [`LedgerClient`].
//!
//! Contracts are not EVM bytecode but [`Program`]s: Rust implementations of just enough
//! contract behavior to exercise the wallet-miner against. Account bookkeeping (nonces,
//! `CREATE`/`CREATE2` address derivation, storage, logs, reverts) follows the EVM.

use alloy_primitives::{Address, B256, Bytes, Log, LogData, TxHash, U256, keccak256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::Arc};
use wallet_miner_common::{
    CallRequest, LedgerClient, LedgerError, Receipt, SignedTransactionRecord, Submission,
};

/// Reason a [`Program`] stopped execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revert(pub String);

impl<T: fmt::Display> From<T> for Revert {
    fn from(reason: T) -> Self {
        Self(reason.to_string())
    }
}

/// Behavior attached to an account with code.
pub trait Program: Send + Sync + fmt::Debug {
    fn execute(&self, frame: &mut Frame<'_>) -> Result<Bytes, Revert>;
}

#[derive(Clone, Debug, Default)]
struct Account {
    nonce: u64,
    balance: U256,
    code: Bytes,
    storage: HashMap<B256, B256>,
    program: Option<Arc<dyn Program>>,
}

#[derive(Clone, Debug, Default)]
struct State {
    accounts: HashMap<Address, Account>,
    /// Programs installed by creation transactions, keyed by the hash of their creation payload.
    creations: HashMap<B256, Arc<dyn Program>>,
    /// Whether `SELFDESTRUCT` removes code of contracts created in earlier transactions, which
    /// stopped being the case with EIP-6780.
    destructive_selfdestruct: bool,
    submissions: u64,
}

impl State {
    fn account(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    fn nonce(&self, address: Address) -> u64 {
        self.account(address).map_or(0, |account| account.nonce)
    }

    fn has_code(&self, address: Address) -> bool {
        self.account(address).is_some_and(|account| !account.code.is_empty())
    }

    fn install(
        &mut self,
        address: Address,
        code: Bytes,
        program: Option<Arc<dyn Program>>,
        storage: impl IntoIterator<Item = (B256, B256)>,
    ) {
        let account = self.account_mut(address);
        // EIP-161: contracts start at nonce 1
        account.nonce = account.nonce.max(1);
        account.code = code;
        account.program = program;
        account.storage.extend(storage);
    }

    fn execute(
        &mut self,
        logs: &mut Vec<Log>,
        this: Address,
        code: Address,
        caller: Address,
        input: Bytes,
    ) -> Result<Bytes, Revert> {
        let Some(program) = self.account(code).and_then(|account| account.program.clone()) else {
            // calls into accounts without code succeed without effect
            return Ok(Bytes::new());
        };
        let mut frame = Frame { state: self, logs, this, caller, input };
        program.execute(&mut frame)
    }

    fn next_hash(&mut self) -> TxHash {
        self.submissions += 1;
        keccak256(self.submissions.to_be_bytes())
    }

    fn apply_record(&mut self, record: SignedTransactionRecord) -> Result<Receipt, LedgerError> {
        let sender = record.sender;
        let expected = self.nonce(sender);
        if record.nonce != expected {
            return Err(LedgerError::NonceMismatch { sender, expected, got: record.nonce });
        }
        let cost = U256::from(record.gas_price) * U256::from(record.gas_limit) + record.value;
        let balance = self.account(sender).map_or(U256::ZERO, |account| account.balance);
        if balance < cost {
            return Err(LedgerError::Rejected(format!(
                "insufficient funds for gas * price + value: have {balance} want {cost}"
            )));
        }

        self.submissions += 1;
        let tx_hash = record.hash();
        let (status, created_address, logs) = match record.to {
            None => {
                self.account_mut(sender).nonce += 1;
                let address = sender.create(record.nonce);
                let program = self.creations.get(&keccak256(&record.input)).cloned();
                self.install(address, record.input, program, []);
                (true, Some(address), Vec::new())
            }
            Some(to) => {
                let (status, logs) = self.transact(sender, to, record.input);
                (status, None, logs)
            }
        };
        Ok(Receipt { tx_hash, status, created_address, logs })
    }

    fn apply_call(&mut self, call: CallRequest) -> Receipt {
        let tx_hash = self.next_hash();
        let (status, logs) = self.transact(call.from, call.to, call.input);
        Receipt { tx_hash, status, created_address: None, logs }
    }

    /// Runs a top level call, rolling back everything but the sender's nonce if it reverts.
    fn transact(&mut self, from: Address, to: Address, input: Bytes) -> (bool, Vec<Log>) {
        let snapshot = self.clone();
        self.account_mut(from).nonce += 1;
        let mut logs = Vec::new();
        match self.execute(&mut logs, to, to, from, input) {
            Ok(_) => (true, logs),
            Err(Revert(reason)) => {
                debug!(%from, %to, %reason, "transaction reverted");
                *self = snapshot;
                self.account_mut(from).nonce += 1;
                (false, Vec::new())
            }
        }
    }
}

/// Execution context handed to a [`Program`].
///
/// `this` is the account whose storage the program operates on. For delegated calls it differs
/// from the account the program was loaded from.
pub struct Frame<'a> {
    state: &'a mut State,
    logs: &'a mut Vec<Log>,
    pub this: Address,
    pub caller: Address,
    pub input: Bytes,
}

impl Frame<'_> {
    pub fn sload(&self, slot: B256) -> B256 {
        self.state
            .account(self.this)
            .and_then(|account| account.storage.get(&slot).copied())
            .unwrap_or_default()
    }

    pub fn sstore(&mut self, slot: B256, value: B256) {
        self.state.account_mut(self.this).storage.insert(slot, value);
    }

    pub fn emit(&mut self, data: LogData) {
        self.logs.push(Log { address: self.this, data });
    }

    /// `CREATE` from `this`.
    pub fn create(
        &mut self,
        code: Bytes,
        program: Arc<dyn Program>,
        storage: impl IntoIterator<Item = (B256, B256)>,
    ) -> Address {
        let deployer = self.state.account_mut(self.this);
        let address = self.this.create(deployer.nonce);
        deployer.nonce += 1;
        self.state.install(address, code, Some(program), storage);
        address
    }

    /// `CREATE2` from `this`.
    pub fn create2(
        &mut self,
        salt: B256,
        init_code_hash: B256,
        code: Bytes,
        program: Arc<dyn Program>,
        storage: impl IntoIterator<Item = (B256, B256)>,
    ) -> Result<Address, Revert> {
        let address = self.this.create2(salt, init_code_hash);
        if self.state.has_code(address) {
            return Err(Revert(format!("create2 collision at {address}")));
        }
        self.state.account_mut(self.this).nonce += 1;
        self.state.install(address, code, Some(program), storage);
        Ok(address)
    }

    /// Calls `to` with `this` as the caller.
    pub fn call(&mut self, to: Address, input: Bytes) -> Result<Bytes, Revert> {
        let caller = self.this;
        self.state.execute(self.logs, to, to, caller, input)
    }

    /// Runs the program of `code` against the storage of `this`, preserving the caller.
    pub fn delegate(&mut self, code: Address, input: Bytes) -> Result<Bytes, Revert> {
        let (this, caller) = (self.this, self.caller);
        self.state.execute(self.logs, this, code, caller, input)
    }

    pub fn self_destruct(&mut self) {
        if self.state.destructive_selfdestruct {
            debug!(this = %self.this, "self destructing");
            self.state.accounts.remove(&self.this);
        } else {
            trace!(this = %self.this, "SELFDESTRUCT leaves code in place (EIP-6780)");
        }
    }
}

/// A serialized, in-memory ledger.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// A ledger with pre-Cancun `SELFDESTRUCT` semantics.
    pub fn new() -> Self {
        let state = State { destructive_selfdestruct: true, ..Default::default() };
        Self { state: Mutex::new(state) }
    }

    /// A ledger where `SELFDESTRUCT` no longer removes code (EIP-6780).
    pub fn cancun() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    /// Places a contract at `address` without a transaction, as a genesis allocation would.
    pub fn install(
        &self,
        address: Address,
        code: impl Into<Bytes>,
        program: impl Program + 'static,
        storage: impl IntoIterator<Item = (B256, B256)>,
    ) {
        self.state.lock().install(address, code.into(), Some(Arc::new(program)), storage);
    }

    /// Makes replayed creations whose payload is `creation` install `program`.
    pub fn register_creation(&self, creation: &[u8], program: impl Program + 'static) {
        self.state.lock().creations.insert(keccak256(creation), Arc::new(program));
    }

    pub fn set_storage(&self, address: Address, slot: B256, value: B256) {
        self.state.lock().account_mut(address).storage.insert(slot, value);
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.state.lock().account(address).map_or(U256::ZERO, |account| account.balance)
    }

    /// Addresses of all accounts with code, sorted.
    pub fn contracts(&self) -> Vec<Address> {
        let state = self.state.lock();
        let mut contracts: Vec<_> =
            state.accounts.keys().copied().filter(|address| state.has_code(*address)).collect();
        contracts.sort();
        contracts
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn submit(&self, submission: Submission) -> Result<Receipt, LedgerError> {
        let mut state = self.state.lock();
        match submission {
            Submission::Replay(record) => state.apply_record(record),
            Submission::Call(call) => Ok(state.apply_call(call)),
        }
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, LedgerError> {
        let mut scratch = self.state.lock().clone();
        let mut logs = Vec::new();
        scratch
            .execute(&mut logs, request.to, request.to, request.from, request.input)
            .map_err(|Revert(reason)| {
                LedgerError::Rejected(format!("execution reverted: {reason}"))
            })
    }

    async fn code(&self, address: Address) -> Result<Bytes, LedgerError> {
        let state = self.state.lock();
        Ok(state.account(address).map(|account| account.code.clone()).unwrap_or_default())
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, LedgerError> {
        Ok(self
            .state
            .lock()
            .account(address)
            .and_then(|account| account.storage.get(&slot).copied())
            .unwrap_or_default())
    }

    async fn nonce(&self, address: Address) -> Result<u64, LedgerError> {
        Ok(self.state.lock().nonce(address))
    }

    async fn set_balance(&self, address: Address, balance: U256) -> Result<(), LedgerError> {
        self.state.lock().account_mut(address).balance = balance;
        Ok(())
    }
}
