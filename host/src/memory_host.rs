//! In-memory host state
//!
//! Useful for:
//! - Unit and integration tests of VM modules
//! - The test runner
//! - Benchmarking modules without a database

use crate::{host::Host, message::CallMessage, outcome::ExecutionOutcome};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use vmc_abi::{Address, Bytes32, StorageStatus, TxContext};

/// One account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// Balance, big-endian
    pub balance: Bytes32,
    /// Code
    pub code: Vec<u8>,
    /// Hash of the code, as supplied by the caller
    pub code_hash: Bytes32,
    /// Storage slots; absent slots read as zero
    pub storage: HashMap<Bytes32, Bytes32>,
}

/// Log entry emitted during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Emitting account
    pub address: Address,
    /// Topics
    pub topics: Vec<Bytes32>,
    /// Data, hex encoded when serialized
    #[serde(serialize_with = "serialize_hex")]
    pub data: Vec<u8>,
}

/// Host backed by hash maps
///
/// Storage writes are classified against the value a slot had at its first
/// write, which gives the `ADDED`, `MODIFIED`, `MODIFIED_AGAIN` and `DELETED`
/// distinctions without a journal. Nested calls are recorded and answered
/// from [`MemoryHost::call_results`]; when that queue is empty a call
/// succeeds with all its gas left.
#[derive(Debug, Default)]
pub struct MemoryHost {
    /// Accounts by address
    pub accounts: HashMap<Address, Account>,
    /// Context returned by `tx_context`
    pub tx_context: TxContext,
    /// Known block hashes
    pub block_hashes: HashMap<i64, Bytes32>,
    /// Logs in emission order
    pub logs: Vec<LogRecord>,
    /// `(address, beneficiary)` pairs in call order
    pub selfdestructs: Vec<(Address, Address)>,
    /// Nested call messages in call order
    pub calls: Vec<CallMessage>,
    /// Scripted answers for nested calls
    pub call_results: VecDeque<ExecutionOutcome>,
    original: HashMap<(Address, Bytes32), Bytes32>,
}

impl MemoryHost {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces an account with `balance`
    pub fn with_account(mut self, address: Address, balance: Bytes32) -> Self {
        self.accounts.entry(address).or_default().balance = balance;
        self
    }

    /// Sets an account's code and code hash
    pub fn set_code(&mut self, address: Address, code: Vec<u8>, code_hash: Bytes32) {
        let account = self.accounts.entry(address).or_default();
        account.code = code;
        account.code_hash = code_hash;
    }

    /// Current value of a slot
    pub fn storage_at(&self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(key))
            .copied()
            .unwrap_or_default()
    }

    /// Forgets first-write values so the next writes classify afresh
    pub fn commit(&mut self) {
        self.original.clear();
    }
}

impl Host for MemoryHost {
    fn account_exists(&mut self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.storage_at(address, key)
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        let current = self.storage_at(address, key);
        if current == *value {
            return StorageStatus::UNCHANGED;
        }

        let original = *self.original.entry((*address, *key)).or_insert(current);
        let storage = &mut self.accounts.entry(*address).or_default().storage;
        if value.is_zero() {
            storage.remove(key);
        } else {
            storage.insert(*key, *value);
        }

        if original != current {
            StorageStatus::MODIFIED_AGAIN
        } else if original.is_zero() {
            StorageStatus::ADDED
        } else if value.is_zero() {
            StorageStatus::DELETED
        } else {
            StorageStatus::MODIFIED
        }
    }

    fn get_balance(&mut self, address: &Address) -> Bytes32 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    fn get_code_size(&mut self, address: &Address) -> usize {
        self.accounts.get(address).map_or(0, |account| account.code.len())
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        self.accounts
            .get(address)
            .map(|account| account.code_hash)
            .unwrap_or_default()
    }

    fn copy_code(&mut self, address: &Address, offset: usize, buffer: &mut [u8]) -> usize {
        let Some(account) = self.accounts.get(address) else {
            return 0;
        };
        let Some(code) = account.code.get(offset..) else {
            return 0;
        };
        let n = code.len().min(buffer.len());
        buffer[..n].copy_from_slice(&code[..n]);
        n
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) {
        self.selfdestructs.push((*address, *beneficiary));
    }

    fn call(&mut self, msg: &CallMessage) -> ExecutionOutcome {
        self.calls.push(msg.clone());
        self.call_results
            .pop_front()
            .unwrap_or_else(|| ExecutionOutcome::success(msg.gas, msg.gas, Vec::new()))
    }

    fn tx_context(&mut self) -> TxContext {
        self.tx_context
    }

    fn block_hash(&mut self, number: i64) -> Bytes32 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]) {
        self.logs.push(LogRecord {
            address: *address,
            topics: topics.to_vec(),
            data: data.to_vec(),
        });
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
