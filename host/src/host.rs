//! Host state provider trait
//!
//! The adapter does not implement any chain state; it only translates the
//! module's callbacks into calls on a [`Host`]. Clients implement this trait
//! over their own state database.
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! use vmc_host::{Host, CallMessage, ExecutionOutcome};
//!
//! struct ChainState { /* ... */ }
//!
//! impl Host for ChainState {
//!     fn account_exists(&mut self, address: &Address) -> bool {
//!         self.db.contains(address)
//!     }
//!     // ...
//! }
//! ```

use crate::{message::CallMessage, outcome::ExecutionOutcome};
use vmc_abi::{Address, Bytes32, StorageStatus, TxContext};

/// Callbacks a VM module may invoke during `execute`
///
/// Every method runs synchronously on the executing thread. A panic in any
/// of them is caught at the boundary, the module sees a neutral value, and
/// the panic is resumed once `execute` has returned.
pub trait Host {
    /// True if the account exists
    fn account_exists(&mut self, address: &Address) -> bool;

    /// Reads a storage slot; missing slots read as zero
    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32;

    /// Writes a storage slot
    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus;

    /// Balance of the account, big-endian
    fn get_balance(&mut self, address: &Address) -> Bytes32;

    /// Size of the account's code
    fn get_code_size(&mut self, address: &Address) -> usize;

    /// Hash of the account's code; zero if the account does not exist
    fn get_code_hash(&mut self, address: &Address) -> Bytes32;

    /// Copies code from `offset` into `buffer`; returns bytes copied
    fn copy_code(&mut self, address: &Address, offset: usize, buffer: &mut [u8]) -> usize;

    /// Schedules `address` for destruction in favour of `beneficiary`
    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address);

    /// Runs a nested call or creation
    fn call(&mut self, msg: &CallMessage) -> ExecutionOutcome;

    /// Transaction and block context
    fn tx_context(&mut self) -> TxContext;

    /// Hash of block `number`; zero if unknown
    fn block_hash(&mut self, number: i64) -> Bytes32;

    /// Records a log entry
    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]);
}
