//! Host-callback table
//!
//! The host hands the module a `*mut HostContext` on every `execute`. The
//! first field of every host context is a pointer to the host's
//! [`HostInterface`], so the module can reach the callbacks without knowing
//! anything else about the context.
//!
//! Callbacks are synchronous: they run on the thread that called `execute`
//! and return before the module continues. Values they return are copies;
//! a module must not keep pointers handed to it by a callback.

use crate::{
    codes::StorageStatus,
    message::Message,
    result::ExecutionResult,
    types::{Address, Bytes32},
};

/// Checks whether an account exists
pub type AccountExistsFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const Address) -> bool;

/// Reads a storage slot
pub type GetStorageFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const Address,
    key: *const Bytes32,
) -> Bytes32;

/// Writes a storage slot and reports how the slot changed
pub type SetStorageFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const Address,
    key: *const Bytes32,
    value: *const Bytes32,
) -> StorageStatus;

/// Reads an account balance (big-endian)
pub type GetBalanceFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const Address) -> Bytes32;

/// Reads the size of an account's code
pub type GetCodeSizeFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const Address) -> usize;

/// Reads the hash of an account's code
pub type GetCodeHashFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const Address) -> Bytes32;

/// Copies code starting at `code_offset` into the buffer; returns bytes copied
pub type CopyCodeFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const Address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize;

/// Schedules an account for destruction
pub type SelfdestructFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const Address,
    beneficiary: *const Address,
);

/// Performs a nested call; the module must release the returned result
pub type CallFn =
    unsafe extern "C" fn(context: *mut HostContext, msg: *const Message) -> ExecutionResult;

/// Reads the transaction and block context
pub type GetTxContextFn = unsafe extern "C" fn(context: *mut HostContext) -> TxContext;

/// Reads the hash of a recent block
pub type GetBlockHashFn = unsafe extern "C" fn(context: *mut HostContext, number: i64) -> Bytes32;

/// Emits a log record
pub type EmitLogFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const Address,
    data: *const u8,
    data_size: usize,
    topics: *const Bytes32,
    topics_count: usize,
);

/// Table of callbacks the host offers to the module
///
/// Every entry is nullable because foreign code can always pass null. A
/// conforming host fills all of them; a module treats a missing entry as a
/// host bug and fails the execution rather than dereferencing it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct HostInterface {
    /// See [`AccountExistsFn`]
    pub account_exists: Option<AccountExistsFn>,
    /// See [`GetStorageFn`]
    pub get_storage: Option<GetStorageFn>,
    /// See [`SetStorageFn`]
    pub set_storage: Option<SetStorageFn>,
    /// See [`GetBalanceFn`]
    pub get_balance: Option<GetBalanceFn>,
    /// See [`GetCodeSizeFn`]
    pub get_code_size: Option<GetCodeSizeFn>,
    /// See [`GetCodeHashFn`]
    pub get_code_hash: Option<GetCodeHashFn>,
    /// See [`CopyCodeFn`]
    pub copy_code: Option<CopyCodeFn>,
    /// See [`SelfdestructFn`]
    pub selfdestruct: Option<SelfdestructFn>,
    /// See [`CallFn`]
    pub call: Option<CallFn>,
    /// See [`GetTxContextFn`]
    pub get_tx_context: Option<GetTxContextFn>,
    /// See [`GetBlockHashFn`]
    pub get_block_hash: Option<GetBlockHashFn>,
    /// See [`EmitLogFn`]
    pub emit_log: Option<EmitLogFn>,
}

/// Header of every host context
///
/// Hosts embed this as the first field of their own `#[repr(C)]` context
/// type and pass a pointer to it.
#[repr(C)]
#[derive(Debug)]
pub struct HostContext {
    /// Callback table; must outlive the `execute` call
    pub host: *const HostInterface,
}

/// Transaction and block information
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxContext {
    /// Gas price of the transaction
    pub tx_gas_price: Bytes32,
    /// Origin of the transaction
    pub tx_origin: Address,
    /// Miner of the block
    pub block_coinbase: Address,
    /// Block number
    pub block_number: i64,
    /// Block timestamp
    pub block_timestamp: i64,
    /// Block gas limit
    pub block_gas_limit: i64,
    /// Block difficulty
    pub block_difficulty: Bytes32,
}
