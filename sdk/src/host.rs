//! Safe wrappers around the host-callback table
//!
//! A [`HostHandle`] is built for each `execute` call from the context pointer
//! the host passed in. Every wrapper checks that the host actually filled the
//! entry it needs; a missing entry becomes a [`HostCallError`] instead of a
//! call through null.

use crate::{error::HostCallError, output::Output};
use std::{marker::PhantomData, ptr};
use vmc_abi::{Address, Bytes32, HostContext, HostInterface, Message, StorageStatus, TxContext};

/// Result type for host callbacks
pub type HostResult<T> = std::result::Result<T, HostCallError>;

/// Access to the host for the duration of one `execute` call
pub struct HostHandle<'a> {
    context: *mut HostContext,
    interface: Option<&'a HostInterface>,
    _session: PhantomData<&'a mut HostContext>,
}

impl<'a> HostHandle<'a> {
    /// Wraps the context pointer received by `execute`
    ///
    /// # Safety
    /// `context` must be null or point to a host context whose interface
    /// pointer is null or valid for `'a`.
    pub unsafe fn from_raw(context: *mut HostContext) -> Self {
        let interface = if context.is_null() { None } else { (*context).host.as_ref() };
        Self { context, interface, _session: PhantomData }
    }

    /// Handle with no host behind it; every callback fails with [`HostCallError::NoContext`]
    pub fn detached() -> Self {
        Self { context: ptr::null_mut(), interface: None, _session: PhantomData }
    }

    fn entry<F>(&self, name: &'static str, select: impl FnOnce(&HostInterface) -> Option<F>) -> HostResult<F> {
        let interface = self.interface.ok_or(HostCallError::NoContext)?;
        select(interface).ok_or(HostCallError::MissingCallback(name))
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Checks whether an account exists
    pub fn account_exists(&mut self, address: &Address) -> HostResult<bool> {
        let f = self.entry("account_exists", |h| h.account_exists)?;
        Ok(unsafe { f(self.context, address) })
    }

    /// Reads an account balance
    pub fn get_balance(&mut self, address: &Address) -> HostResult<Bytes32> {
        let f = self.entry("get_balance", |h| h.get_balance)?;
        Ok(unsafe { f(self.context, address) })
    }

    /// Reads the size of an account's code
    pub fn get_code_size(&mut self, address: &Address) -> HostResult<usize> {
        let f = self.entry("get_code_size", |h| h.get_code_size)?;
        Ok(unsafe { f(self.context, address) })
    }

    /// Reads the hash of an account's code
    pub fn get_code_hash(&mut self, address: &Address) -> HostResult<Bytes32> {
        let f = self.entry("get_code_hash", |h| h.get_code_hash)?;
        Ok(unsafe { f(self.context, address) })
    }

    /// Copies code from `offset` into `buffer`; returns the number of bytes copied
    pub fn copy_code(&mut self, address: &Address, offset: usize, buffer: &mut [u8]) -> HostResult<usize> {
        let f = self.entry("copy_code", |h| h.copy_code)?;
        let copied = unsafe { f(self.context, address, offset, buffer.as_mut_ptr(), buffer.len()) };
        Ok(copied.min(buffer.len()))
    }

    /// Schedules `address` for destruction, sending its balance to `beneficiary`
    pub fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> HostResult<()> {
        let f = self.entry("selfdestruct", |h| h.selfdestruct)?;
        unsafe { f(self.context, address, beneficiary) };
        Ok(())
    }

    // ========================================================================
    // Storage
    // ========================================================================

    /// Reads a storage slot
    pub fn get_storage(&mut self, address: &Address, key: &Bytes32) -> HostResult<Bytes32> {
        let f = self.entry("get_storage", |h| h.get_storage)?;
        Ok(unsafe { f(self.context, address, key) })
    }

    /// Writes a storage slot
    pub fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> HostResult<StorageStatus> {
        let f = self.entry("set_storage", |h| h.set_storage)?;
        Ok(unsafe { f(self.context, address, key, value) })
    }

    // ========================================================================
    // Blockchain State
    // ========================================================================

    /// Reads the transaction and block context
    pub fn tx_context(&mut self) -> HostResult<TxContext> {
        let f = self.entry("get_tx_context", |h| h.get_tx_context)?;
        Ok(unsafe { f(self.context) })
    }

    /// Reads the hash of block `number`
    pub fn block_hash(&mut self, number: i64) -> HostResult<Bytes32> {
        let f = self.entry("get_block_hash", |h| h.get_block_hash)?;
        Ok(unsafe { f(self.context, number) })
    }

    /// Emits a log record
    pub fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]) -> HostResult<()> {
        let f = self.entry("emit_log", |h| h.emit_log)?;
        unsafe { f(self.context, address, data.as_ptr(), data.len(), topics.as_ptr(), topics.len()) };
        Ok(())
    }

    // ========================================================================
    // Nested Calls
    // ========================================================================

    /// Performs a nested call
    ///
    /// The output is copied out and the host's result released before this
    /// returns, so nothing allocated by the host outlives the call.
    pub fn call(&mut self, msg: &Message) -> HostResult<Output> {
        let f = self.entry("call", |h| h.call)?;
        let result = unsafe { f(self.context, msg) };
        Ok(unsafe { Output::from_result(result) })
    }
}
