//! Execution session
//!
//! An [`ExecutionSession`] is the host context handed to the module for one
//! `execute` call. It is `#[repr(C)]` with the [`HostContext`] header first,
//! so the `*mut HostContext` the module passes back to each callback can be
//! turned into the session again. The session lives on the stack of
//! [`crate::Vm::execute`] and never outlives the call.

use crate::{host::Host, message::CallMessage};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    slice,
};
use vmc_abi::{
    Address, Bytes32, ExecutionResult, HostContext, HostInterface, Message, StatusCode,
    StorageStatus, TxContext,
};

/// Callback table shared by every session
pub(crate) static HOST_INTERFACE: HostInterface = HostInterface {
    account_exists: Some(account_exists),
    get_storage: Some(get_storage),
    set_storage: Some(set_storage),
    get_balance: Some(get_balance),
    get_code_size: Some(get_code_size),
    get_code_hash: Some(get_code_hash),
    copy_code: Some(copy_code),
    selfdestruct: Some(selfdestruct),
    call: Some(call),
    get_tx_context: Some(get_tx_context),
    get_block_hash: Some(get_block_hash),
    emit_log: Some(emit_log),
};

/// Host context for one `execute`
#[repr(C)]
pub struct ExecutionSession<'a> {
    // Must stay the first field.
    context: HostContext,
    host: &'a mut dyn Host,
    panic: Option<Box<dyn Any + Send>>,
    callbacks: u64,
}

impl<'a> ExecutionSession<'a> {
    /// Wraps `host` for one execution
    pub fn new(host: &'a mut dyn Host) -> Self {
        Self {
            context: HostContext {
                host: &HOST_INTERFACE,
            },
            host,
            panic: None,
            callbacks: 0,
        }
    }

    /// Pointer handed to the module
    ///
    /// Derived from the whole session so callbacks may reach every field.
    pub fn context_ptr(&mut self) -> *mut HostContext {
        (self as *mut Self).cast::<HostContext>()
    }

    /// Number of callbacks the module made
    pub fn callbacks(&self) -> u64 {
        self.callbacks
    }

    /// Ends the session, resuming a panic raised by a host callback
    pub fn finish(self) -> u64 {
        if let Some(payload) = self.panic {
            panic::resume_unwind(payload);
        }
        self.callbacks
    }
}

/// Runs `f` against the session's host
///
/// Returns `fallback` when the context is null, when an earlier callback
/// already panicked, or when `f` panics. In the last case the payload is
/// kept for [`ExecutionSession::finish`].
unsafe fn with_host<'s, R>(
    context: *mut HostContext,
    fallback: R,
    f: impl FnOnce(&mut dyn Host) -> R,
) -> R {
    let Some(session) = context.cast::<ExecutionSession<'s>>().as_mut() else {
        log::error!("host callback invoked without a context");
        return fallback;
    };
    if session.panic.is_some() {
        return fallback;
    }
    session.callbacks = session.callbacks.saturating_add(1);

    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *session.host))) {
        Ok(value) => value,
        Err(payload) => {
            log::error!("host callback panicked; resuming after execute returns");
            session.panic = Some(payload);
            fallback
        }
    }
}

unsafe extern "C" fn account_exists(context: *mut HostContext, address: *const Address) -> bool {
    let Some(address) = address.as_ref() else {
        return false;
    };
    with_host(context, false, |host| host.account_exists(address))
}

unsafe extern "C" fn get_storage(
    context: *mut HostContext,
    address: *const Address,
    key: *const Bytes32,
) -> Bytes32 {
    let (Some(address), Some(key)) = (address.as_ref(), key.as_ref()) else {
        return Bytes32::ZERO;
    };
    with_host(context, Bytes32::ZERO, |host| host.get_storage(address, key))
}

unsafe extern "C" fn set_storage(
    context: *mut HostContext,
    address: *const Address,
    key: *const Bytes32,
    value: *const Bytes32,
) -> StorageStatus {
    let (Some(address), Some(key), Some(value)) = (address.as_ref(), key.as_ref(), value.as_ref())
    else {
        return StorageStatus::UNCHANGED;
    };
    with_host(context, StorageStatus::UNCHANGED, |host| {
        host.set_storage(address, key, value)
    })
}

unsafe extern "C" fn get_balance(context: *mut HostContext, address: *const Address) -> Bytes32 {
    let Some(address) = address.as_ref() else {
        return Bytes32::ZERO;
    };
    with_host(context, Bytes32::ZERO, |host| host.get_balance(address))
}

unsafe extern "C" fn get_code_size(context: *mut HostContext, address: *const Address) -> usize {
    let Some(address) = address.as_ref() else {
        return 0;
    };
    with_host(context, 0, |host| host.get_code_size(address))
}

unsafe extern "C" fn get_code_hash(context: *mut HostContext, address: *const Address) -> Bytes32 {
    let Some(address) = address.as_ref() else {
        return Bytes32::ZERO;
    };
    with_host(context, Bytes32::ZERO, |host| host.get_code_hash(address))
}

unsafe extern "C" fn copy_code(
    context: *mut HostContext,
    address: *const Address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize {
    let Some(address) = address.as_ref() else {
        return 0;
    };
    if buffer_data.is_null() || buffer_size == 0 {
        return 0;
    }
    let buffer = slice::from_raw_parts_mut(buffer_data, buffer_size);
    with_host(context, 0, |host| {
        host.copy_code(address, code_offset, buffer).min(buffer_size)
    })
}

unsafe extern "C" fn selfdestruct(
    context: *mut HostContext,
    address: *const Address,
    beneficiary: *const Address,
) {
    let (Some(address), Some(beneficiary)) = (address.as_ref(), beneficiary.as_ref()) else {
        return;
    };
    with_host(context, (), |host| host.selfdestruct(address, beneficiary))
}

unsafe extern "C" fn call(context: *mut HostContext, msg: *const Message) -> ExecutionResult {
    let Some(msg) = msg.as_ref() else {
        return ExecutionResult::failure(StatusCode::REJECTED);
    };
    let message = CallMessage::from_raw(msg);
    with_host(context, None, |host| Some(host.call(&message)))
        .map(|outcome| outcome.into_raw())
        .unwrap_or_else(|| ExecutionResult::failure(StatusCode::INTERNAL_ERROR))
}

unsafe extern "C" fn get_tx_context(context: *mut HostContext) -> TxContext {
    with_host(context, TxContext::default(), |host| host.tx_context())
}

unsafe extern "C" fn get_block_hash(context: *mut HostContext, number: i64) -> Bytes32 {
    with_host(context, Bytes32::ZERO, |host| host.block_hash(number))
}

unsafe extern "C" fn emit_log(
    context: *mut HostContext,
    address: *const Address,
    data: *const u8,
    data_size: usize,
    topics: *const Bytes32,
    topics_count: usize,
) {
    let Some(address) = address.as_ref() else {
        return;
    };
    let data = if data.is_null() || data_size == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(data, data_size)
    };
    let topics = if topics.is_null() || topics_count == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(topics, topics_count)
    };
    with_host(context, (), |host| host.emit_log(address, data, topics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory_host::MemoryHost, outcome::ExecutionOutcome};

    struct PanickingHost;

    impl Host for PanickingHost {
        fn account_exists(&mut self, _address: &Address) -> bool {
            panic!("state database unavailable")
        }
        fn get_storage(&mut self, _address: &Address, _key: &Bytes32) -> Bytes32 {
            Bytes32::from_u64(1)
        }
        fn set_storage(&mut self, _: &Address, _: &Bytes32, _: &Bytes32) -> StorageStatus {
            StorageStatus::MODIFIED
        }
        fn get_balance(&mut self, _address: &Address) -> Bytes32 {
            Bytes32::ZERO
        }
        fn get_code_size(&mut self, _address: &Address) -> usize {
            0
        }
        fn get_code_hash(&mut self, _address: &Address) -> Bytes32 {
            Bytes32::ZERO
        }
        fn copy_code(&mut self, _: &Address, _: usize, _: &mut [u8]) -> usize {
            0
        }
        fn selfdestruct(&mut self, _: &Address, _: &Address) {}
        fn call(&mut self, msg: &CallMessage) -> ExecutionOutcome {
            ExecutionOutcome::success(msg.gas, msg.gas, Vec::new())
        }
        fn tx_context(&mut self) -> TxContext {
            TxContext::default()
        }
        fn block_hash(&mut self, _number: i64) -> Bytes32 {
            Bytes32::ZERO
        }
        fn emit_log(&mut self, _: &Address, _: &[u8], _: &[Bytes32]) {}
    }

    #[test]
    fn test_callbacks_reach_host() {
        let mut host = MemoryHost::new().with_account(Address::new([1u8; 20]), Bytes32::from_u64(7));
        let mut session = ExecutionSession::new(&mut host);
        let context = session.context_ptr();
        let address = Address::new([1u8; 20]);

        unsafe {
            let table = &*(*context).host;
            assert!(table.account_exists.unwrap()(context, &address));
            assert_eq!(table.get_balance.unwrap()(context, &address).to_u64(), Some(7));

            let key = Bytes32::from_u64(3);
            let value = Bytes32::from_u64(4);
            assert_eq!(
                table.set_storage.unwrap()(context, &address, &key, &value),
                StorageStatus::ADDED
            );
            assert_eq!(table.get_storage.unwrap()(context, &address, &key), value);
        }

        assert_eq!(session.finish(), 4);
        assert_eq!(host.storage_at(&Address::new([1u8; 20]), &Bytes32::from_u64(3)).to_u64(), Some(4));
    }

    #[test]
    fn test_nested_call_result_is_released_by_host() {
        let mut host = MemoryHost::new();
        host.call_results
            .push_back(ExecutionOutcome::success(50, 20, vec![1, 2, 3]));
        let mut session = ExecutionSession::new(&mut host);
        let context = session.context_ptr();

        let msg = CallMessage::new(Address::new([2u8; 20]), 50).to_raw();
        unsafe {
            let result = HOST_INTERFACE.call.unwrap()(context, &msg);
            assert_eq!(result.output(), &[1, 2, 3]);
            assert_eq!(result.gas_left, 20);
            result.release();
        }
        session.finish();
    }

    #[test]
    fn test_null_arguments_yield_neutral_values() {
        let mut host = MemoryHost::new();
        let mut session = ExecutionSession::new(&mut host);
        let context = session.context_ptr();
        unsafe {
            assert!(!account_exists(context, std::ptr::null()));
            assert_eq!(copy_code(context, &Address::ZERO, 0, std::ptr::null_mut(), 4), 0);
            let result = call(context, std::ptr::null());
            assert_eq!(result.status_code, StatusCode::REJECTED);
            assert!(!account_exists(std::ptr::null_mut(), &Address::ZERO));
        }
        assert_eq!(session.finish(), 0);
    }

    #[test]
    fn test_host_panic_is_resumed_after_execution() {
        let mut host = PanickingHost;
        let mut session = ExecutionSession::new(&mut host);
        let context = session.context_ptr();

        unsafe {
            assert!(!account_exists(context, &Address::ZERO));
            // Later callbacks are short-circuited.
            assert_eq!(get_storage(context, &Address::ZERO, &Bytes32::ZERO), Bytes32::ZERO);
        }

        let resumed = panic::catch_unwind(AssertUnwindSafe(|| session.finish()));
        assert!(resumed.is_err());
    }
}
