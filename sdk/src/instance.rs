//! Instance allocation and the `extern "C"` entry points of the table
//!
//! The capability table is the first field of a `#[repr(C)]` box, so the
//! table pointer handed to the host is also the instance pointer. Entry
//! points check the live-instance registry before casting it back, and run
//! module code inside `catch_unwind` so no panic unwinds into the host.

use crate::{
    host::HostHandle, message::ExecutionMessage, module::EvmModule, output::Output, registry,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::{
    ffi::CStr,
    mem,
    os::raw::c_char,
    panic::{self, AssertUnwindSafe},
    ptr, slice,
};
use vmc_abi::{
    Capabilities, ExecutionResult, HostContext, Message, Revision, SetOptionResult, StatusCode,
    VmInstance, ABI_VERSION,
};

#[repr(C)]
struct Instance<M: EvmModule> {
    table: VmInstance,
    module: RwLock<M>,
}

fn module_name<M: EvmModule>() -> &'static str {
    M::NAME.to_str().unwrap_or("<module>")
}

/// Factory body behind [`crate::export_vm!`]
///
/// Runs [`EvmModule::initialize`] once per process (guarded by `init`),
/// builds an instance and returns its table. Returns null if initialisation
/// failed now or earlier, or if the instance could not be built; a table is
/// never handed out half-populated.
pub fn create<M: EvmModule>(init: &OnceCell<bool>) -> *mut VmInstance {
    let ready = *init.get_or_init(|| match panic::catch_unwind(M::initialize) {
        Ok(Ok(())) => {
            log::debug!("{} initialised", module_name::<M>());
            true
        }
        Ok(Err(err)) => {
            log::error!("{}: {}", module_name::<M>(), err);
            false
        }
        Err(_) => {
            log::error!("{}: panic during initialisation", module_name::<M>());
            false
        }
    });
    if !ready {
        return ptr::null_mut();
    }

    let module = match panic::catch_unwind(M::new) {
        Ok(Ok(module)) => module,
        Ok(Err(err)) => {
            log::error!("{}: {}", module_name::<M>(), err);
            return ptr::null_mut();
        }
        Err(_) => {
            log::error!("{}: panic during construction", module_name::<M>());
            return ptr::null_mut();
        }
    };

    let instance = Box::new(Instance {
        table: VmInstance {
            abi_version: ABI_VERSION,
            name: M::NAME.as_ptr(),
            version: M::VERSION.as_ptr(),
            destroy: Some(destroy::<M>),
            execute: Some(execute::<M>),
            get_capabilities: Some(get_capabilities::<M>),
            set_option: Some(set_option::<M>),
        },
        module: RwLock::new(module),
    });

    let raw = Box::into_raw(instance);
    registry::register::<M>(raw as usize);
    log::debug!("{}: created instance {:p}", module_name::<M>(), raw);
    raw.cast()
}

/// Resolves a table pointer to a live instance without dereferencing unknown addresses
unsafe fn live<'a, M: EvmModule>(instance: *mut VmInstance) -> Option<&'a Instance<M>> {
    if instance.is_null() || !registry::contains::<M>(instance as usize) {
        return None;
    }
    Some(&*instance.cast::<Instance<M>>())
}

unsafe extern "C" fn destroy<M: EvmModule>(instance: *mut VmInstance) {
    // Leaving the registry first stops new calls from resolving the instance.
    // A call that resolved it earlier still races with the free below; the
    // host must not overlap `destroy` with other calls on the instance.
    if !registry::remove::<M>(instance as usize) {
        log::error!(
            "{}: destroy on unknown or already destroyed instance {:p}",
            module_name::<M>(),
            instance
        );
        return;
    }

    let owned = instance.cast::<Instance<M>>();
    match (*owned).module.try_write() {
        // Never released: the lock stays taken until the instance is freed,
        // so a late call that reaches it is rejected rather than run.
        Some(guard) => mem::forget(guard),
        None => {
            // Freeing under a running call would be worse than leaking.
            log::error!(
                "{}: destroy while instance {:p} is in use; instance leaked",
                module_name::<M>(),
                instance
            );
            return;
        }
    }

    if panic::catch_unwind(AssertUnwindSafe(|| drop(Box::from_raw(owned)))).is_err() {
        log::error!("{}: panic while dropping instance {:p}", module_name::<M>(), instance);
    } else {
        log::debug!("{}: destroyed instance {:p}", module_name::<M>(), instance);
    }
}

unsafe extern "C" fn execute<M: EvmModule>(
    instance: *mut VmInstance,
    context: *mut HostContext,
    rev: Revision,
    msg: *const Message,
    code: *const u8,
    code_size: usize,
) -> ExecutionResult {
    let Some(instance) = live::<M>(instance) else {
        log::error!(
            "{}: execute on unknown or destroyed instance {:p}",
            module_name::<M>(),
            instance
        );
        return ExecutionResult::failure(StatusCode::REJECTED);
    };
    let Some(raw) = msg.as_ref() else {
        log::error!("{}: execute with null message", module_name::<M>());
        return ExecutionResult::failure(StatusCode::REJECTED);
    };
    if raw.gas < 0 {
        return ExecutionResult::failure(StatusCode::ARGUMENT_OUT_OF_RANGE);
    }

    let code = if code.is_null() || code_size == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(code, code_size)
    };
    let message = ExecutionMessage::new(raw);
    let mut host = HostHandle::from_raw(context);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if M::REENTRANT {
            instance
                .module
                .try_read()
                .map(|module| module.execute(&mut host, rev, &message, code))
        } else {
            instance
                .module
                .try_write()
                .map(|module| module.execute(&mut host, rev, &message, code))
        }
    }));

    match outcome {
        Ok(Some(output)) => output.into_result(),
        Ok(None) => {
            log::error!("{}: concurrent call on a non-reentrant instance rejected", module_name::<M>());
            ExecutionResult::failure(StatusCode::REJECTED)
        }
        Err(_) => {
            log::error!("{}: panic during execution", module_name::<M>());
            Output::failure(StatusCode::INTERNAL_ERROR).into_result()
        }
    }
}

unsafe extern "C" fn get_capabilities<M: EvmModule>(instance: *mut VmInstance) -> Capabilities {
    let Some(instance) = live::<M>(instance) else {
        log::error!("{}: get_capabilities on unknown or destroyed instance", module_name::<M>());
        return Capabilities::NONE;
    };
    let caps = panic::catch_unwind(AssertUnwindSafe(|| {
        instance.module.try_read().map(|module| module.capabilities())
    }));
    match caps {
        Ok(Some(caps)) if M::REENTRANT => caps.with(Capabilities::REENTRANT),
        Ok(Some(caps)) => caps,
        Ok(None) | Err(_) => Capabilities::NONE,
    }
}

unsafe extern "C" fn set_option<M: EvmModule>(
    instance: *mut VmInstance,
    name: *const c_char,
    value: *const c_char,
) -> SetOptionResult {
    let Some(instance) = live::<M>(instance) else {
        log::error!("{}: set_option on unknown or destroyed instance", module_name::<M>());
        return SetOptionResult::REJECTED;
    };
    if name.is_null() {
        return SetOptionResult::INVALID_NAME;
    }
    if value.is_null() {
        return SetOptionResult::INVALID_VALUE;
    }
    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return SetOptionResult::INVALID_NAME;
    };
    let Ok(value) = CStr::from_ptr(value).to_str() else {
        return SetOptionResult::INVALID_VALUE;
    };

    let applied = panic::catch_unwind(AssertUnwindSafe(|| {
        instance
            .module
            .try_write()
            .map(|mut module| module.set_option(name, value))
    }));

    match applied {
        Ok(Some(Ok(()))) => {
            log::debug!("{}: option {} = {}", module_name::<M>(), name, value);
            SetOptionResult::SUCCESS
        }
        Ok(Some(Err(crate::OptionError::UnknownName(_)))) => SetOptionResult::INVALID_NAME,
        Ok(Some(Err(crate::OptionError::InvalidValue { .. }))) => SetOptionResult::INVALID_VALUE,
        Ok(None) => {
            log::error!("{}: set_option while instance is in use rejected", module_name::<M>());
            SetOptionResult::REJECTED
        }
        Err(_) => {
            log::error!("{}: panic in set_option", module_name::<M>());
            SetOptionResult::INVALID_VALUE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModuleError, OptionError};
    use std::{ffi::CString, sync::atomic::{AtomicBool, Ordering}};

    struct Echo {
        prefix: u8,
    }

    impl EvmModule for Echo {
        const NAME: &'static CStr = c"echo";
        const VERSION: &'static CStr = c"0.1.0";

        fn new() -> Result<Self, ModuleError> {
            Ok(Self { prefix: 0 })
        }

        fn set_option(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
            match name {
                "prefix" => {
                    self.prefix = value.parse().map_err(|_| OptionError::InvalidValue {
                        name: name.to_string(),
                        value: value.to_string(),
                    })?;
                    Ok(())
                }
                _ => Err(OptionError::UnknownName(name.to_string())),
            }
        }

        fn execute(
            &self,
            _host: &mut HostHandle<'_>,
            _rev: Revision,
            msg: &ExecutionMessage<'_>,
            code: &[u8],
        ) -> Output {
            if code == b"panic" {
                panic!("requested");
            }
            let mut data = vec![self.prefix];
            data.extend_from_slice(msg.input());
            Output::success(msg.gas() / 2, data)
        }
    }

    struct Broken;

    static BROKEN_INIT_RAN: AtomicBool = AtomicBool::new(false);

    impl EvmModule for Broken {
        const NAME: &'static CStr = c"broken";
        const VERSION: &'static CStr = c"0.0.0";

        fn initialize() -> Result<(), ModuleError> {
            assert!(!BROKEN_INIT_RAN.swap(true, Ordering::SeqCst), "init ran twice");
            Err(ModuleError::Init("no backend".to_string()))
        }

        fn new() -> Result<Self, ModuleError> {
            Ok(Self)
        }

        fn execute(&self, _: &mut HostHandle<'_>, _: Revision, _: &ExecutionMessage<'_>, _: &[u8]) -> Output {
            Output::failure(StatusCode::FAILURE)
        }
    }

    fn echo() -> *mut VmInstance {
        static INIT: OnceCell<bool> = OnceCell::new();
        create::<Echo>(&INIT)
    }

    unsafe fn run(instance: *mut VmInstance, input: &[u8], code: &[u8], gas: i64) -> Output {
        let msg = Message { input_data: input.as_ptr(), input_size: input.len(), gas, ..Message::default() };
        let execute = (*instance).execute.unwrap();
        let result = execute(instance, ptr::null_mut(), Revision::LATEST, &msg, code.as_ptr(), code.len());
        Output::from_result(result)
    }

    #[test]
    fn test_table_is_fully_populated() {
        let instance = echo();
        assert!(!instance.is_null());
        unsafe {
            let table = &*instance;
            assert_eq!(table.abi_version, ABI_VERSION);
            assert_eq!(CStr::from_ptr(table.name).to_str().unwrap(), "echo");
            assert_eq!(CStr::from_ptr(table.version).to_str().unwrap(), "0.1.0");
            assert!(table.destroy.is_some());
            assert!(table.execute.is_some());
            assert!(table.get_capabilities.is_some());
            assert!(table.set_option.is_some());
            (table.destroy.unwrap())(instance);
        }
    }

    #[test]
    fn test_execute_and_destroy() {
        let instance = echo();
        unsafe {
            let output = run(instance, &[1, 2], b"", 100);
            assert_eq!(output, Output::success(50, vec![0, 1, 2]));
            let caps = ((*instance).get_capabilities.unwrap())(instance);
            assert_eq!(caps, Capabilities::EVM1);
            ((*instance).destroy.unwrap())(instance);
        }
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let instance = echo();
        unsafe {
            let output = run(instance, &[], b"panic", 100);
            assert_eq!(output.status, StatusCode::INTERNAL_ERROR);
            assert_eq!(output.gas_left, 0);
            // The instance stays usable after a caught panic.
            assert!(run(instance, &[], b"", 10).status.is_success());
            ((*instance).destroy.unwrap())(instance);
        }
    }

    #[test]
    fn test_negative_gas_rejected() {
        let instance = echo();
        unsafe {
            let output = run(instance, &[], b"", -1);
            assert_eq!(output.status, StatusCode::ARGUMENT_OUT_OF_RANGE);
            ((*instance).destroy.unwrap())(instance);
        }
    }

    #[test]
    fn test_set_option_results() {
        let instance = echo();
        let set = |name: &str, value: &str| unsafe {
            let name = CString::new(name).unwrap();
            let value = CString::new(value).unwrap();
            ((*instance).set_option.unwrap())(instance, name.as_ptr(), value.as_ptr())
        };
        assert_eq!(set("prefix", "7"), SetOptionResult::SUCCESS);
        assert_eq!(set("prefix", "seven"), SetOptionResult::INVALID_VALUE);
        assert_eq!(set("colour", "red"), SetOptionResult::INVALID_NAME);
        unsafe {
            assert_eq!(run(instance, &[], b"", 0).data, vec![7]);
            ((*instance).destroy.unwrap())(instance);
        }
    }

    #[test]
    fn test_failed_init_yields_null_every_time() {
        static INIT: OnceCell<bool> = OnceCell::new();
        assert!(create::<Broken>(&INIT).is_null());
        assert!(create::<Broken>(&INIT).is_null());
        assert!(BROKEN_INIT_RAN.load(Ordering::SeqCst));
    }

    #[test]
    fn test_instance_of_other_module_type_rejected() {
        let instance = echo();
        unsafe {
            let msg = Message { gas: 10, ..Message::default() };
            let result = execute::<Broken>(instance, ptr::null_mut(), Revision::LATEST, &msg, ptr::null(), 0);
            assert_eq!(result.status_code, StatusCode::REJECTED);
            result.release();
            assert_eq!(get_capabilities::<Broken>(instance), Capabilities::NONE);
            assert_eq!(
                set_option::<Broken>(instance, c"prefix".as_ptr(), c"1".as_ptr()),
                SetOptionResult::REJECTED
            );

            // A destroy through the wrong type leaves the instance alone.
            destroy::<Broken>(instance);
            assert!(run(instance, &[], b"", 10).status.is_success());
            ((*instance).destroy.unwrap())(instance);
        }
    }

    #[test]
    fn test_destroy_while_in_use_leaks() {
        let instance = echo();
        unsafe {
            let owned = instance.cast::<Instance<Echo>>();
            let guard = (*owned).module.read();
            ((*instance).destroy.unwrap())(instance);

            // Unregistered but not freed: later calls are rejected.
            assert!(!registry::contains::<Echo>(instance as usize));
            assert_eq!(run(instance, &[], b"", 10).status, StatusCode::REJECTED);

            drop(guard);
            drop(Box::from_raw(owned));
        }
    }

    #[test]
    fn test_concurrent_execute_rejected_on_non_reentrant() {
        let instance = echo();
        unsafe {
            let owned = &*instance.cast::<Instance<Echo>>();
            let guard = owned.module.write();
            let output = run(instance, &[], b"", 10);
            assert_eq!(output.status, StatusCode::REJECTED);
            drop(guard);
            ((*instance).destroy.unwrap())(instance);
        }
    }
}
