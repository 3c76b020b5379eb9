//! Owning handle over a module instance

use crate::{
    config::HostConfig,
    error::{HostError, Result},
    host::Host,
    message::CallMessage,
    outcome::ExecutionOutcome,
    session::ExecutionSession,
};
use libloading::Library;
use std::{
    ffi::{CStr, CString},
    fmt,
    os::raw::c_char,
    ptr::{self, NonNull},
    sync::Arc,
};
use vmc_abi::{
    instance::{DestroyFn, ExecuteFn, GetCapabilitiesFn, SetOptionFn},
    is_supported_abi_version, AbiError, Capabilities, CreateFn, Revision, SetOptionResult, VmInstance,
    VmInstanceV1, ABI_VERSION, MIN_ABI_VERSION, OPTIONS_ABI_VERSION,
};

/// Host-side handle over one VM instance
///
/// The handle owns the instance: dropping it (or calling [`Vm::destroy`])
/// calls the module's `destroy` exactly once. It is move-only, so a
/// destroyed instance can never be reached again through it, and `execute`
/// and `set_option` take `&mut self`, so no two calls overlap on one handle.
/// Use [`crate::SharedVm`] to share an instance between threads.
///
/// # Example
///
/// ```rust,ignore
/// use vmc_host::{CallMessage, MemoryHost, Module};
///
/// let module = Module::open("libexample_vm.so")?;
/// let mut vm = module.create()?;
/// let mut host = MemoryHost::new();
///
/// let msg = CallMessage::new(Address::ZERO, 100_000);
/// let outcome = vm.execute(&mut host, Revision::LATEST, &msg, &[0x00])?;
/// println!("{} used {} gas", outcome.status, outcome.gas_used());
/// ```
pub struct Vm {
    instance: NonNull<VmInstance>,
    abi_version: i32,
    name: String,
    version: String,
    destroy_fn: DestroyFn,
    execute_fn: ExecuteFn,
    get_capabilities_fn: Option<GetCapabilitiesFn>,
    set_option_fn: Option<SetOptionFn>,
    capabilities: Capabilities,
    // Declared last: the library must outlive the destroy call.
    _library: Option<Arc<Library>>,
}

// The module contract allows an instance to be used from any thread as long
// as calls do not overlap, which `&mut self` and `SharedVm` enforce.
unsafe impl Send for Vm {}
unsafe impl Sync for Vm {}

impl Vm {
    /// Default gas limit for messages built by the test runner
    pub const DEFAULT_GAS_LIMIT: i64 = 10_000_000;

    /// Largest gas limit a message may carry
    pub const MAX_GAS_LIMIT: i64 = 1_000_000_000_000;

    /// Takes ownership of a table returned by a module factory
    ///
    /// Only `abi_version` is read until it is known to be supported. A table
    /// with an unsupported version is leaked: none of its function pointers
    /// is trusted, including `destroy`.
    ///
    /// # Safety
    /// `instance` must be null or the untouched result of a factory call,
    /// and must not be used by the caller afterwards.
    pub unsafe fn from_raw(instance: *mut VmInstance) -> Result<Self> {
        Self::adopt(instance, None)
    }

    /// Calls a statically linked factory and adopts its table
    ///
    /// # Safety
    /// `factory` must be a connector factory: it returns null or a table it
    /// hands over to the caller.
    pub unsafe fn from_factory(factory: CreateFn) -> Result<Self> {
        Self::adopt(factory(), None)
    }

    pub(crate) unsafe fn adopt(
        instance: *mut VmInstance,
        library: Option<Arc<Library>>,
    ) -> Result<Self> {
        let Some(instance) = NonNull::new(instance) else {
            log::warn!("module factory returned null");
            return Err(HostError::ConstructionFailed);
        };

        let abi_version = ptr::addr_of!((*instance.as_ptr()).abi_version).read();
        if !is_supported_abi_version(abi_version) {
            log::warn!(
                "leaking instance with unsupported ABI version {} (supported {}..={})",
                abi_version,
                MIN_ABI_VERSION,
                ABI_VERSION
            );
            return Err(HostError::UnsupportedAbiVersion {
                found: abi_version,
                min: MIN_ABI_VERSION,
                max: ABI_VERSION,
            });
        }

        let header = &*instance.as_ptr().cast::<VmInstanceV1>();
        let Some(destroy_fn) = header.destroy else {
            log::warn!("leaking instance without a destroy entry");
            return Err(HostError::MissingEntry("destroy"));
        };
        let Some(execute_fn) = header.execute else {
            destroy_fn(instance.as_ptr());
            return Err(HostError::MissingEntry("execute"));
        };
        let name = read_c_str(header.name);
        let version = read_c_str(header.version);

        let (get_capabilities_fn, set_option_fn) = if abi_version >= OPTIONS_ABI_VERSION {
            let table = &*instance.as_ptr();
            (table.get_capabilities, table.set_option)
        } else {
            (None, None)
        };

        let mut vm = Self {
            instance,
            abi_version,
            name,
            version,
            destroy_fn,
            execute_fn,
            get_capabilities_fn,
            set_option_fn,
            capabilities: Capabilities::EVM1,
            _library: library,
        };
        vm.capabilities = vm.query_capabilities();

        log::debug!(
            "adopted {} {} (ABI {}, capabilities {:#x})",
            vm.name,
            vm.version,
            vm.abi_version,
            vm.capabilities.0
        );
        Ok(vm)
    }

    /// ABI version of the module's table
    pub fn abi_version(&self) -> i32 {
        self.abi_version
    }

    /// Implementation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Implementation version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Capabilities as last reported by the module
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn query_capabilities(&self) -> Capabilities {
        match self.get_capabilities_fn {
            Some(get_capabilities) => unsafe { get_capabilities(self.instance.as_ptr()) },
            None => Capabilities::EVM1,
        }
    }

    /// Executes `code` for `msg`
    ///
    /// VM-level failures are reported in the outcome's status. Errors are
    /// returned for messages that cannot be sent and for results that break
    /// the gas contract. A panic raised by `host` is resumed here once the
    /// module has returned.
    pub fn execute(
        &mut self,
        host: &mut dyn Host,
        rev: Revision,
        msg: &CallMessage,
        code: &[u8],
    ) -> Result<ExecutionOutcome> {
        unsafe { self.dispatch(host, rev, msg, code) }
    }

    /// Shared-reference execution
    ///
    /// # Safety
    /// The caller guarantees overlapping calls are allowed: either the module
    /// reported [`Capabilities::REENTRANT`] or no other call is in flight.
    pub(crate) unsafe fn dispatch(
        &self,
        host: &mut dyn Host,
        rev: Revision,
        msg: &CallMessage,
        code: &[u8],
    ) -> Result<ExecutionOutcome> {
        if msg.gas < 0 || msg.gas > Self::MAX_GAS_LIMIT {
            return Err(HostError::InvalidMessage(format!(
                "gas {} outside [0, {}]",
                msg.gas,
                Self::MAX_GAS_LIMIT
            )));
        }
        if msg.depth < 0 {
            return Err(HostError::InvalidMessage(format!("negative depth {}", msg.depth)));
        }

        let raw = msg.to_raw();
        let mut session = ExecutionSession::new(host);
        let result = (self.execute_fn)(
            self.instance.as_ptr(),
            session.context_ptr(),
            rev,
            &raw,
            code.as_ptr(),
            code.len(),
        );
        let outcome = ExecutionOutcome::from_raw(result, msg.gas);
        let callbacks = session.finish();

        log::trace!(
            "{} executed {} bytes: {} with {} gas left after {} host callbacks",
            self.name,
            code.len(),
            outcome.status,
            outcome.gas_left,
            callbacks
        );

        if outcome.gas_left < 0 || outcome.gas_left > msg.gas {
            return Err(HostError::GasOutOfRange {
                status: outcome.status,
                gas_left: outcome.gas_left,
                gas_limit: msg.gas,
            });
        }
        Ok(outcome)
    }

    /// Sets a named option
    ///
    /// Capabilities are queried again after a successful change.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let Some(set_option) = self.set_option_fn else {
            return Err(HostError::OptionsUnsupported(self.abi_version));
        };
        let c_name = CString::new(name).map_err(|_| AbiError::InteriorNul(name.to_string()))?;
        let c_value = CString::new(value).map_err(|_| AbiError::InteriorNul(value.to_string()))?;

        match unsafe { set_option(self.instance.as_ptr(), c_name.as_ptr(), c_value.as_ptr()) } {
            SetOptionResult::SUCCESS => {
                self.capabilities = self.query_capabilities();
                log::debug!("{}: option {} = {}", self.name, name, value);
                Ok(())
            }
            SetOptionResult::INVALID_NAME => Err(HostError::InvalidOptionName(name.to_string())),
            SetOptionResult::INVALID_VALUE => Err(HostError::InvalidOptionValue {
                name: name.to_string(),
                value: value.to_string(),
            }),
            SetOptionResult::REJECTED => Err(HostError::OptionRejected(name.to_string())),
            other => Err(HostError::OptionFailed {
                name: name.to_string(),
                code: other.0,
            }),
        }
    }

    /// Applies every option in `config`, stopping at the first failure
    pub fn configure(&mut self, config: &HostConfig) -> Result<()> {
        config.validate()?;
        for (name, value) in &config.options {
            self.set_option(name, value)?;
        }
        Ok(())
    }

    /// Destroys the instance now
    pub fn destroy(self) {
        drop(self)
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        log::debug!("destroying {} instance", self.name);
        unsafe { (self.destroy_fn)(self.instance.as_ptr()) };
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("abi_version", &self.abi_version)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

unsafe fn read_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_host::MemoryHost;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use vmc_abi::{Address, ExecutionResult, HostContext, Message, StatusCode};

    #[repr(C)]
    struct Fake<T> {
        table: T,
        destroys: AtomicUsize,
        executes: AtomicUsize,
        capabilities: AtomicU32,
        gas_left: i64,
    }

    unsafe fn fake<'a, T>(instance: *mut VmInstance) -> &'a Fake<T> {
        &*instance.cast::<Fake<T>>()
    }

    unsafe extern "C" fn fake_destroy<T>(instance: *mut VmInstance) {
        fake::<T>(instance).destroys.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn fake_execute<T>(
        instance: *mut VmInstance,
        _context: *mut HostContext,
        _rev: Revision,
        msg: *const Message,
        _code: *const u8,
        _code_size: usize,
    ) -> ExecutionResult {
        let fake = fake::<T>(instance);
        fake.executes.fetch_add(1, Ordering::SeqCst);
        let gas_left = if fake.gas_left < 0 { (*msg).gas } else { fake.gas_left };
        ExecutionResult::new(StatusCode::SUCCESS, gas_left, vec![0x2a], None)
    }

    unsafe extern "C" fn fake_capabilities(instance: *mut VmInstance) -> Capabilities {
        Capabilities(fake::<VmInstance>(instance).capabilities.load(Ordering::SeqCst))
    }

    unsafe extern "C" fn fake_set_option(
        instance: *mut VmInstance,
        name: *const c_char,
        _value: *const c_char,
    ) -> SetOptionResult {
        match CStr::from_ptr(name).to_bytes() {
            b"ewasm" => {
                fake::<VmInstance>(instance)
                    .capabilities
                    .store(Capabilities::EVM1.with(Capabilities::EWASM).0, Ordering::SeqCst);
                SetOptionResult::SUCCESS
            }
            b"bad" => SetOptionResult::INVALID_VALUE,
            b"busy" => SetOptionResult::REJECTED,
            b"odd" => SetOptionResult(42),
            _ => SetOptionResult::INVALID_NAME,
        }
    }

    fn v2_table(abi_version: i32) -> VmInstance {
        VmInstance {
            abi_version,
            name: c"fake".as_ptr(),
            version: c"1.0".as_ptr(),
            destroy: Some(fake_destroy::<VmInstance>),
            execute: Some(fake_execute::<VmInstance>),
            get_capabilities: Some(fake_capabilities),
            set_option: Some(fake_set_option),
        }
    }

    fn boxed<T>(table: T, gas_left: i64) -> *mut Fake<T> {
        Box::into_raw(Box::new(Fake {
            table,
            destroys: AtomicUsize::new(0),
            executes: AtomicUsize::new(0),
            capabilities: AtomicU32::new(Capabilities::EVM1.0),
            gas_left,
        }))
    }

    #[test]
    fn test_null_instance_is_construction_failure() {
        let err = unsafe { Vm::from_raw(ptr::null_mut()) }.unwrap_err();
        assert!(matches!(err, HostError::ConstructionFailed));
    }

    #[test]
    fn test_unsupported_version_touches_no_entry() {
        for version in [0, -1, ABI_VERSION + 1, 99] {
            let raw = boxed(v2_table(version), -1);
            let err = unsafe { Vm::from_raw(raw.cast()) }.unwrap_err();
            assert!(matches!(err, HostError::UnsupportedAbiVersion { found, .. } if found == version));

            let fake = unsafe { Box::from_raw(raw) };
            assert_eq!(fake.destroys.load(Ordering::SeqCst), 0);
            assert_eq!(fake.executes.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_execute_and_destroy_once() {
        let raw = boxed(v2_table(ABI_VERSION), 7);
        let mut vm = unsafe { Vm::from_raw(raw.cast()) }.unwrap();
        assert_eq!(vm.name(), "fake");
        assert_eq!(vm.version(), "1.0");

        let mut host = MemoryHost::new();
        let msg = CallMessage::new(Address::ZERO, 10);
        let outcome = vm.execute(&mut host, Revision::LATEST, &msg, &[0x00]).unwrap();
        assert_eq!(outcome.status, StatusCode::SUCCESS);
        assert_eq!(outcome.output, vec![0x2a]);
        assert_eq!(outcome.gas_used(), 3);

        vm.destroy();
        let fake = unsafe { Box::from_raw(raw) };
        assert_eq!(fake.destroys.load(Ordering::SeqCst), 1);
        assert_eq!(fake.executes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abi_v1_table_has_no_options() {
        let table = VmInstanceV1 {
            abi_version: 1,
            name: c"old".as_ptr(),
            version: ptr::null(),
            destroy: Some(fake_destroy::<VmInstanceV1>),
            execute: Some(fake_execute::<VmInstanceV1>),
        };
        let raw = boxed(table, -1);
        let mut vm = unsafe { Vm::from_raw(raw.cast()) }.unwrap();
        assert_eq!(vm.capabilities(), Capabilities::EVM1);
        assert_eq!(vm.version(), "");
        assert!(matches!(vm.set_option("x", "y"), Err(HostError::OptionsUnsupported(1))));

        let mut host = MemoryHost::new();
        let outcome = vm
            .execute(&mut host, Revision::LATEST, &CallMessage::new(Address::ZERO, 5), &[])
            .unwrap();
        assert_eq!(outcome.gas_left, 5);

        drop(vm);
        let fake = unsafe { Box::from_raw(raw) };
        assert_eq!(fake.destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_option_results() {
        let raw = boxed(v2_table(ABI_VERSION), -1);
        let mut vm = unsafe { Vm::from_raw(raw.cast()) }.unwrap();

        assert!(!vm.capabilities().contains(Capabilities::EWASM));
        vm.set_option("ewasm", "on").unwrap();
        assert!(vm.capabilities().contains(Capabilities::EWASM));

        assert!(matches!(vm.set_option("nope", "1"), Err(HostError::InvalidOptionName(_))));
        assert!(matches!(vm.set_option("bad", "1"), Err(HostError::InvalidOptionValue { .. })));
        assert!(matches!(vm.set_option("busy", "1"), Err(HostError::OptionRejected(_))));
        assert!(matches!(
            vm.set_option("odd", "1"),
            Err(HostError::OptionFailed { code: 42, .. })
        ));
        assert!(matches!(vm.set_option("a\0b", "1"), Err(HostError::Abi(_))));

        drop(vm);
        drop(unsafe { Box::from_raw(raw) });
    }

    #[test]
    fn test_missing_entries() {
        let mut table = v2_table(ABI_VERSION);
        table.execute = None;
        let raw = boxed(table, -1);
        let err = unsafe { Vm::from_raw(raw.cast()) }.unwrap_err();
        assert!(matches!(err, HostError::MissingEntry("execute")));
        let fake = unsafe { Box::from_raw(raw) };
        assert_eq!(fake.destroys.load(Ordering::SeqCst), 1);

        let mut table = v2_table(ABI_VERSION);
        table.destroy = None;
        let raw = boxed(table, -1);
        let err = unsafe { Vm::from_raw(raw.cast()) }.unwrap_err();
        assert!(matches!(err, HostError::MissingEntry("destroy")));
        drop(unsafe { Box::from_raw(raw) });
    }

    #[test]
    fn test_gas_contract_is_checked() {
        let raw = boxed(v2_table(ABI_VERSION), 11);
        let mut vm = unsafe { Vm::from_raw(raw.cast()) }.unwrap();
        let mut host = MemoryHost::new();

        let err = vm
            .execute(&mut host, Revision::LATEST, &CallMessage::new(Address::ZERO, 10), &[])
            .unwrap_err();
        assert!(matches!(err, HostError::GasOutOfRange { gas_left: 11, gas_limit: 10, .. }));

        let err = vm
            .execute(&mut host, Revision::LATEST, &CallMessage::new(Address::ZERO, -1), &[])
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidMessage(_)));

        drop(vm);
        let fake = unsafe { Box::from_raw(raw) };
        assert_eq!(fake.executes.load(Ordering::SeqCst), 1);
    }
}
