//! The trait a VM implementation provides

use crate::{
    error::{ModuleError, OptionError},
    host::HostHandle,
    message::ExecutionMessage,
    output::Output,
};
use std::ffi::CStr;
use vmc_abi::{Capabilities, Revision};

/// A VM implementation that can be published as a connector module
///
/// The SDK owns every instance behind the capability table; implementors
/// never see raw pointers. Each instance is guarded by a read-write lock:
/// `execute` runs under the write side (or the read side when
/// [`EvmModule::REENTRANT`] is set) and `set_option` always under the write
/// side, so conflicting calls from a misbehaving host are rejected rather than
/// raced.
pub trait EvmModule: Sized + Send + Sync + 'static {
    /// Implementation name reported in the table
    const NAME: &'static CStr;

    /// Implementation version reported in the table
    const VERSION: &'static CStr;

    /// Whether `execute` may run concurrently on one instance
    const REENTRANT: bool = false;

    /// Process-wide setup, run at most once before the first instance
    fn initialize() -> Result<(), ModuleError> {
        Ok(())
    }

    /// Builds a fully initialised instance
    fn new() -> Result<Self, ModuleError>;

    /// Capabilities of this instance; [`Capabilities::REENTRANT`] is added
    /// automatically when [`EvmModule::REENTRANT`] is set
    fn capabilities(&self) -> Capabilities {
        Capabilities::EVM1
    }

    /// Applies a configuration option
    fn set_option(&mut self, name: &str, _value: &str) -> Result<(), OptionError> {
        Err(OptionError::UnknownName(name.to_string()))
    }

    /// Runs one message
    ///
    /// Execution failures are reported through the returned [`Output`]'s
    /// status. A panic is caught by the SDK and reported as
    /// `INTERNAL_ERROR`.
    fn execute(
        &self,
        host: &mut HostHandle<'_>,
        rev: Revision,
        msg: &ExecutionMessage<'_>,
        code: &[u8],
    ) -> Output;
}
