//! VM connector SDK
//!
//! This crate turns a Rust VM implementation into a loadable connector
//! module. Implement [`EvmModule`], export a factory with [`export_vm!`], and
//! build the crate as a `cdylib`:
//!
//! ```rust,ignore
//! use vmc_sdk::*;
//!
//! struct MyVm;
//!
//! impl EvmModule for MyVm {
//!     const NAME: &'static std::ffi::CStr = c"my_vm";
//!     const VERSION: &'static std::ffi::CStr = c"0.1.0";
//!
//!     fn new() -> Result<Self, ModuleError> {
//!         Ok(MyVm)
//!     }
//!
//!     fn execute(
//!         &self,
//!         host: &mut HostHandle<'_>,
//!         rev: abi::Revision,
//!         msg: &ExecutionMessage<'_>,
//!         code: &[u8],
//!     ) -> Output {
//!         Output::success(msg.gas(), Vec::new())
//!     }
//! }
//!
//! vmc_sdk::export_vm!(vmc_create_my_vm, MyVm);
//! ```
//!
//! # What the SDK guarantees at the boundary
//!
//! - The factory returns either a fully populated table or null.
//! - Process-wide setup ([`EvmModule::initialize`]) runs once, even when
//!   factories race on several threads.
//! - No panic crosses an entry point; it becomes a status code.
//! - Calls on destroyed instances and double destroys are detected through a
//!   live-instance registry and logged instead of touching freed memory.
//! - Output buffers are released by this module's allocator.
//!
//! A module built with `panic = "abort"` loses the panic conversion: a panic
//! then aborts the process. That is the only fatal class and is distinct
//! from execution failures, which are always status codes.

#![warn(missing_docs)]

pub mod error;
pub mod host;
pub mod instance;
pub mod message;
pub mod module;
pub mod output;
mod registry;

pub use vmc_abi as abi;

#[doc(hidden)]
pub use once_cell;

// Re-export main types
pub use error::{HostCallError, ModuleError, OptionError};
pub use host::{HostHandle, HostResult};
pub use instance::create;
pub use message::ExecutionMessage;
pub use module::EvmModule;
pub use output::Output;
pub use registry::live_instances;

/// Exports the module's factory function
///
/// Expands to one unmangled `extern "C"` function named `$symbol` that takes
/// no arguments and returns the capability table of a new `$module`
/// instance, or null on failure. The convention is `vmc_create_<module>`.
///
/// A public `#[no_mangle] extern "C"` item in a `cdylib` is exported with
/// default visibility on ELF/Mach-O targets and as `dllexport` on Windows,
/// so the crate only has to list `cdylib` in its `crate-type`.
///
/// ```rust,ignore
/// vmc_sdk::export_vm!(vmc_create_example_vm, ExampleVm);
/// ```
#[macro_export]
macro_rules! export_vm {
    ($symbol:ident, $module:ty) => {
        /// Creates a VM instance and returns its capability table, or null.
        #[no_mangle]
        pub extern "C" fn $symbol() -> *mut $crate::abi::VmInstance {
            static INIT: $crate::once_cell::sync::OnceCell<bool> =
                $crate::once_cell::sync::OnceCell::new();
            $crate::create::<$module>(&INIT)
        }
    };
}
