//! VM connector host adapter
//!
//! This crate is the host side of the connector ABI. It loads a module,
//! validates the capability table it returns, and wraps it in an owning
//! handle that turns the raw contract into safe Rust:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             Client (host)               │
//! │  implements Host over its state         │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  │ Module::open / Vm::from_factory
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │        vmc-host (this crate)            │
//! │  ┌─────────────────────────────────┐    │
//! │  │    Vm / SharedVm                │    │
//! │  │  - abi_version check            │    │
//! │  │  - destroy exactly once         │    │
//! │  │  - gas contract check           │    │
//! │  └─────────────────────────────────┘    │
//! │  ┌─────────────────────────────────┐    │
//! │  │    ExecutionSession             │    │
//! │  │  - HostContext header           │    │
//! │  │  - callback trampolines         │    │
//! │  │  - host panic capture           │    │
//! │  └─────────────────────────────────┘    │
//! └────────────────┬────────────────────────┘
//!                  │ execute(instance, context, rev, msg, code)
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │       VM module (cdylib or rlib)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use vmc_host::{CallMessage, MemoryHost, Vm};
//!
//! let mut vm = unsafe { Vm::from_factory(vmc_example_vm::vmc_create_example_vm) }?;
//! vm.set_option("verbose", "1")?;
//!
//! let mut host = MemoryHost::new();
//! let msg = CallMessage::new(Address::ZERO, 100_000);
//! let outcome = vm.execute(&mut host, Revision::LATEST, &msg, &[0x00])?;
//! assert!(outcome.is_success());
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod memory_host;
pub mod message;
pub mod outcome;
pub mod session;
pub mod shared;
pub mod vm;

pub use vmc_abi as abi;

// Re-export main types
pub use config::HostConfig;
pub use error::{HostError, Result};
pub use host::Host;
pub use loader::{factory_symbols, Module};
pub use memory_host::{Account, LogRecord, MemoryHost};
pub use message::CallMessage;
pub use outcome::ExecutionOutcome;
pub use session::ExecutionSession;
pub use shared::SharedVm;
pub use vm::Vm;
