//! VM Connector ABI
//!
//! This crate defines the binary contract between a host (an Ethereum-style
//! client) and a dynamically loaded VM module. Nothing here executes code;
//! it only fixes the layout of the structures and function pointers that
//! cross the boundary, so that modules and hosts built by different
//! toolchains can talk to each other.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Host process              │
//! │  (vmc-host: loads module, owns handle)  │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  │ <module>_create()
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │     VmInstance (capability table)       │
//! │  abi_version | name | version           │
//! │  destroy | execute                      │  <- ABI 1, frozen
//! │  get_capabilities | set_option          │  <- ABI 2, trailing
//! └────────────────┬────────────────────────┘
//!                  │ execute(instance, context, rev, msg, code)
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │        VM module (vmc-sdk based)        │
//! │  reads Message, calls HostInterface     │
//! │  returns ExecutionResult (+ release)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Enumerations that cross the boundary are `#[repr(transparent)]` integer
//! newtypes, so a value this crate does not know about is still a valid Rust
//! value on the receiving side.

#![warn(missing_docs)]
#![deny(clippy::arithmetic_side_effects)]

pub mod codes;
pub mod error;
pub mod host;
pub mod instance;
pub mod message;
pub mod result;
pub mod types;

// Re-export main types
pub use codes::{Capabilities, CallKind, MessageFlags, Revision, SetOptionResult, StatusCode, StorageStatus};
pub use error::{AbiError, Result};
pub use host::{HostContext, HostInterface, TxContext};
pub use instance::{
    is_supported_abi_version, CreateFn, VmInstance, VmInstanceV1, ABI_VERSION, MIN_ABI_VERSION,
    OPTIONS_ABI_VERSION,
};
pub use message::Message;
pub use result::ExecutionResult;
pub use types::{Address, Bytes32};
