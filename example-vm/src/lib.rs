//! Example connector module
//!
//! A small EVM interpreter published through the connector ABI. Built as a
//! `cdylib` it exports `vmc_create_example_vm`; built as an `rlib` the same
//! factory can be linked statically into a host.
//!
//! ```text
//!   vmc_create_example_vm()
//!          │
//!          ▼
//!   vmc-sdk instance ──► ExampleVm::execute ──► Interpreter
//!                                                  │
//!                              HostHandle ◄────────┘ SLOAD, CALL, LOG, ...
//! ```
//!
//! Instances are reentrant: a host may run nested calls on the instance that
//! is already executing.
//!
//! Supported options: `verbose` (`0`..=`2`) and `call_depth_limit`
//! (`1`..=`1024`).

pub mod config;
pub mod error;
pub mod gas;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod stack;
pub mod word;

use config::ExampleConfig;
use interpreter::Interpreter;
use std::ffi::CStr;
use vmc_sdk::{
    abi::{Revision, StatusCode},
    EvmModule, ExecutionMessage, HostHandle, ModuleError, OptionError, Output,
};

pub use config::MAX_CALL_DEPTH;
pub use error::ExecError;
pub use word::U256;

/// The example VM
#[derive(Debug, Default)]
pub struct ExampleVm {
    config: ExampleConfig,
}

impl ExampleVm {
    pub fn config(&self) -> &ExampleConfig {
        &self.config
    }
}

impl EvmModule for ExampleVm {
    const NAME: &'static CStr = c"example_vm";
    const VERSION: &'static CStr = c"0.2.0";
    // `execute` only reads the configuration.
    const REENTRANT: bool = true;

    fn initialize() -> Result<(), ModuleError> {
        let defined = opcodes::table().iter().filter(|op| op.is_some()).count();
        log::debug!("example_vm initialised ({} opcodes)", defined);
        Ok(())
    }

    fn new() -> Result<Self, ModuleError> {
        Ok(Self::default())
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        self.config.apply(name, value)
    }

    fn execute(
        &self,
        host: &mut HostHandle<'_>,
        rev: Revision,
        msg: &ExecutionMessage<'_>,
        code: &[u8],
    ) -> Output {
        if !rev.is_known() {
            log::warn!("rejecting unknown revision {}", rev.0);
            return Output::failure(StatusCode::REJECTED);
        }
        if msg.depth() > self.config.call_depth_limit {
            return Output::failure(StatusCode::CALL_DEPTH_EXCEEDED);
        }
        Interpreter::new(host, rev, msg, code, self.config).run()
    }
}

vmc_sdk::export_vm!(vmc_create_example_vm, ExampleVm);
