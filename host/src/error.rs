//! Error types for the host adapter

use thiserror::Error;
use vmc_abi::{AbiError, StatusCode};

/// Result type for host adapter operations
pub type Result<T> = std::result::Result<T, HostError>;

/// Errors reported by the host side of the boundary
///
/// Execution failures inside the VM are not errors here; they arrive as a
/// status code in [`crate::ExecutionOutcome`]. These variants cover contract
/// violations and misuse of the adapter itself.
#[derive(Debug, Error)]
pub enum HostError {
    /// The factory returned null
    #[error("Module factory returned no instance")]
    ConstructionFailed,

    /// The table's `abi_version` is outside the supported range
    #[error("Unsupported ABI version {found} (supported {min}..={max})")]
    UnsupportedAbiVersion {
        /// Version found in the table
        found: i32,
        /// Oldest supported version
        min: i32,
        /// Newest supported version
        max: i32,
    },

    /// A mandatory table entry is null
    #[error("Capability table has no `{0}` entry")]
    MissingEntry(&'static str),

    /// The module predates `set_option`
    #[error("Module with ABI version {0} does not accept options")]
    OptionsUnsupported(i32),

    /// The module does not know the option
    #[error("Unknown option `{0}`")]
    InvalidOptionName(String),

    /// The module rejected the option's value
    #[error("Invalid value `{value}` for option `{name}`")]
    InvalidOptionValue {
        /// Option name
        name: String,
        /// Rejected value
        value: String,
    },

    /// The module refused to change the option right now
    #[error("Option `{0}` rejected by the module")]
    OptionRejected(String),

    /// The module answered `set_option` with a code this host does not know
    #[error("Option `{name}` failed with unknown code {code}")]
    OptionFailed {
        /// Option name
        name: String,
        /// Raw result code
        code: i32,
    },

    /// The message cannot be sent to the module
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The module reported more gas left than it was given
    #[error("Module returned gas_left {gas_left} outside [0, {gas_limit}] with status {status}")]
    GasOutOfRange {
        /// Reported status
        status: StatusCode,
        /// Reported gas left
        gas_left: i64,
        /// Gas the message carried
        gas_limit: i64,
    },

    /// The instance behind a shared handle has been destroyed
    #[error("VM instance has been destroyed")]
    Destroyed,

    /// The dynamic library could not be opened
    #[error("Failed to load module {path}: {reason}")]
    Load {
        /// Library path
        path: String,
        /// Loader error
        reason: String,
    },

    /// None of the factory symbol candidates exists in the library
    #[error("No factory symbol in {path} (tried {tried:?})")]
    MissingFactory {
        /// Library path
        path: String,
        /// Symbols looked up
        tried: Vec<String>,
    },

    /// A string could not cross the boundary
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// Host configuration could not be parsed or is out of range
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::Config(err.to_string())
    }
}
