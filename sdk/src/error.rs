//! Error types for module authors

use thiserror::Error;

/// Failure of a host callback as seen from the module
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostCallError {
    /// `execute` was called with a null host context
    #[error("No host context was supplied")]
    NoContext,

    /// The host left a callback entry null
    #[error("Host does not provide `{0}`")]
    MissingCallback(&'static str),
}

/// Rejection of a `set_option` request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionError {
    /// The option name is not known to the module
    #[error("Unknown option `{0}`")]
    UnknownName(String),

    /// The value is not acceptable for the option
    #[error("Invalid value `{value}` for option `{name}`")]
    InvalidValue {
        /// Option name
        name: String,
        /// Rejected value
        value: String,
    },
}

/// Failure while bringing a module or an instance up
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// Process-wide initialisation failed
    #[error("Module initialisation failed: {0}")]
    Init(String),

    /// A single instance could not be constructed
    #[error("Instance construction failed: {0}")]
    Construction(String),
}
