//! Execution errors

use thiserror::Error;
use vmc_sdk::{abi::StatusCode, HostCallError};

/// Result type for interpreter steps
pub type Result<T> = std::result::Result<T, ExecError>;

/// Reasons an execution stops abnormally
///
/// Every variant maps to one status code; none of them carries gas, because
/// all abnormal stops consume the whole budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("Out of gas")]
    OutOfGas,

    #[error("Stack overflow")]
    StackOverflow,

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Jump to invalid destination {0}")]
    BadJumpDestination(u64),

    #[error("INVALID instruction")]
    InvalidInstruction,

    #[error("Undefined instruction {0:#04x}")]
    UndefinedInstruction(u8),

    #[error("Memory access out of range")]
    InvalidMemoryAccess,

    #[error("State modification in static call")]
    StaticModeViolation,

    #[error("Host callback failed: {0}")]
    Host(#[from] HostCallError),
}

impl ExecError {
    /// Status code reported across the boundary
    pub fn status(&self) -> StatusCode {
        match self {
            ExecError::OutOfGas => StatusCode::OUT_OF_GAS,
            ExecError::StackOverflow => StatusCode::STACK_OVERFLOW,
            ExecError::StackUnderflow => StatusCode::STACK_UNDERFLOW,
            ExecError::BadJumpDestination(_) => StatusCode::BAD_JUMP_DESTINATION,
            ExecError::InvalidInstruction => StatusCode::INVALID_INSTRUCTION,
            ExecError::UndefinedInstruction(_) => StatusCode::UNDEFINED_INSTRUCTION,
            ExecError::InvalidMemoryAccess => StatusCode::INVALID_MEMORY_ACCESS,
            ExecError::StaticModeViolation => StatusCode::STATIC_MODE_VIOLATION,
            ExecError::Host(_) => StatusCode::REJECTED,
        }
    }
}
