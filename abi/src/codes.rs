//! Integer codes exchanged across the boundary
//!
//! Each code is a transparent newtype over the C integer it travels as.
//! Unknown values received from a module stay representable; callers decide
//! how to treat them.

use serde::Serialize;
use std::fmt;

/// Outcome of one execution, reported in [`crate::ExecutionResult`]
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Execution finished successfully
    pub const SUCCESS: Self = Self(0);
    /// Generic execution failure
    pub const FAILURE: Self = Self(1);
    /// Execution terminated with REVERT; remaining gas and output are kept
    pub const REVERT: Self = Self(2);
    /// The gas limit was exhausted
    pub const OUT_OF_GAS: Self = Self(3);
    /// The designated INVALID instruction was hit
    pub const INVALID_INSTRUCTION: Self = Self(4);
    /// An opcode not defined for the active revision was hit
    pub const UNDEFINED_INSTRUCTION: Self = Self(5);
    /// The stack grew beyond its limit
    pub const STACK_OVERFLOW: Self = Self(6);
    /// An instruction needed more stack items than available
    pub const STACK_UNDERFLOW: Self = Self(7);
    /// A jump targeted something other than a JUMPDEST
    pub const BAD_JUMP_DESTINATION: Self = Self(8);
    /// Memory was accessed beyond what can be addressed
    pub const INVALID_MEMORY_ACCESS: Self = Self(9);
    /// The nested call depth limit was exceeded
    pub const CALL_DEPTH_EXCEEDED: Self = Self(10);
    /// A state modification was attempted in a static call
    pub const STATIC_MODE_VIOLATION: Self = Self(11);
    /// A precompiled contract failed
    pub const PRECOMPILE_FAILURE: Self = Self(12);
    /// Contract code failed validation
    pub const CONTRACT_VALIDATION_FAILURE: Self = Self(13);
    /// An argument was outside the range the VM supports
    pub const ARGUMENT_OUT_OF_RANGE: Self = Self(14);
    /// The VM failed internally; not the fault of the executed code
    pub const INTERNAL_ERROR: Self = Self(-1);
    /// The VM refused the request (protocol violation, unsupported input)
    pub const REJECTED: Self = Self(-2);
    /// The VM could not allocate memory
    pub const OUT_OF_MEMORY: Self = Self(-3);

    /// True for [`StatusCode::SUCCESS`]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// True for [`StatusCode::REVERT`]
    pub fn is_revert(self) -> bool {
        self == Self::REVERT
    }

    /// True for negative codes, which describe the VM rather than the code it ran
    pub fn is_vm_fault(self) -> bool {
        self.0 < 0
    }

    /// Symbolic name, or `"unknown"`
    pub fn name(self) -> &'static str {
        match self {
            Self::SUCCESS => "success",
            Self::FAILURE => "failure",
            Self::REVERT => "revert",
            Self::OUT_OF_GAS => "out of gas",
            Self::INVALID_INSTRUCTION => "invalid instruction",
            Self::UNDEFINED_INSTRUCTION => "undefined instruction",
            Self::STACK_OVERFLOW => "stack overflow",
            Self::STACK_UNDERFLOW => "stack underflow",
            Self::BAD_JUMP_DESTINATION => "bad jump destination",
            Self::INVALID_MEMORY_ACCESS => "invalid memory access",
            Self::CALL_DEPTH_EXCEEDED => "call depth exceeded",
            Self::STATIC_MODE_VIOLATION => "static mode violation",
            Self::PRECOMPILE_FAILURE => "precompile failure",
            Self::CONTRACT_VALIDATION_FAILURE => "contract validation failure",
            Self::ARGUMENT_OUT_OF_RANGE => "argument out of range",
            Self::INTERNAL_ERROR => "internal error",
            Self::REJECTED => "rejected",
            Self::OUT_OF_MEMORY => "out of memory",
            _ => "unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusCode({})", self)
    }
}

impl From<StatusCode> for String {
    fn from(status: StatusCode) -> Self {
        status.name().to_string()
    }
}

/// Kind of call a [`crate::Message`] describes
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallKind(pub i32);

impl CallKind {
    /// Regular call
    pub const CALL: Self = Self(0);
    /// Call with the caller's context
    pub const DELEGATECALL: Self = Self(1);
    /// Call with the caller's storage
    pub const CALLCODE: Self = Self(2);
    /// Contract creation
    pub const CREATE: Self = Self(3);
    /// Contract creation at a salted address
    pub const CREATE2: Self = Self(4);

    /// True for both creation kinds
    pub fn is_create(self) -> bool {
        self == Self::CREATE || self == Self::CREATE2
    }
}

/// Bit flags carried by a [`crate::Message`]
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MessageFlags(pub u32);

impl MessageFlags {
    /// No flags
    pub const NONE: Self = Self(0);
    /// The call may not modify state
    pub const STATIC: Self = Self(1);

    /// True if every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Protocol revision the code is executed under
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub i32);

impl Revision {
    /// Frontier
    pub const FRONTIER: Self = Self(0);
    /// Homestead
    pub const HOMESTEAD: Self = Self(1);
    /// Tangerine Whistle (EIP-150)
    pub const TANGERINE_WHISTLE: Self = Self(2);
    /// Spurious Dragon (EIP-158)
    pub const SPURIOUS_DRAGON: Self = Self(3);
    /// Byzantium
    pub const BYZANTIUM: Self = Self(4);
    /// Constantinople
    pub const CONSTANTINOPLE: Self = Self(5);
    /// Newest revision this ABI names
    pub const LATEST: Self = Self::CONSTANTINOPLE;

    /// True if this ABI names the revision
    pub fn is_known(self) -> bool {
        (Self::FRONTIER..=Self::LATEST).contains(&self)
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::LATEST
    }
}

/// Bitmask of what an instance can execute
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    /// No capabilities
    pub const NONE: Self = Self(0);
    /// EVM bytecode
    pub const EVM1: Self = Self(1 << 0);
    /// eWASM bytecode
    pub const EWASM: Self = Self(1 << 1);
    /// `execute` may run concurrently on the same instance
    pub const REENTRANT: Self = Self(1 << 2);

    /// True if every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both masks
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Result of `set_option`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetOptionResult(pub i32);

impl SetOptionResult {
    /// Option applied
    pub const SUCCESS: Self = Self(0);
    /// The module does not know the option name
    pub const INVALID_NAME: Self = Self(1);
    /// The value is not acceptable for this option
    pub const INVALID_VALUE: Self = Self(2);
    /// The instance is busy or no longer live
    pub const REJECTED: Self = Self(3);
}

/// Effect of a storage write, reported by the host
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StorageStatus(pub i32);

impl StorageStatus {
    /// The value was already equal to the new one
    pub const UNCHANGED: Self = Self(0);
    /// A non-zero original value was changed
    pub const MODIFIED: Self = Self(1);
    /// A value already modified in this transaction was changed again
    pub const MODIFIED_AGAIN: Self = Self(2);
    /// A zero value became non-zero
    pub const ADDED: Self = Self(3);
    /// A non-zero value became zero
    pub const DELETED: Self = Self(4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(StatusCode::SUCCESS.is_success());
        assert!(StatusCode::REVERT.is_revert());
        assert!(!StatusCode::OUT_OF_GAS.is_vm_fault());
        assert!(StatusCode::REJECTED.is_vm_fault());
        assert_eq!(StatusCode(1234).name(), "unknown");
        assert_eq!(StatusCode::OUT_OF_GAS.to_string(), "out of gas (3)");
    }

    #[test]
    fn test_capabilities_mask() {
        let caps = Capabilities::EVM1.with(Capabilities::REENTRANT);
        assert!(caps.contains(Capabilities::EVM1));
        assert!(caps.contains(Capabilities::REENTRANT));
        assert!(!caps.contains(Capabilities::EWASM));
        assert!(caps.contains(Capabilities::NONE));
    }

    #[test]
    fn test_revision_range() {
        assert!(Revision::FRONTIER.is_known());
        assert!(Revision::LATEST.is_known());
        assert!(!Revision(42).is_known());
        assert!(Revision::BYZANTIUM < Revision::CONSTANTINOPLE);
    }

    #[test]
    fn test_flags() {
        assert!(MessageFlags::STATIC.contains(MessageFlags::STATIC));
        assert!(!MessageFlags::NONE.contains(MessageFlags::STATIC));
        assert!(CallKind::CREATE2.is_create());
        assert!(!CallKind::DELEGATECALL.is_create());
    }
}
