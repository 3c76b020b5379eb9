//! Capability table returned by a module's factory
//!
//! # Versioning
//!
//! `abi_version` is the first field of every table and the only one a host
//! may read before it has recognized the version. The ABI 1 prefix
//! ([`VmInstanceV1`]) is frozen forever. Later versions only append fields;
//! a host reads a trailing field only after checking `abi_version`.
//!
//! | version | fields                                           |
//! |---------|--------------------------------------------------|
//! | 1       | abi_version, name, version, destroy, execute     |
//! | 2       | + get_capabilities, set_option                   |

use crate::{
    codes::{Capabilities, Revision, SetOptionResult},
    host::HostContext,
    message::Message,
    result::ExecutionResult,
};
use std::os::raw::c_char;

/// Current ABI version
pub const ABI_VERSION: i32 = 2;

/// Oldest ABI version a host built from this crate still understands
pub const MIN_ABI_VERSION: i32 = 1;

/// First ABI version whose table carries `get_capabilities` and `set_option`
pub const OPTIONS_ABI_VERSION: i32 = 2;

/// True if a table with this `abi_version` can be used
pub fn is_supported_abi_version(version: i32) -> bool {
    (MIN_ABI_VERSION..=ABI_VERSION).contains(&version)
}

/// Module entry point: builds an instance and returns its table, or null
pub type CreateFn = unsafe extern "C" fn() -> *mut VmInstance;

/// Releases the instance; called exactly once, with nothing else in flight
pub type DestroyFn = unsafe extern "C" fn(instance: *mut VmInstance);

/// Executes one message against the instance
pub type ExecuteFn = unsafe extern "C" fn(
    instance: *mut VmInstance,
    context: *mut HostContext,
    rev: Revision,
    msg: *const Message,
    code: *const u8,
    code_size: usize,
) -> ExecutionResult;

/// Reports the capabilities of the instance (ABI >= 2)
pub type GetCapabilitiesFn = unsafe extern "C" fn(instance: *mut VmInstance) -> Capabilities;

/// Sets a named option from NUL-terminated strings (ABI >= 2)
pub type SetOptionFn = unsafe extern "C" fn(
    instance: *mut VmInstance,
    name: *const c_char,
    value: *const c_char,
) -> SetOptionResult;

/// ABI 1 layout; the frozen prefix of every later table
#[repr(C)]
#[derive(Debug)]
pub struct VmInstanceV1 {
    /// Structural version of the table
    pub abi_version: i32,
    /// Implementation name, NUL-terminated
    pub name: *const c_char,
    /// Implementation version, NUL-terminated
    pub version: *const c_char,
    /// See [`DestroyFn`]
    pub destroy: Option<DestroyFn>,
    /// See [`ExecuteFn`]
    pub execute: Option<ExecuteFn>,
}

/// Current capability table
///
/// A module allocates one per instance and keeps it alive until `destroy`.
/// The host never writes to it.
#[repr(C)]
#[derive(Debug)]
pub struct VmInstance {
    /// Structural version of the table
    pub abi_version: i32,
    /// Implementation name, NUL-terminated
    pub name: *const c_char,
    /// Implementation version, NUL-terminated
    pub version: *const c_char,
    /// See [`DestroyFn`]
    pub destroy: Option<DestroyFn>,
    /// See [`ExecuteFn`]
    pub execute: Option<ExecuteFn>,
    /// See [`GetCapabilitiesFn`]; ABI >= 2
    pub get_capabilities: Option<GetCapabilitiesFn>,
    /// See [`SetOptionFn`]; ABI >= 2
    pub set_option: Option<SetOptionFn>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_supported_versions() {
        assert!(is_supported_abi_version(1));
        assert!(is_supported_abi_version(ABI_VERSION));
        assert!(!is_supported_abi_version(0));
        assert!(!is_supported_abi_version(-7));
        assert!(!is_supported_abi_version(3));
        assert!(!is_supported_abi_version(i32::MAX));
    }

    #[test]
    fn test_v1_prefix_is_frozen() {
        assert_eq!(offset_of!(VmInstance, abi_version), offset_of!(VmInstanceV1, abi_version));
        assert_eq!(offset_of!(VmInstance, name), offset_of!(VmInstanceV1, name));
        assert_eq!(offset_of!(VmInstance, version), offset_of!(VmInstanceV1, version));
        assert_eq!(offset_of!(VmInstance, destroy), offset_of!(VmInstanceV1, destroy));
        assert_eq!(offset_of!(VmInstance, execute), offset_of!(VmInstanceV1, execute));
        assert_eq!(offset_of!(VmInstance, abi_version), 0);
    }

    #[test]
    fn test_trailing_fields_follow_prefix() {
        assert!(offset_of!(VmInstance, get_capabilities) >= size_of::<VmInstanceV1>());
        assert!(offset_of!(VmInstance, set_option) > offset_of!(VmInstance, get_capabilities));
    }

    #[test]
    fn test_nullable_entries_are_pointer_sized() {
        assert_eq!(size_of::<Option<DestroyFn>>(), size_of::<usize>());
        assert_eq!(size_of::<Option<ExecuteFn>>(), size_of::<usize>());
    }
}
