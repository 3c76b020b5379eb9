//! Execution request passed to `execute`

use crate::{
    codes::{CallKind, MessageFlags},
    types::{Address, Bytes32},
};
use std::{ptr, slice};

/// Parameters of one call or creation
///
/// The host owns the message and the input buffer it points to. Both are
/// valid only for the duration of the `execute` call that received them;
/// a module must copy whatever it wants to keep.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Message {
    /// Account whose code runs (the created address is decided by the host for creations)
    pub destination: Address,
    /// Caller of this message
    pub sender: Address,
    /// Value transferred, big-endian
    pub value: Bytes32,
    /// Call data; may be null when `input_size` is zero
    pub input_data: *const u8,
    /// Length of the call data
    pub input_size: usize,
    /// Hash of the code being executed, if the host knows it
    pub code_hash: Bytes32,
    /// Salt for CREATE2
    pub create2_salt: Bytes32,
    /// Gas limit for this message; never negative
    pub gas: i64,
    /// Nesting depth, 0 for the outermost call
    pub depth: i32,
    /// Call kind
    pub kind: CallKind,
    /// Flags such as [`MessageFlags::STATIC`]
    pub flags: MessageFlags,
}

impl Message {
    /// Call data as a slice
    ///
    /// # Safety
    /// `input_data` must be valid for `input_size` bytes for the lifetime of
    /// the returned slice, or be null.
    pub unsafe fn input(&self) -> &[u8] {
        if self.input_data.is_null() || self.input_size == 0 {
            &[]
        } else {
            slice::from_raw_parts(self.input_data, self.input_size)
        }
    }

    /// True if the message forbids state modification
    pub fn is_static(&self) -> bool {
        self.flags.contains(MessageFlags::STATIC)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self {
            destination: Address::ZERO,
            sender: Address::ZERO,
            value: Bytes32::ZERO,
            input_data: ptr::null(),
            input_size: 0,
            code_hash: Bytes32::ZERO,
            create2_salt: Bytes32::ZERO,
            gas: 0,
            depth: 0,
            kind: CallKind::CALL,
            flags: MessageFlags::NONE,
        }
    }
}
