//! Result returned by `execute` and by the host's `call` callback

use crate::{codes::StatusCode, types::Address};
use std::{ptr, slice};

/// Frees the buffers owned by an [`ExecutionResult`]
///
/// The function lives in the binary that produced the result, so memory is
/// always returned to the allocator that handed it out.
pub type ReleaseResultFn = unsafe extern "C" fn(result: *const ExecutionResult);

/// Outcome of one execution
///
/// The recipient owns the result: it copies whatever output it needs and then
/// calls [`ExecutionResult::release`] exactly once. The type is deliberately
/// neither `Clone` nor `Copy`.
#[repr(C)]
#[derive(Debug)]
pub struct ExecutionResult {
    /// Status of the execution
    pub status_code: StatusCode,
    /// Gas left; meaningful for success and revert, zero otherwise
    pub gas_left: i64,
    /// Output or revert data; may be null when `output_size` is zero
    pub output_data: *const u8,
    /// Length of the output
    pub output_size: usize,
    /// Releases `output_data`; null if nothing needs freeing
    pub release: Option<ReleaseResultFn>,
    /// Address of the created account, for successful creations
    pub create_address: Address,
    /// Reserved, keeps the struct size a multiple of 8
    pub padding: [u8; 4],
}

impl ExecutionResult {
    /// Builds a result that owns `output`
    ///
    /// The output is moved into a boxed slice and the release entry is set
    /// to a function compiled into the calling binary.
    pub fn new(
        status_code: StatusCode,
        gas_left: i64,
        output: Vec<u8>,
        create_address: Option<Address>,
    ) -> Self {
        let (output_data, output_size, release) = if output.is_empty() {
            (ptr::null(), 0, None)
        } else {
            let boxed = output.into_boxed_slice();
            let size = boxed.len();
            let data = Box::into_raw(boxed).cast::<u8>() as *const u8;
            (data, size, Some(release_boxed_output as ReleaseResultFn))
        };

        Self {
            status_code,
            gas_left,
            output_data,
            output_size,
            release,
            create_address: create_address.unwrap_or_default(),
            padding: [0u8; 4],
        }
    }

    /// Result without output and without gas left
    pub fn failure(status_code: StatusCode) -> Self {
        Self::new(status_code, 0, Vec::new(), None)
    }

    /// Output as a slice
    ///
    /// # Safety
    /// The result must not have been released, and `output_data` must be
    /// valid for `output_size` bytes (or null).
    pub unsafe fn output(&self) -> &[u8] {
        if self.output_data.is_null() || self.output_size == 0 {
            &[]
        } else {
            slice::from_raw_parts(self.output_data, self.output_size)
        }
    }

    /// Calls the release entry, consuming the result
    ///
    /// # Safety
    /// The result must have come from a conforming producer and must not have
    /// been released before (copies made with `ptr::read` count).
    pub unsafe fn release(self) {
        if let Some(release) = self.release {
            release(&self as *const ExecutionResult);
        }
    }
}

unsafe extern "C" fn release_boxed_output(result: *const ExecutionResult) {
    if result.is_null() {
        return;
    }
    let result = &*result;
    if !result.output_data.is_null() {
        let raw = ptr::slice_from_raw_parts_mut(result.output_data as *mut u8, result.output_size);
        drop(Box::from_raw(raw));
    }
}
