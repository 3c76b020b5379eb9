//! Safe view of the message passed to `execute`

use vmc_abi::{Address, Bytes32, CallKind, Message};

/// Borrowed view of a [`Message`] and its call data
///
/// Lives no longer than the `execute` call it was built for.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionMessage<'a> {
    raw: &'a Message,
    input: &'a [u8],
}

impl<'a> ExecutionMessage<'a> {
    /// Wraps a raw message
    ///
    /// # Safety
    /// The message's input pointer must be valid for `input_size` bytes for `'a`.
    pub unsafe fn new(raw: &'a Message) -> Self {
        Self { raw, input: raw.input() }
    }

    /// The raw message
    pub fn raw(&self) -> &'a Message {
        self.raw
    }

    /// Account whose code runs
    pub fn destination(&self) -> Address {
        self.raw.destination
    }

    /// Caller
    pub fn sender(&self) -> Address {
        self.raw.sender
    }

    /// Transferred value
    pub fn value(&self) -> Bytes32 {
        self.raw.value
    }

    /// Call data
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Gas limit
    pub fn gas(&self) -> i64 {
        self.raw.gas
    }

    /// Nesting depth
    pub fn depth(&self) -> i32 {
        self.raw.depth
    }

    /// Call kind
    pub fn kind(&self) -> CallKind {
        self.raw.kind
    }

    /// True if state modification is forbidden
    pub fn is_static(&self) -> bool {
        self.raw.is_static()
    }
}
