//! Owned execution request

use vmc_abi::{Address, Bytes32, CallKind, Message, MessageFlags};

/// Owned counterpart of [`Message`]
///
/// The host builds one of these and lends it to the module for the duration
/// of a single `execute`; [`CallMessage::to_raw`] borrows the input buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMessage {
    /// Account whose code runs
    pub destination: Address,
    /// Caller
    pub sender: Address,
    /// Value transferred, big-endian
    pub value: Bytes32,
    /// Call data
    pub input: Vec<u8>,
    /// Hash of the code, if known
    pub code_hash: Bytes32,
    /// Salt for CREATE2
    pub create2_salt: Bytes32,
    /// Gas limit
    pub gas: i64,
    /// Nesting depth
    pub depth: i32,
    /// Call kind
    pub kind: CallKind,
    /// Message flags
    pub flags: MessageFlags,
}

impl CallMessage {
    /// Plain call to `destination` with `gas`
    pub fn new(destination: Address, gas: i64) -> Self {
        Self {
            destination,
            gas,
            ..Self::default()
        }
    }

    /// Sets the caller
    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Sets the call data
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = input.into();
        self
    }

    /// Sets the transferred value
    pub fn with_value(mut self, value: Bytes32) -> Self {
        self.value = value;
        self
    }

    /// Sets the call kind
    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the nesting depth
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Marks the message as static
    pub fn into_static(mut self) -> Self {
        self.flags = MessageFlags(self.flags.0 | MessageFlags::STATIC.0);
        self
    }

    /// True if state modification is forbidden
    pub fn is_static(&self) -> bool {
        self.flags.contains(MessageFlags::STATIC)
    }

    /// Boundary view; borrows `self.input`
    pub fn to_raw(&self) -> Message {
        Message {
            destination: self.destination,
            sender: self.sender,
            value: self.value,
            input_data: self.input.as_ptr(),
            input_size: self.input.len(),
            code_hash: self.code_hash,
            create2_salt: self.create2_salt,
            gas: self.gas,
            depth: self.depth,
            kind: self.kind,
            flags: self.flags,
        }
    }

    /// Copies a message received from a module
    ///
    /// # Safety
    /// The input buffer of `raw` must be valid for `input_size` bytes, or null.
    pub unsafe fn from_raw(raw: &Message) -> Self {
        Self {
            destination: raw.destination,
            sender: raw.sender,
            value: raw.value,
            input: raw.input().to_vec(),
            code_hash: raw.code_hash,
            create2_salt: raw.create2_salt,
            gas: raw.gas,
            depth: raw.depth,
            kind: raw.kind,
            flags: raw.flags,
        }
    }
}
