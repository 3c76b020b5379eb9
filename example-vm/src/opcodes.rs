//! Instruction set
//!
//! The table is built once per process, on the first instance, and shared by
//! every interpreter afterwards.

use crate::gas;
use once_cell::sync::Lazy;
use vmc_sdk::abi::Revision;

pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const MOD: u8 = 0x06;
pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;
pub const NOT: u8 = 0x19;
pub const SHL: u8 = 0x1b;
pub const SHR: u8 = 0x1c;
pub const ADDRESS: u8 = 0x30;
pub const BALANCE: u8 = 0x31;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const RETURNDATASIZE: u8 = 0x3d;
pub const RETURNDATACOPY: u8 = 0x3e;
pub const BLOCKHASH: u8 = 0x40;
pub const COINBASE: u8 = 0x41;
pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;
pub const GASLIMIT: u8 = 0x45;
pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const PC: u8 = 0x58;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5a;
pub const JUMPDEST: u8 = 0x5b;
pub const PUSH1: u8 = 0x60;
pub const PUSH32: u8 = 0x7f;
pub const DUP1: u8 = 0x80;
pub const DUP16: u8 = 0x8f;
pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9f;
pub const LOG0: u8 = 0xa0;
pub const LOG4: u8 = 0xa4;
pub const CALL: u8 = 0xf1;
pub const RETURN: u8 = 0xf3;
pub const REVERT: u8 = 0xfd;
pub const INVALID: u8 = 0xfe;
pub const SELFDESTRUCT: u8 = 0xff;

/// Static properties of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub name: &'static str,
    /// Gas charged before anything else happens
    pub base_gas: i64,
    /// Items the instruction needs on the stack
    pub inputs: usize,
    /// Items it leaves on the stack
    pub outputs: usize,
    /// First revision that defines it
    pub since: Revision,
}

impl OpInfo {
    const fn new(name: &'static str, base_gas: i64, inputs: usize, outputs: usize) -> Self {
        Self {
            name,
            base_gas,
            inputs,
            outputs,
            since: Revision::FRONTIER,
        }
    }

    const fn since(mut self, revision: Revision) -> Self {
        self.since = revision;
        self
    }
}

/// Opcode table indexed by byte value; `None` for undefined opcodes
pub type OpTable = [Option<OpInfo>; 256];

static TABLE: Lazy<OpTable> = Lazy::new(build);

/// The shared table
pub fn table() -> &'static OpTable {
    &TABLE
}

/// Properties of `opcode` under `rev`, or `None` if undefined there
pub fn lookup(opcode: u8, rev: Revision) -> Option<&'static OpInfo> {
    table()[usize::from(opcode)]
        .as_ref()
        .filter(|info| info.since <= rev)
}

const PUSH_NAMES: [&str; 32] = [
    "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9", "PUSH10",
    "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17", "PUSH18", "PUSH19",
    "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25", "PUSH26", "PUSH27", "PUSH28",
    "PUSH29", "PUSH30", "PUSH31", "PUSH32",
];
const DUP_NAMES: [&str; 16] = [
    "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10", "DUP11",
    "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];
const SWAP_NAMES: [&str; 16] = [
    "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9", "SWAP10",
    "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];
const LOG_NAMES: [&str; 5] = ["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"];

fn build() -> OpTable {
    let mut table: OpTable = [None; 256];
    let mut set = |opcode: u8, info: OpInfo| table[usize::from(opcode)] = Some(info);

    set(STOP, OpInfo::new("STOP", gas::ZERO, 0, 0));
    set(ADD, OpInfo::new("ADD", gas::VERY_LOW, 2, 1));
    set(MUL, OpInfo::new("MUL", gas::LOW, 2, 1));
    set(SUB, OpInfo::new("SUB", gas::VERY_LOW, 2, 1));
    set(DIV, OpInfo::new("DIV", gas::LOW, 2, 1));
    set(MOD, OpInfo::new("MOD", gas::LOW, 2, 1));
    set(LT, OpInfo::new("LT", gas::VERY_LOW, 2, 1));
    set(GT, OpInfo::new("GT", gas::VERY_LOW, 2, 1));
    set(EQ, OpInfo::new("EQ", gas::VERY_LOW, 2, 1));
    set(ISZERO, OpInfo::new("ISZERO", gas::VERY_LOW, 1, 1));
    set(AND, OpInfo::new("AND", gas::VERY_LOW, 2, 1));
    set(OR, OpInfo::new("OR", gas::VERY_LOW, 2, 1));
    set(XOR, OpInfo::new("XOR", gas::VERY_LOW, 2, 1));
    set(NOT, OpInfo::new("NOT", gas::VERY_LOW, 1, 1));
    set(SHL, OpInfo::new("SHL", gas::VERY_LOW, 2, 1).since(Revision::CONSTANTINOPLE));
    set(SHR, OpInfo::new("SHR", gas::VERY_LOW, 2, 1).since(Revision::CONSTANTINOPLE));

    set(ADDRESS, OpInfo::new("ADDRESS", gas::BASE, 0, 1));
    set(BALANCE, OpInfo::new("BALANCE", gas::BALANCE, 1, 1));
    set(CALLER, OpInfo::new("CALLER", gas::BASE, 0, 1));
    set(CALLVALUE, OpInfo::new("CALLVALUE", gas::BASE, 0, 1));
    set(CALLDATALOAD, OpInfo::new("CALLDATALOAD", gas::VERY_LOW, 1, 1));
    set(CALLDATASIZE, OpInfo::new("CALLDATASIZE", gas::BASE, 0, 1));
    set(CALLDATACOPY, OpInfo::new("CALLDATACOPY", gas::VERY_LOW, 3, 0));
    set(
        RETURNDATASIZE,
        OpInfo::new("RETURNDATASIZE", gas::BASE, 0, 1).since(Revision::BYZANTIUM),
    );
    set(
        RETURNDATACOPY,
        OpInfo::new("RETURNDATACOPY", gas::VERY_LOW, 3, 0).since(Revision::BYZANTIUM),
    );

    set(BLOCKHASH, OpInfo::new("BLOCKHASH", gas::BLOCKHASH, 1, 1));
    set(COINBASE, OpInfo::new("COINBASE", gas::BASE, 0, 1));
    set(TIMESTAMP, OpInfo::new("TIMESTAMP", gas::BASE, 0, 1));
    set(NUMBER, OpInfo::new("NUMBER", gas::BASE, 0, 1));
    set(GASLIMIT, OpInfo::new("GASLIMIT", gas::BASE, 0, 1));

    set(POP, OpInfo::new("POP", gas::BASE, 1, 0));
    set(MLOAD, OpInfo::new("MLOAD", gas::VERY_LOW, 1, 1));
    set(MSTORE, OpInfo::new("MSTORE", gas::VERY_LOW, 2, 0));
    set(MSTORE8, OpInfo::new("MSTORE8", gas::VERY_LOW, 2, 0));
    set(SLOAD, OpInfo::new("SLOAD", gas::SLOAD, 1, 1));
    // Charged dynamically from the slot's current value.
    set(SSTORE, OpInfo::new("SSTORE", gas::ZERO, 2, 0));
    set(JUMP, OpInfo::new("JUMP", gas::MID, 1, 0));
    set(JUMPI, OpInfo::new("JUMPI", gas::HIGH, 2, 0));
    set(PC, OpInfo::new("PC", gas::BASE, 0, 1));
    set(MSIZE, OpInfo::new("MSIZE", gas::BASE, 0, 1));
    set(GAS, OpInfo::new("GAS", gas::BASE, 0, 1));
    set(JUMPDEST, OpInfo::new("JUMPDEST", gas::JUMPDEST, 0, 0));

    for (i, name) in PUSH_NAMES.iter().enumerate() {
        set(PUSH1 + i as u8, OpInfo::new(name, gas::VERY_LOW, 0, 1));
    }
    for (i, name) in DUP_NAMES.iter().enumerate() {
        set(DUP1 + i as u8, OpInfo::new(name, gas::VERY_LOW, i + 1, i + 2));
    }
    for (i, name) in SWAP_NAMES.iter().enumerate() {
        set(SWAP1 + i as u8, OpInfo::new(name, gas::VERY_LOW, i + 2, i + 2));
    }
    for (i, name) in LOG_NAMES.iter().enumerate() {
        let base = gas::LOG + gas::LOG_TOPIC * i as i64;
        set(LOG0 + i as u8, OpInfo::new(name, base, i + 2, 0));
    }

    set(CALL, OpInfo::new("CALL", gas::CALL, 7, 1));
    set(RETURN, OpInfo::new("RETURN", gas::ZERO, 2, 0));
    set(REVERT, OpInfo::new("REVERT", gas::ZERO, 2, 0).since(Revision::BYZANTIUM));
    set(INVALID, OpInfo::new("INVALID", gas::ZERO, 0, 0));
    set(SELFDESTRUCT, OpInfo::new("SELFDESTRUCT", gas::SELFDESTRUCT, 1, 0));

    log::debug!(
        "built opcode table with {} instructions",
        table.iter().filter(|entry| entry.is_some()).count()
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_filled() {
        assert_eq!(lookup(PUSH32, Revision::LATEST).unwrap().name, "PUSH32");
        assert_eq!(lookup(DUP16, Revision::LATEST).unwrap().inputs, 16);
        assert_eq!(lookup(SWAP16, Revision::LATEST).unwrap().outputs, 17);
        assert_eq!(lookup(LOG4, Revision::LATEST).unwrap().base_gas, 375 * 5);
    }

    #[test]
    fn test_revision_gating() {
        assert!(lookup(SHL, Revision::BYZANTIUM).is_none());
        assert!(lookup(SHL, Revision::CONSTANTINOPLE).is_some());
        assert!(lookup(REVERT, Revision::HOMESTEAD).is_none());
        assert!(lookup(RETURNDATASIZE, Revision::BYZANTIUM).is_some());
    }

    #[test]
    fn test_undefined_opcodes() {
        assert!(lookup(0x0c, Revision::LATEST).is_none());
        assert!(lookup(0xef, Revision::LATEST).is_none());
    }
}
