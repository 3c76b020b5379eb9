//! Bytecode interpreter
//!
//! One [`Interpreter`] runs one message. Gas is charged before every effect:
//! the opcode's base cost first, then memory expansion and dynamic costs,
//! and only then does the instruction touch memory, the stack or the host.

use crate::{
    config::ExampleConfig,
    error::{ExecError, Result},
    gas,
    memory::Memory,
    opcodes::{self, *},
    stack::{Stack, STACK_LIMIT},
    word::U256,
};
use vmc_sdk::{
    abi::{Address, Bytes32, CallKind, Message, Revision, TxContext},
    ExecutionMessage, HostHandle, Output,
};

/// How a successful run ended
#[derive(Debug, PartialEq, Eq)]
enum Halt {
    Stop,
    Return(Vec<u8>),
    Revert(Vec<u8>),
}

pub struct Interpreter<'r, 'h> {
    host: &'r mut HostHandle<'h>,
    msg: &'r ExecutionMessage<'r>,
    rev: Revision,
    code: &'r [u8],
    config: ExampleConfig,
    jump_dests: Vec<bool>,
    stack: Stack,
    memory: Memory,
    return_data: Vec<u8>,
    tx_context: Option<TxContext>,
    gas_left: i64,
    pc: usize,
}

impl<'r, 'h> Interpreter<'r, 'h> {
    pub fn new(
        host: &'r mut HostHandle<'h>,
        rev: Revision,
        msg: &'r ExecutionMessage<'r>,
        code: &'r [u8],
        config: ExampleConfig,
    ) -> Self {
        Self {
            host,
            msg,
            rev,
            code,
            config,
            jump_dests: analyze_jump_dests(code),
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Vec::new(),
            tx_context: None,
            gas_left: msg.gas(),
            pc: 0,
        }
    }

    /// Runs to completion
    pub fn run(mut self) -> Output {
        let halt = self.run_loop();
        if self.config.verbose >= 1 {
            log::debug!(
                "depth {} ran {} bytes: {:?} ({} of {} gas left)",
                self.msg.depth(),
                self.code.len(),
                halt,
                self.gas_left,
                self.msg.gas()
            );
        }

        match halt {
            Ok(Halt::Stop) => Output::success(self.gas_left, Vec::new()),
            Ok(Halt::Return(data)) => Output::success(self.gas_left, data),
            Ok(Halt::Revert(data)) => Output::revert(self.gas_left, data),
            Err(err) => Output::failure(err.status()),
        }
    }

    fn run_loop(&mut self) -> Result<Halt> {
        while let Some(&opcode) = self.code.get(self.pc) {
            let info = opcodes::lookup(opcode, self.rev)
                .ok_or(ExecError::UndefinedInstruction(opcode))?;

            let depth = self.stack.len();
            if depth < info.inputs {
                return Err(ExecError::StackUnderflow);
            }
            if depth - info.inputs + info.outputs > STACK_LIMIT {
                return Err(ExecError::StackOverflow);
            }
            self.consume(info.base_gas)?;

            if self.config.verbose >= 2 {
                log::trace!(
                    "{:>5} {:<14} gas={} stack={}",
                    self.pc,
                    info.name,
                    self.gas_left,
                    depth
                );
            }

            if let Some(halt) = self.step(opcode)? {
                return Ok(halt);
            }
        }
        Ok(Halt::Stop)
    }

    fn consume(&mut self, amount: i64) -> Result<()> {
        if amount > self.gas_left {
            self.gas_left = 0;
            return Err(ExecError::OutOfGas);
        }
        self.gas_left -= amount;
        Ok(())
    }

    /// Charges for and grows memory over a range popped from the stack
    fn memory_region(&mut self, offset: U256, size: U256) -> Result<(usize, usize)> {
        let (offset, size, cost) = self.memory.expansion(offset, size)?;
        self.consume(cost)?;
        if size > 0 {
            self.memory.grow(offset + size);
        }
        Ok((offset, size))
    }

    fn binary(&mut self, f: impl FnOnce(U256, U256) -> U256) -> Result<()> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(f(a, b))
    }

    fn step(&mut self, opcode: u8) -> Result<Option<Halt>> {
        let pc = self.pc;
        self.pc += 1;

        match opcode {
            STOP => return Ok(Some(Halt::Stop)),

            // ================================================================
            // Arithmetic and bitwise
            // ================================================================
            ADD => self.binary(U256::wrapping_add)?,
            MUL => self.binary(U256::wrapping_mul)?,
            SUB => self.binary(U256::wrapping_sub)?,
            DIV => self.binary(|a, b| a.div_rem(b).0)?,
            MOD => self.binary(|a, b| a.div_rem(b).1)?,
            LT => self.binary(|a, b| U256::from_bool(a < b))?,
            GT => self.binary(|a, b| U256::from_bool(a > b))?,
            EQ => self.binary(|a, b| U256::from_bool(a == b))?,
            AND => self.binary(U256::and)?,
            OR => self.binary(U256::or)?,
            XOR => self.binary(U256::xor)?,
            SHL => self.binary(|shift, value| value.shl(shift.to_usize().unwrap_or(usize::MAX)))?,
            SHR => self.binary(|shift, value| value.shr(shift.to_usize().unwrap_or(usize::MAX)))?,
            ISZERO => {
                let a = self.stack.pop()?;
                self.stack.push(U256::from_bool(a.is_zero()))?;
            }
            NOT => {
                let a = self.stack.pop()?;
                self.stack.push(a.not())?;
            }

            // ================================================================
            // Message and environment
            // ================================================================
            ADDRESS => self.stack.push(self.msg.destination().into())?,
            CALLER => self.stack.push(self.msg.sender().into())?,
            CALLVALUE => self.stack.push(self.msg.value().into())?,
            CALLDATASIZE => self.stack.push(U256::from_u64(self.msg.input().len() as u64))?,
            CALLDATALOAD => {
                let offset = self.stack.pop()?.to_usize().unwrap_or(usize::MAX);
                let mut word = [0u8; 32];
                if let Some(data) = self.msg.input().get(offset..) {
                    let n = data.len().min(32);
                    word[..n].copy_from_slice(&data[..n]);
                }
                self.stack.push(U256::from_be_bytes(word))?;
            }
            CALLDATACOPY => {
                let (offset, size, source_offset) = self.copy_region()?;
                let source_offset = source_offset.to_usize().unwrap_or(usize::MAX);
                let input = self.msg.input();
                self.memory.copy_padded(offset, size, input, source_offset);
            }
            RETURNDATASIZE => {
                self.stack.push(U256::from_u64(self.return_data.len() as u64))?;
            }
            RETURNDATACOPY => {
                let (offset, size, source_offset) = self.copy_region()?;
                let source = source_offset
                    .to_usize()
                    .and_then(|start| Some(start..start.checked_add(size)?))
                    .and_then(|range| self.return_data.get(range))
                    .ok_or(ExecError::InvalidMemoryAccess)?;
                self.memory.slice_mut(offset, size).copy_from_slice(source);
            }

            // ================================================================
            // Accounts and blocks
            // ================================================================
            BALANCE => {
                let address = Address::from(self.stack.pop()?);
                let balance = self.host.get_balance(&address)?;
                self.stack.push(balance.into())?;
            }
            BLOCKHASH => {
                let number = self.stack.pop()?.saturating_i64();
                let current = self.tx_context()?.block_number;
                let hash = if number < current && number >= current.saturating_sub(256) {
                    self.host.block_hash(number)?
                } else {
                    Bytes32::ZERO
                };
                self.stack.push(hash.into())?;
            }
            COINBASE => {
                let coinbase = self.tx_context()?.block_coinbase;
                self.stack.push(coinbase.into())?;
            }
            TIMESTAMP => {
                let timestamp = self.tx_context()?.block_timestamp;
                self.stack.push(from_i64(timestamp))?;
            }
            NUMBER => {
                let number = self.tx_context()?.block_number;
                self.stack.push(from_i64(number))?;
            }
            GASLIMIT => {
                let gas_limit = self.tx_context()?.block_gas_limit;
                self.stack.push(from_i64(gas_limit))?;
            }

            // ================================================================
            // Stack, memory and storage
            // ================================================================
            POP => {
                self.stack.pop()?;
            }
            MLOAD => {
                let offset = self.stack.pop()?;
                let (offset, _) = self.memory_region(offset, U256::from_u64(32))?;
                self.stack.push(self.memory.load_word(offset))?;
            }
            MSTORE => {
                let offset = self.stack.pop()?;
                let value = self.stack.pop()?;
                let (offset, _) = self.memory_region(offset, U256::from_u64(32))?;
                self.memory.store_word(offset, value);
            }
            MSTORE8 => {
                let offset = self.stack.pop()?;
                let value = self.stack.pop()?;
                let (offset, _) = self.memory_region(offset, U256::ONE)?;
                self.memory.slice_mut(offset, 1)[0] = value.low_u64() as u8;
            }
            SLOAD => {
                let key = Bytes32::from(self.stack.pop()?);
                let value = self.host.get_storage(&self.msg.destination(), &key)?;
                self.stack.push(value.into())?;
            }
            SSTORE => {
                if self.msg.is_static() {
                    return Err(ExecError::StaticModeViolation);
                }
                let key = Bytes32::from(self.stack.pop()?);
                let value = Bytes32::from(self.stack.pop()?);
                let destination = self.msg.destination();
                let current = self.host.get_storage(&destination, &key)?;
                let cost = if current.is_zero() && !value.is_zero() {
                    gas::SSTORE_SET
                } else {
                    gas::SSTORE_RESET
                };
                self.consume(cost)?;
                self.host.set_storage(&destination, &key, &value)?;
            }
            MSIZE => self.stack.push(U256::from_u64(self.memory.len() as u64))?,

            // ================================================================
            // Control flow
            // ================================================================
            JUMP => {
                let dest = self.stack.pop()?;
                self.pc = self.jump_target(dest)?;
            }
            JUMPI => {
                let dest = self.stack.pop()?;
                let condition = self.stack.pop()?;
                if !condition.is_zero() {
                    self.pc = self.jump_target(dest)?;
                }
            }
            PC => self.stack.push(U256::from_u64(pc as u64))?,
            GAS => self.stack.push(from_i64(self.gas_left))?,
            JUMPDEST => {}
            PUSH1..=PUSH32 => {
                let n = usize::from(opcode - PUSH1) + 1;
                let mut bytes = [0u8; 32];
                let available = self.code.get(pc + 1..).unwrap_or_default();
                let copied = available.len().min(n);
                bytes[..copied].copy_from_slice(&available[..copied]);
                self.stack.push(U256::from_be_slice(&bytes[..n]))?;
                self.pc += n;
            }
            DUP1..=DUP16 => self.stack.dup(usize::from(opcode - DUP1) + 1)?,
            SWAP1..=SWAP16 => self.stack.swap(usize::from(opcode - SWAP1) + 1)?,

            // ================================================================
            // Logs, calls and termination
            // ================================================================
            LOG0..=LOG4 => self.log(usize::from(opcode - LOG0))?,
            CALL => self.call()?,
            RETURN | REVERT => {
                let offset = self.stack.pop()?;
                let size = self.stack.pop()?;
                let (offset, size) = self.memory_region(offset, size)?;
                let data = self.memory.slice(offset, size).to_vec();
                return Ok(Some(if opcode == RETURN {
                    Halt::Return(data)
                } else {
                    Halt::Revert(data)
                }));
            }
            INVALID => return Err(ExecError::InvalidInstruction),
            SELFDESTRUCT => {
                if self.msg.is_static() {
                    return Err(ExecError::StaticModeViolation);
                }
                let beneficiary = Address::from(self.stack.pop()?);
                self.host.selfdestruct(&self.msg.destination(), &beneficiary)?;
                return Ok(Some(Halt::Stop));
            }

            other => return Err(ExecError::UndefinedInstruction(other)),
        }
        Ok(None)
    }

    fn tx_context(&mut self) -> Result<TxContext> {
        if let Some(context) = self.tx_context {
            return Ok(context);
        }
        let context = self.host.tx_context()?;
        self.tx_context = Some(context);
        Ok(context)
    }

    fn jump_target(&self, dest: U256) -> Result<usize> {
        dest.to_usize()
            .filter(|target| self.jump_dests.get(*target).copied().unwrap_or(false))
            .ok_or(ExecError::BadJumpDestination(dest.low_u64()))
    }

    /// Pops the operands of a copy and charges memory and per-word gas
    ///
    /// Returns the destination range and the unchecked source offset.
    fn copy_region(&mut self) -> Result<(usize, usize, U256)> {
        let offset = self.stack.pop()?;
        let source_offset = self.stack.pop()?;
        let size = self.stack.pop()?;

        let (offset, size) = self.memory_region(offset, size)?;
        self.consume(gas::COPY_WORD.saturating_mul(gas::words(size)))?;
        Ok((offset, size, source_offset))
    }

    fn log(&mut self, topic_count: usize) -> Result<()> {
        if self.msg.is_static() {
            return Err(ExecError::StaticModeViolation);
        }
        let offset = self.stack.pop()?;
        let size = self.stack.pop()?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(Bytes32::from(self.stack.pop()?));
        }

        let (offset, size) = self.memory_region(offset, size)?;
        let data_cost = gas::LOG_DATA_BYTE.saturating_mul(i64::try_from(size).unwrap_or(i64::MAX));
        self.consume(data_cost)?;

        let data = self.memory.slice(offset, size);
        self.host.emit_log(&self.msg.destination(), data, &topics)?;
        Ok(())
    }

    fn call(&mut self) -> Result<()> {
        let requested = self.stack.pop()?;
        let to = Address::from(self.stack.pop()?);
        let value = self.stack.pop()?;
        let input_offset = self.stack.pop()?;
        let input_size = self.stack.pop()?;
        let output_offset = self.stack.pop()?;
        let output_size = self.stack.pop()?;

        let has_value = !value.is_zero();
        if has_value && self.msg.is_static() {
            return Err(ExecError::StaticModeViolation);
        }

        let (input_offset, input_size) = self.memory_region(input_offset, input_size)?;
        let (output_offset, output_size) = self.memory_region(output_offset, output_size)?;
        if has_value {
            self.consume(gas::CALL_VALUE)?;
        }

        let forwarded = requested
            .saturating_i64()
            .min(gas::max_forwardable(self.gas_left));
        self.consume(forwarded)?;
        let callee_gas = if has_value {
            forwarded + gas::CALL_STIPEND
        } else {
            forwarded
        };

        self.return_data.clear();
        let depth = self.msg.depth().saturating_add(1);
        if depth > self.config.call_depth_limit {
            self.gas_left += forwarded;
            return self.stack.push(U256::ZERO);
        }

        let input = self.memory.slice(input_offset, input_size).to_vec();
        let message = Message {
            destination: to,
            sender: self.msg.destination(),
            value: value.into(),
            input_data: input.as_ptr(),
            input_size: input.len(),
            gas: callee_gas,
            depth,
            kind: CallKind::CALL,
            flags: self.msg.raw().flags,
            ..Message::default()
        };
        let output = self.host.call(&message)?;

        self.gas_left += output.gas_left.clamp(0, callee_gas);
        let copied = output.data.len().min(output_size);
        self.memory
            .slice_mut(output_offset, copied)
            .copy_from_slice(&output.data[..copied]);
        let succeeded = output.status.is_success();
        self.return_data = output.data;
        self.stack.push(U256::from_bool(succeeded))
    }
}

fn from_i64(value: i64) -> U256 {
    U256::from_u64(u64::try_from(value).unwrap_or(0))
}

/// Marks every JUMPDEST that is not inside PUSH data
pub fn analyze_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut pc = 0;
    while pc < code.len() {
        let opcode = code[pc];
        if opcode == JUMPDEST {
            dests[pc] = true;
        } else if (PUSH1..=PUSH32).contains(&opcode) {
            pc += usize::from(opcode - PUSH1) + 1;
        }
        pc += 1;
    }
    dests
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmc_sdk::abi::StatusCode;

    fn run(code: &[u8], gas: i64) -> Output {
        run_with(code, gas, Revision::LATEST, false)
    }

    fn run_with(code: &[u8], gas: i64, rev: Revision, is_static: bool) -> Output {
        let raw = Message {
            gas,
            flags: if is_static {
                vmc_sdk::abi::MessageFlags::STATIC
            } else {
                vmc_sdk::abi::MessageFlags::NONE
            },
            ..Message::default()
        };
        let msg = unsafe { ExecutionMessage::new(&raw) };
        let mut host = HostHandle::detached();
        Interpreter::new(&mut host, rev, &msg, code, ExampleConfig::default()).run()
    }

    #[test]
    fn test_stop_keeps_all_gas() {
        let output = run(&[STOP], 100_000);
        assert_eq!(output.status, StatusCode::SUCCESS);
        assert_eq!(output.gas_left, 100_000);
        assert!(output.data.is_empty());
    }

    #[test]
    fn test_memory_beyond_cap_is_out_of_gas() {
        // PUSH1 1 PUSH4 0x02000000 MSTORE: the word ends past the cap
        let code = [PUSH1, 1, PUSH1 + 3, 0x02, 0x00, 0x00, 0x00, MSTORE];
        let output = run(&code, i64::MAX);
        assert_eq!(output.status, StatusCode::OUT_OF_GAS);
        assert_eq!(output.gas_left, 0);
    }

    #[test]
    fn test_empty_code_succeeds() {
        assert_eq!(run(&[], 10).status, StatusCode::SUCCESS);
    }

    #[test]
    fn test_out_of_gas_consumes_everything() {
        let output = run(&[PUSH1, 1, STOP], 0);
        assert_eq!(output.status, StatusCode::OUT_OF_GAS);
        assert_eq!(output.gas_left, 0);
    }

    #[test]
    fn test_arithmetic_and_return() {
        // (7 - 2) * 3 = 15, stored at 0 and returned as one word
        let code = [
            PUSH1, 3, PUSH1, 2, PUSH1, 7, SUB, MUL, PUSH1, 0, MSTORE, PUSH1, 32, PUSH1, 0, RETURN,
        ];
        let output = run(&code, 1_000);
        assert_eq!(output.status, StatusCode::SUCCESS);
        assert_eq!(U256::from_be_slice(&output.data), U256::from_u64(15));
        // 6 pushes, SUB, MUL, MSTORE and one word of memory
        assert_eq!(output.gas_left, 1_000 - (6 * 3 + 3 + 5 + 3 + 3));
    }

    #[test]
    fn test_revert_keeps_gas_and_data() {
        let code = [PUSH1, 0xaa, PUSH1, 0, MSTORE8, PUSH1, 1, PUSH1, 0, REVERT];
        let output = run(&code, 100);
        assert_eq!(output.status, StatusCode::REVERT);
        assert_eq!(output.data, vec![0xaa]);
        assert!(output.gas_left > 0);
    }

    #[test]
    fn test_revert_is_undefined_before_byzantium() {
        let code = [PUSH1, 0, PUSH1, 0, REVERT];
        let output = run_with(&code, 100, Revision::HOMESTEAD, false);
        assert_eq!(output.status, StatusCode::UNDEFINED_INSTRUCTION);
    }

    #[test]
    fn test_jumps() {
        // Jump over INVALID to a JUMPDEST
        let code = [PUSH1, 4, JUMP, INVALID, JUMPDEST, STOP];
        assert_eq!(run(&code, 100).status, StatusCode::SUCCESS);

        // Target inside PUSH data
        let code = [PUSH1, 4, JUMP, PUSH1, JUMPDEST, STOP];
        assert_eq!(run(&code, 100).status, StatusCode::BAD_JUMP_DESTINATION);

        // Untaken conditional jump
        let code = [PUSH1, 0, PUSH1, 9, JUMPI, STOP];
        assert_eq!(run(&code, 100).status, StatusCode::SUCCESS);
    }

    #[test]
    fn test_stack_errors() {
        assert_eq!(run(&[ADD], 100).status, StatusCode::STACK_UNDERFLOW);

        let mut code = vec![PUSH1, 1];
        code.extend(std::iter::repeat(DUP1).take(STACK_LIMIT));
        assert_eq!(run(&code, 1_000_000).status, StatusCode::STACK_OVERFLOW);
    }

    #[test]
    fn test_invalid_and_undefined() {
        assert_eq!(run(&[INVALID], 100).status, StatusCode::INVALID_INSTRUCTION);
        assert_eq!(run(&[0x0c], 100).status, StatusCode::UNDEFINED_INSTRUCTION);
    }

    #[test]
    fn test_truncated_push_pads_with_zeros() {
        let code = [PUSH2, 0x01];
        assert_eq!(run(&code, 100).status, StatusCode::SUCCESS);
    }

    #[test]
    fn test_static_mode_violation() {
        let code = [PUSH1, 0, PUSH1, 0, LOG0];
        let output = run_with(&code, 10_000, Revision::LATEST, true);
        assert_eq!(output.status, StatusCode::STATIC_MODE_VIOLATION);
    }

    #[test]
    fn test_host_access_without_context_is_rejected() {
        let code = [PUSH1, 0, SLOAD];
        assert_eq!(run(&code, 10_000).status, StatusCode::REJECTED);
    }

    #[test]
    fn test_returndatacopy_out_of_bounds() {
        let code = [PUSH1, 1, PUSH1, 0, PUSH1, 0, RETURNDATACOPY];
        assert_eq!(run(&code, 1_000).status, StatusCode::INVALID_MEMORY_ACCESS);
    }

    #[test]
    fn test_analyze_jump_dests_skips_push_data() {
        let dests = analyze_jump_dests(&[JUMPDEST, PUSH1, JUMPDEST, JUMPDEST]);
        assert_eq!(dests, vec![true, false, false, true]);
    }

    const PUSH2: u8 = PUSH1 + 1;
}
