//! Operand stack

use crate::{
    error::{ExecError, Result},
    word::U256,
};

/// Maximum number of items
pub const STACK_LIMIT: usize = 1024;

#[derive(Debug, Default)]
pub struct Stack {
    items: Vec<U256>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(STACK_LIMIT),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, value: U256) -> Result<()> {
        if self.items.len() >= STACK_LIMIT {
            return Err(ExecError::StackOverflow);
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<U256> {
        self.items.pop().ok_or(ExecError::StackUnderflow)
    }

    /// Item `depth` places below the top; 0 is the top
    pub fn peek(&self, depth: usize) -> Result<U256> {
        let index = self
            .items
            .len()
            .checked_sub(depth + 1)
            .ok_or(ExecError::StackUnderflow)?;
        Ok(self.items[index])
    }

    /// Pushes a copy of the item `n` places from the top, 1-based
    pub fn dup(&mut self, n: usize) -> Result<()> {
        let value = self.peek(n - 1)?;
        self.push(value)
    }

    /// Swaps the top with the item `n` places below it
    pub fn swap(&mut self, n: usize) -> Result<()> {
        let len = self.items.len();
        if len <= n {
            return Err(ExecError::StackUnderflow);
        }
        self.items.swap(len - 1, len - 1 - n);
        Ok(())
    }
}
