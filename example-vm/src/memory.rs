//! Byte-addressed scratch memory

use crate::{
    error::{ExecError, Result},
    gas,
    word::U256,
};

/// Memory that grows in 32-byte words
#[derive(Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes, always a multiple of 32
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gas needed to make `[offset, offset + size)` addressable
    ///
    /// Returns the byte range as `usize`s. A zero-sized range never expands
    /// memory and is valid at any offset.
    pub fn expansion(&self, offset: U256, size: U256) -> Result<(usize, usize, i64)> {
        if size.is_zero() {
            return Ok((0, 0, 0));
        }
        let offset = offset.to_usize().ok_or(ExecError::OutOfGas)?;
        let size = size.to_usize().ok_or(ExecError::OutOfGas)?;
        let end = offset.checked_add(size).ok_or(ExecError::OutOfGas)?;
        if end > gas::MAX_MEMORY {
            return Err(ExecError::OutOfGas);
        }

        let cost = if end > self.data.len() {
            gas::memory_cost(gas::words(end)) - gas::memory_cost(gas::words(self.data.len()))
        } else {
            0
        };
        Ok((offset, size, cost))
    }

    /// Grows memory to cover `end`; the gas must already be paid
    pub fn grow(&mut self, end: usize) {
        if end > self.data.len() {
            let words = end.div_ceil(32);
            self.data.resize(words * 32, 0);
        }
    }

    pub fn slice(&self, offset: usize, size: usize) -> &[u8] {
        if size == 0 {
            return &[];
        }
        &self.data[offset..offset + size]
    }

    pub fn slice_mut(&mut self, offset: usize, size: usize) -> &mut [u8] {
        if size == 0 {
            return &mut [];
        }
        &mut self.data[offset..offset + size]
    }

    pub fn load_word(&self, offset: usize) -> U256 {
        U256::from_be_slice(self.slice(offset, 32))
    }

    pub fn store_word(&mut self, offset: usize, value: U256) {
        self.slice_mut(offset, 32).copy_from_slice(&value.to_be_bytes());
    }

    /// Copies `source[source_offset..]` into memory, zero-filling past its end
    pub fn copy_padded(&mut self, offset: usize, size: usize, source: &[u8], source_offset: usize) {
        let target = self.slice_mut(offset, size);
        let available = source.get(source_offset..).unwrap_or_default();
        let n = available.len().min(size);
        target[..n].copy_from_slice(&available[..n]);
        target[n..].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_charges_once() {
        let mut memory = Memory::new();
        let (offset, size, cost) = memory
            .expansion(U256::from_u64(0), U256::from_u64(32))
            .unwrap();
        assert_eq!((offset, size, cost), (0, 32, 3));
        memory.grow(offset + size);
        assert_eq!(memory.len(), 32);

        let (_, _, cost) = memory.expansion(U256::from_u64(0), U256::from_u64(32)).unwrap();
        assert_eq!(cost, 0);
    }

    #[test]
    fn test_zero_size_at_huge_offset() {
        let memory = Memory::new();
        assert_eq!(memory.expansion(U256::MAX, U256::ZERO).unwrap(), (0, 0, 0));
        assert_eq!(
            memory.expansion(U256::MAX, U256::ONE),
            Err(ExecError::OutOfGas)
        );
    }

    #[test]
    fn test_expansion_capped() {
        let memory = Memory::new();
        let (_, size, cost) = memory
            .expansion(U256::ZERO, U256::from_u64(gas::MAX_MEMORY as u64))
            .unwrap();
        assert_eq!(size, gas::MAX_MEMORY);
        assert!(cost > 0);

        assert_eq!(
            memory.expansion(U256::ZERO, U256::from_u64(gas::MAX_MEMORY as u64 + 1)),
            Err(ExecError::OutOfGas)
        );
        assert_eq!(
            memory.expansion(U256::from_u64(gas::MAX_MEMORY as u64), U256::ONE),
            Err(ExecError::OutOfGas)
        );
        // Nothing is allocated by pricing.
        assert!(memory.is_empty());
    }

    #[test]
    fn test_words_round_trip() {
        let mut memory = Memory::new();
        memory.grow(64);
        memory.store_word(1, U256::from_u64(0xabcd));
        assert_eq!(memory.load_word(1), U256::from_u64(0xabcd));
        assert_eq!(memory.slice(31, 2), &[0xab, 0xcd]);
    }

    #[test]
    fn test_copy_padded() {
        let mut memory = Memory::new();
        memory.grow(32);
        memory.slice_mut(0, 8).fill(0xff);
        memory.copy_padded(0, 8, &[1, 2, 3], 1);
        assert_eq!(memory.slice(0, 8), &[2, 3, 0, 0, 0, 0, 0, 0]);
    }
}
