//! 256-bit machine word

use std::{cmp::Ordering, fmt};
use vmc_sdk::abi::{Address, Bytes32};

/// Unsigned 256-bit integer with wrapping arithmetic
///
/// Limbs are little-endian: `limbs[0]` holds the least significant 64 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256 {
    limbs: [u64; 4],
}

impl U256 {
    /// Zero
    pub const ZERO: Self = Self { limbs: [0; 4] };
    /// One
    pub const ONE: Self = Self { limbs: [1, 0, 0, 0] };
    /// 2^256 - 1
    pub const MAX: Self = Self { limbs: [u64::MAX; 4] };

    pub fn from_u64(value: u64) -> Self {
        Self { limbs: [value, 0, 0, 0] }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut limb = [0u8; 8];
            limb.copy_from_slice(chunk);
            limbs[3 - i] = u64::from_be_bytes(limb);
        }
        Self { limbs }
    }

    /// Right-aligned big-endian value of up to 32 bytes
    pub fn from_be_slice(slice: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        let slice = &slice[slice.len().saturating_sub(32)..];
        bytes[32 - slice.len()..].copy_from_slice(slice);
        Self::from_be_bytes(bytes)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, chunk) in bytes.chunks_exact_mut(8).enumerate() {
            chunk.copy_from_slice(&self.limbs[3 - i].to_be_bytes());
        }
        bytes
    }

    pub fn is_zero(&self) -> bool {
        self.limbs == [0; 4]
    }

    pub fn low_u64(&self) -> u64 {
        self.limbs[0]
    }

    /// Value as `u64`, or `None` if it does not fit
    pub fn to_u64(&self) -> Option<u64> {
        (self.limbs[1..] == [0; 3]).then_some(self.limbs[0])
    }

    /// Value as `usize`, or `None` if it does not fit
    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().and_then(|v| usize::try_from(v).ok())
    }

    /// Value as `i64`, saturating at `i64::MAX`
    pub fn saturating_i64(&self) -> i64 {
        self.to_u64()
            .and_then(|v| i64::try_from(v).ok())
            .unwrap_or(i64::MAX)
    }

    fn bit(&self, index: usize) -> bool {
        (self.limbs[index / 64] >> (index % 64)) & 1 == 1
    }

    fn set_bit(&mut self, index: usize) {
        self.limbs[index / 64] |= 1 << (index % 64);
    }

    pub fn wrapping_add(self, other: Self) -> Self {
        let mut limbs = [0u64; 4];
        let mut carry = false;
        for (i, limb) in limbs.iter_mut().enumerate() {
            let (sum, c1) = self.limbs[i].overflowing_add(other.limbs[i]);
            let (sum, c2) = sum.overflowing_add(u64::from(carry));
            *limb = sum;
            carry = c1 || c2;
        }
        Self { limbs }
    }

    pub fn wrapping_sub(self, other: Self) -> Self {
        let mut limbs = [0u64; 4];
        let mut borrow = false;
        for (i, limb) in limbs.iter_mut().enumerate() {
            let (diff, b1) = self.limbs[i].overflowing_sub(other.limbs[i]);
            let (diff, b2) = diff.overflowing_sub(u64::from(borrow));
            *limb = diff;
            borrow = b1 || b2;
        }
        Self { limbs }
    }

    pub fn wrapping_mul(self, other: Self) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 - i {
                let t = u128::from(self.limbs[i]) * u128::from(other.limbs[j])
                    + u128::from(limbs[i + j])
                    + carry;
                limbs[i + j] = t as u64;
                carry = t >> 64;
            }
        }
        Self { limbs }
    }

    /// Quotient and remainder; both zero for a zero divisor
    pub fn div_rem(self, divisor: Self) -> (Self, Self) {
        if divisor.is_zero() {
            return (Self::ZERO, Self::ZERO);
        }
        if self < divisor {
            return (Self::ZERO, self);
        }

        let mut quotient = Self::ZERO;
        let mut remainder = Self::ZERO;
        for i in (0..256).rev() {
            let carry = remainder.bit(255);
            remainder = remainder.shl(1);
            if self.bit(i) {
                remainder.limbs[0] |= 1;
            }
            if carry || remainder >= divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.set_bit(i);
            }
        }
        (quotient, remainder)
    }

    pub fn shl(self, shift: usize) -> Self {
        if shift >= 256 {
            return Self::ZERO;
        }
        let (words, bits) = (shift / 64, shift % 64);
        let mut limbs = [0u64; 4];
        for i in words..4 {
            limbs[i] = self.limbs[i - words] << bits;
            if bits > 0 && i > words {
                limbs[i] |= self.limbs[i - words - 1] >> (64 - bits);
            }
        }
        Self { limbs }
    }

    pub fn shr(self, shift: usize) -> Self {
        if shift >= 256 {
            return Self::ZERO;
        }
        let (words, bits) = (shift / 64, shift % 64);
        let mut limbs = [0u64; 4];
        for i in 0..4 - words {
            limbs[i] = self.limbs[i + words] >> bits;
            if bits > 0 && i + words + 1 < 4 {
                limbs[i] |= self.limbs[i + words + 1] << (64 - bits);
            }
        }
        Self { limbs }
    }

    pub fn and(self, other: Self) -> Self {
        self.zip(other, |a, b| a & b)
    }

    pub fn or(self, other: Self) -> Self {
        self.zip(other, |a, b| a | b)
    }

    pub fn xor(self, other: Self) -> Self {
        self.zip(other, |a, b| a ^ b)
    }

    pub fn not(self) -> Self {
        self.zip(Self::ZERO, |a, _| !a)
    }

    fn zip(self, other: Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = f(self.limbs[i], other.limbs[i]);
        }
        Self { limbs }
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs.iter().rev().cmp(other.limbs.iter().rev())
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Bytes32> for U256 {
    fn from(value: Bytes32) -> Self {
        Self::from_be_bytes(value.bytes)
    }
}

impl From<U256> for Bytes32 {
    fn from(value: U256) -> Self {
        Bytes32::new(value.to_be_bytes())
    }
}

impl From<Address> for U256 {
    fn from(value: Address) -> Self {
        Self::from_be_slice(&value.bytes)
    }
}

impl From<U256> for Address {
    fn from(value: U256) -> Self {
        let bytes = value.to_be_bytes();
        let mut address = [0u8; 20];
        address.copy_from_slice(&bytes[12..]);
        Address::new(address)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.to_be_bytes().iter().skip_while(|b| **b == 0) {
            write!(f, "{:02x}", byte)?;
        }
        if self.is_zero() {
            write!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from_u64(v)
    }

    #[test]
    fn test_add_wraps() {
        assert_eq!(U256::MAX.wrapping_add(U256::ONE), U256::ZERO);
        assert_eq!(u(u64::MAX).wrapping_add(U256::ONE).shr(64), U256::ONE);
    }

    #[test]
    fn test_sub_wraps() {
        assert_eq!(U256::ZERO.wrapping_sub(U256::ONE), U256::MAX);
        assert_eq!(u(10).wrapping_sub(u(3)), u(7));
    }

    #[test]
    fn test_mul_carries_across_limbs() {
        let big = u(u64::MAX);
        let product = big.wrapping_mul(big);
        // (2^64 - 1)^2 = 2^128 - 2^65 + 1
        let expected = U256::ONE.shl(128).wrapping_sub(U256::ONE.shl(65)).wrapping_add(U256::ONE);
        assert_eq!(product, expected);
        assert_eq!(U256::MAX.wrapping_mul(u(2)), U256::MAX.wrapping_sub(U256::ONE));
    }

    #[test]
    fn test_div_rem() {
        assert_eq!(u(17).div_rem(u(5)), (u(3), u(2)));
        assert_eq!(u(17).div_rem(U256::ZERO), (U256::ZERO, U256::ZERO));
        assert_eq!(u(3).div_rem(u(5)), (U256::ZERO, u(3)));

        let (q, r) = U256::MAX.div_rem(U256::MAX.shr(1));
        assert_eq!(q, u(2));
        assert_eq!(r, U256::ONE);

        let (q, r) = U256::MAX.div_rem(U256::ONE.shl(255));
        assert_eq!(q, U256::ONE);
        assert_eq!(r, U256::MAX.shr(1));
    }

    #[test]
    fn test_shifts() {
        assert_eq!(U256::ONE.shl(255).shr(255), U256::ONE);
        assert_eq!(U256::ONE.shl(256), U256::ZERO);
        assert_eq!(u(0xff).shl(60).shr(64), u(0xf));
        assert_eq!(U256::MAX.shr(192), u(u64::MAX));
    }

    #[test]
    fn test_ordering_uses_high_limbs_first() {
        assert!(U256::ONE.shl(64) > u(u64::MAX));
        assert!(u(1) < u(2));
    }

    #[test]
    fn test_byte_conversions() {
        let value = u(0x0102);
        let bytes = value.to_be_bytes();
        assert_eq!(&bytes[30..], &[0x01, 0x02]);
        assert_eq!(U256::from_be_bytes(bytes), value);
        assert_eq!(U256::from_be_slice(&[0x01, 0x02]), value);

        let address = Address::new([0xaa; 20]);
        assert_eq!(Address::from(U256::from(address)), address);
        assert_eq!(U256::from(Bytes32::from(value)), value);
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(u(5).to_usize(), Some(5));
        assert_eq!(U256::ONE.shl(64).to_u64(), None);
        assert_eq!(U256::MAX.saturating_i64(), i64::MAX);
    }
}
