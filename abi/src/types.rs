//! Fixed-size byte values shared across the boundary

use crate::error::{AbiError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            /// Raw bytes, big-endian when interpreted as a number
            pub bytes: [u8; $len],
        }

        impl $name {
            /// Byte length of the value
            pub const LEN: usize = $len;

            /// All-zero value
            pub const ZERO: Self = Self { bytes: [0u8; $len] };

            /// Wraps raw bytes
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self { bytes }
            }

            /// Copies a slice of exactly `LEN` bytes
            pub fn from_slice(slice: &[u8]) -> Result<Self> {
                let bytes: [u8; $len] = slice.try_into().map_err(|_| AbiError::InvalidLength {
                    expected: $len,
                    actual: slice.len(),
                })?;
                Ok(Self { bytes })
            }

            /// True if every byte is zero
            pub fn is_zero(&self) -> bool {
                self.bytes.iter().all(|b| *b == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self { bytes }
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.bytes
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = AbiError;

            fn from_str(s: &str) -> Result<Self> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(digits).map_err(|e| AbiError::InvalidHex(e.to_string()))?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// 160-bit account address
    Address,
    20
);

fixed_bytes!(
    /// 256-bit word: storage keys and values, hashes, big-endian integers
    Bytes32,
    32
);

impl Bytes32 {
    /// Encodes a `u64` as a big-endian 256-bit integer
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self { bytes }
    }

    /// Returns the value as `u64` if the high 24 bytes are zero
    pub fn to_u64(&self) -> Option<u64> {
        if self.bytes[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.bytes[24..]);
        Some(u64::from_be_bytes(low))
    }
}

impl From<Address> for Bytes32 {
    /// Left-pads the address to a word, as the EVM stack does
    fn from(address: Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&address.bytes);
        Self { bytes }
    }
}

impl From<Bytes32> for Address {
    /// Takes the low 20 bytes of a word
    fn from(word: Bytes32) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word.bytes[12..]);
        Self { bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_length_check() {
        assert!(Address::from_slice(&[1u8; 20]).is_ok());
        assert_eq!(
            Address::from_slice(&[1u8; 19]),
            Err(AbiError::InvalidLength { expected: 20, actual: 19 })
        );
    }

    #[test]
    fn test_u64_word() {
        let word = Bytes32::from_u64(0x1234);
        assert_eq!(word.bytes[30], 0x12);
        assert_eq!(word.bytes[31], 0x34);
        assert_eq!(word.to_u64(), Some(0x1234));

        let mut big = Bytes32::ZERO;
        big.bytes[0] = 1;
        assert_eq!(big.to_u64(), None);
    }

    #[test]
    fn test_address_word_conversion() {
        let address = Address::new([0xAB; 20]);
        let word = Bytes32::from(address);
        assert!(word.bytes[..12].iter().all(|b| *b == 0));
        assert_eq!(Address::from(word), address);
    }

    #[test]
    fn test_hex_display_and_parse() {
        let address = Address::new([0x11; 20]);
        let text = address.to_string();
        assert_eq!(text, format!("0x{}", "11".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), address);
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let key = Bytes32::from_u64(1);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"0x{}01\"", "00".repeat(31)));
        let back: Bytes32 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
