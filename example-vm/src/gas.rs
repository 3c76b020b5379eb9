//! Gas schedule

/// Tier costs
pub const ZERO: i64 = 0;
pub const BASE: i64 = 2;
pub const VERY_LOW: i64 = 3;
pub const LOW: i64 = 5;
pub const MID: i64 = 8;
pub const HIGH: i64 = 10;
pub const JUMPDEST: i64 = 1;

/// Per 32-byte word copied by CALLDATACOPY and RETURNDATACOPY
pub const COPY_WORD: i64 = 3;

/// State access
pub const BALANCE: i64 = 400;
pub const BLOCKHASH: i64 = 20;
pub const SLOAD: i64 = 200;
pub const SSTORE_SET: i64 = 20_000;
pub const SSTORE_RESET: i64 = 5_000;

/// Logging
pub const LOG: i64 = 375;
pub const LOG_TOPIC: i64 = 375;
pub const LOG_DATA_BYTE: i64 = 8;

/// Calls
pub const CALL: i64 = 700;
pub const CALL_VALUE: i64 = 9_000;
pub const CALL_STIPEND: i64 = 2_300;
pub const SELFDESTRUCT: i64 = 5_000;

/// Memory
pub const MEMORY_WORD: i64 = 3;
pub const QUADRATIC_DIVISOR: i64 = 512;

/// Largest memory a contract may address; beyond this every access is out of gas
///
/// 32 MiB. Even the largest gas limit a host accepts cannot pay for more, and
/// a module called directly through its table must not allocate unbounded.
pub const MAX_MEMORY: usize = 1 << 25;

/// Total cost of `words` words of memory
pub fn memory_cost(words: i64) -> i64 {
    MEMORY_WORD
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / QUADRATIC_DIVISOR)
}

/// Number of 32-byte words covering `bytes`
pub fn words(bytes: usize) -> i64 {
    i64::try_from(bytes.div_ceil(32)).unwrap_or(i64::MAX)
}

/// Gas a call may forward: all but one 64th of what is left
pub fn max_forwardable(gas_left: i64) -> i64 {
    gas_left - gas_left / 64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cost_is_quadratic() {
        assert_eq!(memory_cost(0), 0);
        assert_eq!(memory_cost(1), 3);
        assert_eq!(memory_cost(32), 96 + 2);
        assert_eq!(memory_cost(1024), 3072 + 2048);
    }

    #[test]
    fn test_words_round_up() {
        assert_eq!(words(0), 0);
        assert_eq!(words(1), 1);
        assert_eq!(words(32), 1);
        assert_eq!(words(33), 2);
    }

    #[test]
    fn test_max_forwardable() {
        assert_eq!(max_forwardable(6400), 6300);
        assert_eq!(max_forwardable(63), 63);
    }
}
