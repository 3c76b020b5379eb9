//! Owned execution output and its conversion to the boundary result

use vmc_abi::{Address, ExecutionResult, StatusCode};

/// Result of an execution, owned by Rust code on this side of the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Execution status
    pub status: StatusCode,
    /// Gas left
    pub gas_left: i64,
    /// Output or revert data
    pub data: Vec<u8>,
    /// Created account, for successful creations
    pub create_address: Option<Address>,
}

impl Output {
    /// Successful execution
    pub fn success(gas_left: i64, data: Vec<u8>) -> Self {
        Self { status: StatusCode::SUCCESS, gas_left, data, create_address: None }
    }

    /// Reverted execution; gas left and data are kept
    pub fn revert(gas_left: i64, data: Vec<u8>) -> Self {
        Self { status: StatusCode::REVERT, gas_left, data, create_address: None }
    }

    /// Any other failure; consumes all gas and carries no data
    pub fn failure(status: StatusCode) -> Self {
        Self { status, gas_left: 0, data: Vec::new(), create_address: None }
    }

    /// Copies a boundary result and releases it
    ///
    /// # Safety
    /// `result` must come from a conforming producer and not be released yet.
    pub unsafe fn from_result(result: ExecutionResult) -> Self {
        let output = Self {
            status: result.status_code,
            gas_left: result.gas_left,
            data: result.output().to_vec(),
            create_address: if result.create_address.is_zero() {
                None
            } else {
                Some(result.create_address)
            },
        };
        result.release();
        output
    }

    /// Converts into a boundary result whose buffers this binary frees
    ///
    /// Only success and revert may report gas left or data.
    pub fn into_result(self) -> ExecutionResult {
        if self.status.is_success() || self.status.is_revert() {
            ExecutionResult::new(self.status, self.gas_left, self.data, self.create_address)
        } else {
            ExecutionResult::failure(self.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_drops_data_and_gas() {
        let output = Output {
            status: StatusCode::OUT_OF_GAS,
            gas_left: 50,
            data: vec![1, 2],
            create_address: None,
        };
        let result = output.into_result();
        assert_eq!(result.gas_left, 0);
        assert_eq!(result.output_size, 0);
    }

    #[test]
    fn test_result_roundtrip_releases() {
        let result = Output::revert(7, vec![0xde, 0xad]).into_result();
        let back = unsafe { Output::from_result(result) };
        assert_eq!(back, Output::revert(7, vec![0xde, 0xad]));
    }
}
