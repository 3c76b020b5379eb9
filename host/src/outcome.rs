//! Owned execution result

use serde::{Serialize, Serializer};
use vmc_abi::{Address, ExecutionResult, StatusCode};

/// Result of one execution, copied out of the module's buffers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    /// Status reported by the module
    pub status: StatusCode,
    /// Gas the message carried
    pub gas_limit: i64,
    /// Gas left; zero for every status other than success and revert
    pub gas_left: i64,
    /// Output or revert data
    #[serde(serialize_with = "serialize_hex")]
    pub output: Vec<u8>,
    /// Created account, for successful creations
    pub create_address: Option<Address>,
}

impl ExecutionOutcome {
    /// Successful outcome
    pub fn success(gas_limit: i64, gas_left: i64, output: Vec<u8>) -> Self {
        Self {
            status: StatusCode::SUCCESS,
            gas_limit,
            gas_left,
            output,
            create_address: None,
        }
    }

    /// Failed outcome with no gas left and no output
    pub fn failure(status: StatusCode, gas_limit: i64) -> Self {
        Self {
            status,
            gas_limit,
            gas_left: 0,
            output: Vec::new(),
            create_address: None,
        }
    }

    /// True for `SUCCESS`
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Gas consumed by the execution
    pub fn gas_used(&self) -> i64 {
        self.gas_limit.saturating_sub(self.gas_left)
    }

    /// Copies a module's result and releases it
    ///
    /// # Safety
    /// `result` must come from a conforming module and must not have been
    /// released.
    pub unsafe fn from_raw(result: ExecutionResult, gas_limit: i64) -> Self {
        let keeps_gas = result.status_code.is_success() || result.status_code.is_revert();
        let outcome = Self {
            status: result.status_code,
            gas_limit,
            gas_left: if keeps_gas { result.gas_left } else { 0 },
            output: if keeps_gas { result.output().to_vec() } else { Vec::new() },
            create_address: (result.status_code.is_success() && !result.create_address.is_zero())
                .then_some(result.create_address),
        };
        result.release();
        outcome
    }

    /// Boundary form; the release entry points into this binary
    pub fn into_raw(self) -> ExecutionResult {
        ExecutionResult::new(self.status, self.gas_left, self.output, self.create_address)
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
