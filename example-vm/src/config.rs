//! Per-instance options

use vmc_sdk::OptionError;

/// Deepest call the protocol allows
pub const MAX_CALL_DEPTH: i32 = 1024;

/// Options accepted through `set_option`
///
/// | name               | values     | default |
/// |--------------------|------------|---------|
/// | `verbose`          | `0`..=`2`  | `0`     |
/// | `call_depth_limit` | `1`..=1024 | 1024    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExampleConfig {
    /// 0: quiet, 1: one line per execution, 2: one line per instruction
    pub verbose: u8,
    /// Nested calls deeper than this fail
    pub call_depth_limit: i32,
}

impl Default for ExampleConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            call_depth_limit: MAX_CALL_DEPTH,
        }
    }
}

impl ExampleConfig {
    pub fn apply(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let invalid = || OptionError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };

        match name {
            "verbose" => {
                self.verbose = value
                    .parse()
                    .ok()
                    .filter(|level| *level <= 2)
                    .ok_or_else(invalid)?;
            }
            "call_depth_limit" => {
                self.call_depth_limit = value
                    .parse()
                    .ok()
                    .filter(|limit| (1..=MAX_CALL_DEPTH).contains(limit))
                    .ok_or_else(invalid)?;
            }
            _ => return Err(OptionError::UnknownName(name.to_string())),
        }
        Ok(())
    }
}
