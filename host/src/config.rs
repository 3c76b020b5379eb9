//! Host configuration

use crate::{
    error::{HostError, Result},
    vm::Vm,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use vmc_abi::Revision;

/// Settings a host applies to every instance it creates
///
/// Loaded from JSON; every field is optional:
///
/// ```json
/// {
///     "revision": 5,
///     "gas_limit": 1000000,
///     "options": { "verbose": "1" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Revision passed to `execute`
    pub revision: i32,
    /// Gas limit for top-level messages
    pub gas_limit: i64,
    /// Options applied through `set_option`, in name order
    pub options: BTreeMap<String, String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            revision: Revision::LATEST.0,
            gas_limit: Vm::DEFAULT_GAS_LIMIT,
            options: BTreeMap::new(),
        }
    }
}

impl HostConfig {
    /// Parses and validates a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Checks ranges
    pub fn validate(&self) -> Result<()> {
        if !self.revision().is_known() {
            return Err(HostError::Config(format!("unknown revision {}", self.revision)));
        }
        if !(0..=Vm::MAX_GAS_LIMIT).contains(&self.gas_limit) {
            return Err(HostError::Config(format!(
                "gas_limit {} outside [0, {}]",
                self.gas_limit,
                Vm::MAX_GAS_LIMIT
            )));
        }
        Ok(())
    }

    /// Revision as a boundary value
    pub fn revision(&self) -> Revision {
        Revision(self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::from_json("{}").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.revision(), Revision::LATEST);
    }

    #[test]
    fn test_parses_options() {
        let config =
            HostConfig::from_json(r#"{"gas_limit": 500, "options": {"verbose": "2"}}"#).unwrap();
        assert_eq!(config.gas_limit, 500);
        assert_eq!(config.options.get("verbose").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            HostConfig::from_json(r#"{"gas_limit": -1}"#),
            Err(HostError::Config(_))
        ));
        assert!(matches!(
            HostConfig::from_json(r#"{"revision": 77}"#),
            Err(HostError::Config(_))
        ));
        assert!(matches!(
            HostConfig::from_json(r#"{"gas": 1}"#),
            Err(HostError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"revision": 0}"#).unwrap();
        let config = HostConfig::from_file(file.path()).unwrap();
        assert_eq!(config.revision(), Revision::FRONTIER);
    }
}
