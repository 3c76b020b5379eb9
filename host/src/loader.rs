//! Dynamic loading of VM modules
//!
//! A module is a shared library exporting one unmangled factory function.
//! The factory symbol is derived from the file name: for
//! `libexample_vm.so` the loader tries `vmc_create_example_vm`, then
//! `example_vm_create`. [`Module::create_with`] takes an explicit symbol.

use crate::{
    error::{HostError, Result},
    vm::Vm,
};
use libloading::{Library, Symbol};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use vmc_abi::CreateFn;

/// An opened module library
///
/// Every [`Vm`] created from it keeps the library loaded until the instance
/// is destroyed, so the module may be dropped while instances are alive.
#[derive(Debug)]
pub struct Module {
    library: Arc<Library>,
    path: PathBuf,
}

impl Module {
    /// Opens the shared library at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| HostError::Load {
            path: path.display().to_string(),
            reason,
        };

        let canonical = path
            .canonicalize()
            .map_err(|e| load_error(e.to_string()))?;
        let library = unsafe { Library::new(&canonical) }.map_err(|e| load_error(e.to_string()))?;

        log::debug!("loaded module {}", canonical.display());
        Ok(Self {
            library: Arc::new(library),
            path: canonical,
        })
    }

    /// Path of the library
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an instance through the conventional factory symbol
    pub fn create(&self) -> Result<Vm> {
        let tried = factory_symbols(&self.path);
        for symbol in &tried {
            if let Some(factory) = self.factory(symbol) {
                log::debug!("using factory {} from {}", symbol, self.path.display());
                return unsafe { Vm::adopt(factory(), Some(self.library.clone())) };
            }
        }
        Err(HostError::MissingFactory {
            path: self.path.display().to_string(),
            tried,
        })
    }

    /// Creates an instance through an explicit factory symbol
    pub fn create_with(&self, symbol: &str) -> Result<Vm> {
        let factory = self.factory(symbol).ok_or_else(|| HostError::MissingFactory {
            path: self.path.display().to_string(),
            tried: vec![symbol.to_string()],
        })?;
        unsafe { Vm::adopt(factory(), Some(self.library.clone())) }
    }

    fn factory(&self, symbol: &str) -> Option<CreateFn> {
        let found: Symbol<CreateFn> = unsafe { self.library.get(symbol.as_bytes()) }.ok()?;
        Some(*found)
    }
}

/// Factory symbols tried by [`Module::create`], in order
///
/// The module name is the file name up to the first `.`, without a `lib`
/// prefix, with `-` replaced by `_`.
pub fn factory_symbols(path: &Path) -> Vec<String> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    let stem = stem.strip_prefix("lib").unwrap_or(stem).replace('-', "_");

    vec![format!("vmc_create_{}", stem), format!("{}_create", stem)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_symbols() {
        assert_eq!(
            factory_symbols(Path::new("/opt/vms/libexample_vm.so")),
            vec!["vmc_create_example_vm", "example_vm_create"]
        );
        assert_eq!(
            factory_symbols(Path::new("fast-vm.dll")),
            vec!["vmc_create_fast_vm", "fast_vm_create"]
        );
        assert_eq!(
            factory_symbols(Path::new("libevmjit.so.1.2")),
            vec!["vmc_create_evmjit", "evmjit_create"]
        );
    }

    #[test]
    fn test_open_missing_file() {
        let err = Module::open("/nonexistent/libnothing.so").unwrap_err();
        assert!(matches!(err, HostError::Load { .. }));
    }

    #[test]
    fn test_open_garbage_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libgarbage.so");
        std::fs::write(&path, b"not a shared object").unwrap();
        let err = Module::open(&path).unwrap_err();
        assert!(matches!(err, HostError::Load { .. }));
    }
}
