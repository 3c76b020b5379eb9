//! Thread-shareable VM handle

use crate::{
    error::{HostError, Result},
    host::Host,
    message::CallMessage,
    outcome::ExecutionOutcome,
    vm::Vm,
};
use parking_lot::RwLock;
use std::{
    cell::RefCell,
    sync::atomic::{AtomicBool, Ordering},
};
use vmc_abi::{Capabilities, Revision};

thread_local! {
    // Handles this thread is executing on, innermost last.
    static EXECUTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks the current thread as executing on one handle until dropped
struct Entered(usize);

impl Drop for Entered {
    fn drop(&mut self) {
        EXECUTING.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|key| *key == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// A [`Vm`] that several threads may use
///
/// Calls are serialised unless the module reported
/// [`Capabilities::REENTRANT`] when the handle was built, in which case
/// executions share a read lock and run concurrently. Option changes and
/// destruction always take the write lock, so `destroy` waits for in-flight
/// executions and every later call fails with [`HostError::Destroyed`]
/// instead of reaching freed memory.
///
/// Once `destroy` has been requested no new execution starts, so a steady
/// stream of callers cannot hold it off. Nested calls made from inside a
/// running execution on the same thread still go through.
#[derive(Debug)]
pub struct SharedVm {
    inner: RwLock<Option<Vm>>,
    reentrant: bool,
    closing: AtomicBool,
}

impl SharedVm {
    /// Wraps `vm`
    pub fn new(vm: Vm) -> Self {
        let reentrant = vm.capabilities().contains(Capabilities::REENTRANT);
        Self {
            inner: RwLock::new(Some(vm)),
            reentrant,
            closing: AtomicBool::new(false),
        }
    }

    /// True if executions run concurrently
    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    fn enter(&self) -> Result<Entered> {
        let key = self.key();
        let nested = EXECUTING.with(|active| active.borrow().contains(&key));
        if !nested && self.closing.load(Ordering::Acquire) {
            return Err(HostError::Destroyed);
        }
        EXECUTING.with(|active| active.borrow_mut().push(key));
        Ok(Entered(key))
    }

    /// Executes `code` for `msg`; see [`Vm::execute`]
    pub fn execute(
        &self,
        host: &mut dyn Host,
        rev: Revision,
        msg: &CallMessage,
        code: &[u8],
    ) -> Result<ExecutionOutcome> {
        let _entered = self.enter()?;
        if self.reentrant {
            // Recursive so a nested call on this instance never waits behind a writer.
            let guard = self.inner.read_recursive();
            let vm = guard.as_ref().ok_or(HostError::Destroyed)?;
            unsafe { vm.dispatch(host, rev, msg, code) }
        } else {
            let mut guard = self.inner.write();
            let vm = guard.as_mut().ok_or(HostError::Destroyed)?;
            vm.execute(host, rev, msg, code)
        }
    }

    /// Sets a named option; see [`Vm::set_option`]
    pub fn set_option(&self, name: &str, value: &str) -> Result<()> {
        if self.closing.load(Ordering::Acquire) {
            return Err(HostError::Destroyed);
        }
        let mut guard = self.inner.write();
        guard.as_mut().ok_or(HostError::Destroyed)?.set_option(name, value)
    }

    /// Implementation name, or `None` once destroyed
    pub fn name(&self) -> Option<String> {
        if self.closing.load(Ordering::Acquire) {
            return None;
        }
        self.inner.read().as_ref().map(|vm| vm.name().to_string())
    }

    /// Destroys the instance
    ///
    /// New executions are refused from this point on; the module's `destroy`
    /// runs once the executions already in flight have returned. Only the
    /// first call destroys; later calls return [`HostError::Destroyed`].
    pub fn destroy(&self) -> Result<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            return Err(HostError::Destroyed);
        }
        let vm = self.inner.write().take().ok_or(HostError::Destroyed)?;
        vm.destroy();
        Ok(())
    }

    /// True once [`SharedVm::destroy`] has been called
    pub fn is_destroyed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}

impl From<Vm> for SharedVm {
    fn from(vm: Vm) -> Self {
        Self::new(vm)
    }
}
