//! Live-instance registry
//!
//! Every instance created by this module is recorded by module type and
//! address until it is destroyed. Entry points look the pair up before
//! touching the instance, so a call on a destroyed instance, or on an
//! instance of another module type linked into the same binary, is detected
//! instead of reading freed or foreign memory.
//!
//! Detection is best effort: once freed, an address can be reused by a new
//! instance, and a stale pointer then aliases the new one.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::{any::TypeId, collections::HashSet};

type Key = (TypeId, usize);

static LIVE: Lazy<Mutex<HashSet<Key>>> = Lazy::new(|| Mutex::new(HashSet::new()));

pub(crate) fn register<M: 'static>(address: usize) {
    LIVE.lock().insert((TypeId::of::<M>(), address));
}

/// Removes the entry; false if it was not live
pub(crate) fn remove<M: 'static>(address: usize) -> bool {
    LIVE.lock().remove(&(TypeId::of::<M>(), address))
}

pub(crate) fn contains<M: 'static>(address: usize) -> bool {
    LIVE.lock().contains(&(TypeId::of::<M>(), address))
}

/// Number of instances created by this module and not yet destroyed
pub fn live_instances() -> usize {
    LIVE.lock().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct First;
    struct Second;

    #[test]
    fn test_register_and_remove() {
        // Odd addresses never collide with real allocations.
        let address = 0x1001;
        register::<First>(address);
        assert!(contains::<First>(address));
        assert!(remove::<First>(address));
        assert!(!contains::<First>(address));
        assert!(!remove::<First>(address));
    }

    #[test]
    fn test_entries_are_per_type() {
        let address = 0x2003;
        register::<First>(address);
        assert!(!contains::<Second>(address));
        assert!(!remove::<Second>(address));
        assert!(remove::<First>(address));
    }
}
