//! Ownership ledger
//!
//! Records which addresses currently have an owning handle, so that a
//! second owner for the same value is caught before it can double-free.
//! With the `tracking` feature, every owning [`Handle`](crate::Handle) and
//! [`Owned`](crate::Owned) claims and releases its address in a global ledger.

use crate::error::{HandleError, Result};
use std::collections::HashSet;

/// Set of (schema name, address) pairs that have a live owner
#[derive(Debug, Default)]
pub struct OwnershipLedger {
    owned: HashSet<(&'static str, usize)>,
}

impl OwnershipLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self {
            owned: HashSet::new(),
        }
    }

    /// Record a new owner for `address`
    pub fn claim(&mut self, type_name: &'static str, address: usize) -> Result<()> {
        if self.owned.insert((type_name, address)) {
            Ok(())
        } else {
            Err(HandleError::AliasedOwner { type_name, address })
        }
    }

    /// Forget the owner of `address`. Returns false if none was recorded.
    pub fn release(&mut self, type_name: &'static str, address: usize) -> bool {
        self.owned.remove(&(type_name, address))
    }

    /// Check if `address` has a recorded owner
    pub fn is_owned(&self, type_name: &'static str, address: usize) -> bool {
        self.owned.contains(&(type_name, address))
    }

    /// Get the number of live owners
    pub fn live_count(&self) -> usize {
        self.owned.len()
    }
}

#[cfg(feature = "tracking")]
pub fn global() -> &'static parking_lot::Mutex<OwnershipLedger> {
    use std::sync::OnceLock;
    static GLOBAL: OnceLock<parking_lot::Mutex<OwnershipLedger>> = OnceLock::new();
    GLOBAL.get_or_init(|| parking_lot::Mutex::new(OwnershipLedger::new()))
}

#[cfg(feature = "tracking")]
pub(crate) fn claim_global(type_name: &'static str, address: usize) {
    if let Err(e) = global().lock().claim(type_name, address) {
        log::error!("{}", e);
        debug_assert!(false, "{}", e);
    }
}

#[cfg(feature = "tracking")]
pub(crate) fn release_global(type_name: &'static str, address: usize) {
    if !global().lock().release(type_name, address) {
        log::warn!("Released untracked '{}' at {:#x}", type_name, address);
    }
}

#[cfg(not(feature = "tracking"))]
#[inline]
pub(crate) fn claim_global(_type_name: &'static str, _address: usize) {}

#[cfg(not(feature = "tracking"))]
#[inline]
pub(crate) fn release_global(_type_name: &'static str, _address: usize) {}
