//! Drop dispatch
//!
//! Maps each native type to the one destructor allowed to free it. The
//! association is normally fixed at compile time through [`NativeType`].
//! Destructors resolved from a dynamically loaded library go through a
//! [`DropTable`], which refuses to hand out a destructor bound for a
//! different Rust type.

use crate::error::{HandleError, Result};
use crate::handle::Ptr;
use core::any::{Any, TypeId};
use core::fmt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Arc, OnceLock};

/// Signature shared by every exported native destructor
pub type DropFn = unsafe extern "C" fn(*mut c_void);

/// A type whose values live on the native side of the boundary
pub trait NativeType: Sized + 'static {
    /// Schema name used in exported symbol names, e.g. `Box_I32`
    const NAME: &'static str;

    /// Free the native value at `ptr`
    ///
    /// # Safety
    /// `ptr` must come from the native constructor for this type and must
    /// not have been freed already.
    unsafe fn drop_native(ptr: Ptr<Self>) -> Result<()>;
}

/// A destructor bound at runtime
#[derive(Clone)]
pub struct DropEntry {
    /// Rust type the destructor was bound for
    pub type_id: TypeId,
    /// Rust type name, for diagnostics
    pub rust_type: &'static str,
    /// Exported symbol the destructor was resolved from
    pub symbol: String,
    drop_fn: DropFn,
    /// Keeps the library exporting `drop_fn` loaded
    keepalive: Option<Arc<dyn Any + Send + Sync>>,
}

impl DropEntry {
    /// Get the destructor
    pub fn drop_fn(&self) -> DropFn {
        self.drop_fn
    }
}

impl fmt::Debug for DropEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropEntry")
            .field("rust_type", &self.rust_type)
            .field("symbol", &self.symbol)
            .field("pinned", &self.keepalive.is_some())
            .finish()
    }
}

/// Runtime table from schema name to destructor
#[derive(Debug, Default)]
pub struct DropTable {
    entries: HashMap<&'static str, DropEntry>,
}

impl DropTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Bind the destructor for `T`, returning the entry it replaced
    pub fn bind<T: NativeType>(&mut self, symbol: impl Into<String>, drop_fn: DropFn) -> Option<DropEntry> {
        self.insert::<T>(symbol.into(), drop_fn, None)
    }

    /// Bind the destructor for `T` and keep `keepalive` alive while bound
    pub fn bind_pinned<T: NativeType>(
        &mut self,
        symbol: impl Into<String>,
        drop_fn: DropFn,
        keepalive: Arc<dyn Any + Send + Sync>,
    ) -> Option<DropEntry> {
        self.insert::<T>(symbol.into(), drop_fn, Some(keepalive))
    }

    fn insert<T: NativeType>(
        &mut self,
        symbol: String,
        drop_fn: DropFn,
        keepalive: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Option<DropEntry> {
        let entry = DropEntry {
            type_id: TypeId::of::<T>(),
            rust_type: core::any::type_name::<T>(),
            symbol,
            drop_fn,
            keepalive,
        };

        self.replace(T::NAME, entry)
    }

    fn replace(&mut self, name: &'static str, entry: DropEntry) -> Option<DropEntry> {
        let previous = self.entries.insert(name, entry);
        if let Some(prev) = &previous {
            log::warn!("Rebinding destructor for '{}' (was '{}')", name, prev.symbol);
        }
        previous
    }

    /// Move every entry of `other` into this table
    ///
    /// Entries of `other` win over existing bindings for the same name.
    /// Returns how many entries were moved.
    pub fn merge(&mut self, other: DropTable) -> usize {
        let moved = other.entries.len();
        for (name, entry) in other.entries {
            self.replace(name, entry);
        }
        moved
    }

    /// Remove the destructor bound under a schema name
    pub fn unbind(&mut self, name: &str) -> Option<DropEntry> {
        self.entries.remove(name)
    }

    /// Look up the entry for `T`
    pub fn resolve<T: NativeType>(&self) -> Result<&DropEntry> {
        let entry = self
            .entries
            .get(T::NAME)
            .ok_or(HandleError::Unbound { type_name: T::NAME })?;

        if entry.type_id != TypeId::of::<T>() {
            return Err(HandleError::TypeConfusion {
                expected: core::any::type_name::<T>(),
                found: entry.rust_type,
            });
        }

        Ok(entry)
    }

    /// Free `ptr` with the destructor bound for `T`
    ///
    /// # Safety
    /// Same contract as [`NativeType::drop_native`].
    pub unsafe fn dispatch<T: NativeType>(&self, ptr: Ptr<T>) -> Result<()> {
        let drop_fn = self.resolve::<T>()?.drop_fn;
        drop_fn(ptr.as_ptr().cast());
        Ok(())
    }

    /// Check if a schema name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get the entry bound under a schema name
    pub fn entry(&self, name: &str) -> Option<&DropEntry> {
        self.entries.get(name)
    }

    /// Get all bound schema names
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Get the number of bound destructors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The process-wide drop table used by types declared with [`native_type!`]
pub fn global() -> &'static RwLock<DropTable> {
    static GLOBAL: OnceLock<RwLock<DropTable>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(DropTable::new()))
}

/// Free `ptr` through the global table
///
/// The lock is released before the destructor runs.
///
/// # Safety
/// Same contract as [`NativeType::drop_native`].
pub unsafe fn dispatch_global<T: NativeType>(ptr: Ptr<T>) -> Result<()> {
    let entry = global().read().resolve::<T>()?.clone();
    (entry.drop_fn)(ptr.as_ptr().cast());
    Ok(())
}

/// Declare an opaque native type whose destructor is bound at runtime
///
/// ```ignore
/// rsharp_core::native_type! {
///     /// A contract handle exported by the client library
///     pub struct ContractHandle => "ContractHandle";
/// }
/// ```
#[macro_export]
macro_rules! native_type {
    ($(#[$meta:meta])* $vis:vis struct $name:ident => $schema:literal;) => {
        $(#[$meta])*
        #[repr(C)]
        $vis struct $name {
            _private: [u8; 0],
        }

        impl $crate::NativeType for $name {
            const NAME: &'static str = $schema;

            unsafe fn drop_native(ptr: $crate::Ptr<Self>) -> $crate::Result<()> {
                $crate::dispatch::dispatch_global(ptr)
            }
        }
    };
}
