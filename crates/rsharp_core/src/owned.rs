//! Compile-time ownership for native values
//!
//! [`Owned`] always owns its value and frees it on drop. [`Ref`] and
//! [`RefMut`] borrow from an owner and cannot outlive it, so the
//! runtime liveness checks of [`Handle`] are not needed on this path.

use crate::dispatch::NativeType;
use crate::handle::{Handle, Ptr};
use crate::ledger;
use core::fmt;
use core::marker::PhantomData;

/// Sole owner of a native value
pub struct Owned<T: NativeType> {
    ptr: Ptr<T>,
}

impl<T: NativeType> Owned<T> {
    /// Take ownership of a freshly constructed native value
    ///
    /// # Safety
    /// `ptr` must come from the native constructor for `T`, and nothing else
    /// may free it.
    pub unsafe fn from_raw(ptr: Ptr<T>) -> Self {
        ledger::claim_global(T::NAME, ptr.addr());
        Self { ptr }
    }

    /// Give up ownership without freeing
    pub fn into_raw(self) -> Ptr<T> {
        let ptr = self.ptr;
        ledger::release_global(T::NAME, ptr.addr());
        core::mem::forget(self);
        ptr
    }

    /// Get the address for a native call
    #[inline]
    pub fn as_ptr(&self) -> Ptr<T> {
        self.ptr
    }

    /// Borrow for read-only native calls
    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        Ref {
            ptr: self.ptr,
            _owner: PhantomData,
        }
    }

    /// Borrow for mutating native calls
    #[inline]
    pub fn borrow_mut(&mut self) -> RefMut<'_, T> {
        RefMut {
            ptr: self.ptr,
            _owner: PhantomData,
        }
    }

    /// Convert into a runtime-checked owning handle
    pub fn into_handle(self) -> Handle<T> {
        let ptr = self.into_raw();
        // Safety: ownership moved out of `self` above
        unsafe { Handle::owned(ptr) }
    }
}

impl<T: NativeType> Drop for Owned<T> {
    fn drop(&mut self) {
        ledger::release_global(T::NAME, self.ptr.addr());
        log::debug!("Dropping native '{}' at {:#x}", T::NAME, self.ptr.addr());

        // Safety: `Owned` is the sole owner and is dropped only once
        if let Err(e) = unsafe { T::drop_native(self.ptr) } {
            log::error!("Failed to drop native '{}': {}", T::NAME, e);
        }
    }
}

impl<T: NativeType> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned<{}>({:#x})", T::NAME, self.ptr.addr())
    }
}

/// Read-only borrow tied to the lifetime of its owner
pub struct Ref<'a, T: NativeType> {
    ptr: Ptr<T>,
    _owner: PhantomData<&'a Owned<T>>,
}

impl<'a, T: NativeType> Ref<'a, T> {
    /// Get the address for a read-only native call
    #[inline]
    pub fn as_ptr(&self) -> Ptr<T> {
        self.ptr
    }
}

impl<T: NativeType> Clone for Ref<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: NativeType> Copy for Ref<'_, T> {}

impl<T: NativeType> fmt::Debug for Ref<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref<{}>({:#x})", T::NAME, self.ptr.addr())
    }
}

/// Exclusive borrow tied to the lifetime of its owner
pub struct RefMut<'a, T: NativeType> {
    ptr: Ptr<T>,
    _owner: PhantomData<&'a mut Owned<T>>,
}

impl<'a, T: NativeType> RefMut<'a, T> {
    /// Get the address for a mutating native call
    #[inline]
    pub fn as_ptr(&self) -> Ptr<T> {
        self.ptr
    }

    /// Shorter-lived exclusive borrow
    pub fn reborrow(&mut self) -> RefMut<'_, T> {
        RefMut {
            ptr: self.ptr,
            _owner: PhantomData,
        }
    }

    /// Downgrade to a read-only borrow
    pub fn as_shared(&self) -> Ref<'_, T> {
        Ref {
            ptr: self.ptr,
            _owner: PhantomData,
        }
    }
}

impl<T: NativeType> fmt::Debug for RefMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefMut<{}>({:#x})", T::NAME, self.ptr.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::handle::OwnershipMode;
    use std::cell::RefCell;

    thread_local! {
        static FREED: RefCell<Vec<usize>> = RefCell::new(Vec::new());
    }

    struct Cell;

    impl NativeType for Cell {
        const NAME: &'static str = "Cell";

        unsafe fn drop_native(ptr: Ptr<Self>) -> Result<()> {
            FREED.with(|f| f.borrow_mut().push(ptr.addr()));
            Ok(())
        }
    }

    fn freed() -> Vec<usize> {
        FREED.with(|f| f.borrow().clone())
    }

    #[test]
    fn test_drop_frees_once() {
        {
            let owned = unsafe { Owned::<Cell>::from_raw(Ptr::from_addr(0x100)) };
            let view = owned.borrow();
            let copy = view;
            assert_eq!(copy.as_ptr(), view.as_ptr());
        }
        assert_eq!(freed(), vec![0x100]);
    }

    #[test]
    fn test_into_raw_does_not_free() {
        let owned = unsafe { Owned::<Cell>::from_raw(Ptr::from_addr(0x200)) };
        let ptr = owned.into_raw();
        assert_eq!(ptr.addr(), 0x200);
        assert!(freed().is_empty());
    }

    #[test]
    fn test_mutable_borrows() {
        let mut owned = unsafe { Owned::<Cell>::from_raw(Ptr::from_addr(0x300)) };
        {
            let mut slot = owned.borrow_mut();
            let inner = slot.reborrow();
            assert_eq!(inner.as_ptr().addr(), 0x300);
            assert_eq!(slot.as_shared().as_ptr().addr(), 0x300);
        }
        assert_eq!(format!("{:?}", owned), "Owned<Cell>(0x300)");
        assert_eq!(format!("{:?}", owned.borrow()), "Ref<Cell>(0x300)");
    }

    #[test]
    fn test_into_handle_transfers_ownership() {
        let owned = unsafe { Owned::<Cell>::from_raw(Ptr::from_addr(0x400)) };
        let mut handle = owned.into_handle();
        assert_eq!(handle.mode(), OwnershipMode::Owned);
        assert!(freed().is_empty());

        handle.dispose().unwrap();
        assert_eq!(freed(), vec![0x400]);
    }
}
