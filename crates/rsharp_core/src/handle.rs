//! Ownership-tagged handles to native values
//!
//! A handle wraps an address handed out by the native side together with
//! the obligation attached to it. Owned handles free the value exactly
//! once; shared and mutable references never free. Every accessor checks
//! liveness before the address is released to the caller.

use crate::dispatch::NativeType;
use crate::error::{HandleError, Result};
use crate::ledger;
use crate::owned::Owned;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Typed address of a native value of type T
///
/// The handle layer never dereferences it.
#[repr(transparent)]
pub struct Ptr<T> {
    raw: *mut T,
}

impl<T> Ptr<T> {
    /// Wrap a raw pointer
    #[inline]
    pub const fn new(raw: *mut T) -> Self {
        Self { raw }
    }

    /// The poisoned address stored in disposed handles
    #[inline]
    pub const fn null() -> Self {
        Self {
            raw: core::ptr::null_mut(),
        }
    }

    /// Create from a pointer-sized integer
    #[inline]
    pub fn from_addr(addr: usize) -> Self {
        Self { raw: addr as *mut T }
    }

    /// Get the address as a pointer-sized integer
    #[inline]
    pub fn addr(&self) -> usize {
        self.raw as usize
    }

    /// Check if this is the null address
    #[inline]
    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// Get the raw pointer
    #[inline]
    pub const fn as_ptr(&self) -> *mut T {
        self.raw
    }

    /// Reinterpret as the address of a different type
    #[inline]
    pub const fn cast<U>(self) -> Ptr<U> {
        Ptr {
            raw: self.raw as *mut U,
        }
    }
}

// Manual trait implementations to avoid T bounds
impl<T> Clone for Ptr<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ptr<T> {}

impl<T> PartialEq for Ptr<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Ptr<T> {}

impl<T> Hash for Ptr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T> fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ptr<{}>({:#x})", core::any::type_name::<T>(), self.addr())
    }
}

// Safety: a Ptr is only an address; the value behind it moves with it
unsafe impl<T: Send> Send for Ptr<T> {}

/// What a handle is allowed to do with the value it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnershipMode {
    /// Sole owner; disposal frees the native value
    Owned,
    /// Read-only borrow; never frees
    SharedRef,
    /// Mutable borrow; never frees
    MutRef,
}

impl OwnershipMode {
    /// Check if this mode carries the obligation to free
    #[inline]
    pub const fn is_owned(self) -> bool {
        matches!(self, OwnershipMode::Owned)
    }

    /// Check if this mode licenses mutation
    #[inline]
    pub const fn allows_mutation(self) -> bool {
        matches!(self, OwnershipMode::Owned | OwnershipMode::MutRef)
    }
}

impl fmt::Display for OwnershipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipMode::Owned => write!(f, "owned"),
            OwnershipMode::SharedRef => write!(f, "shared reference"),
            OwnershipMode::MutRef => write!(f, "mutable reference"),
        }
    }
}

/// Lifecycle state of a handle. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Live(OwnershipMode),
    Disposed,
}

/// Liveness token shared by an owner and the borrows derived from it
#[derive(Debug, Clone)]
struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Validity of a group of borrows that a mutation of their parent invalidates
///
/// Borrows projected through a scope turn dead when it is closed. Borrows
/// projected after that belong to the fresh scope.
#[derive(Debug)]
pub struct BorrowScope {
    token: Liveness,
}

impl BorrowScope {
    pub fn new() -> Self {
        Self {
            token: Liveness::new(),
        }
    }

    /// Check if borrows projected through the current scope are still valid
    pub fn is_open(&self) -> bool {
        self.token.is_alive()
    }

    /// Kill every borrow projected so far and start a new scope
    pub fn close(&mut self) {
        self.token.revoke();
        self.token = Liveness::new();
    }
}

impl Default for BorrowScope {
    fn default() -> Self {
        Self::new()
    }
}

/// A live-or-dead reference to a native value with a known ownership mode
///
/// Handles perform no internal locking. Concurrent use of one handle must
/// be synchronized by the caller.
pub struct Handle<T: NativeType> {
    ptr: Ptr<T>,
    mode: OwnershipMode,
    live: bool,
    /// Owned handles hold their own token; derived borrows hold the owner's
    owner: Option<Liveness>,
    /// Scopes this borrow was projected through
    scopes: Vec<Liveness>,
}

impl<T: NativeType> Handle<T> {
    /// Wrap an address returned by the native side
    ///
    /// # Safety
    /// `ptr` must point at a live native `T`. For `Owned`, it must come from
    /// the native constructor for `T` and no other owning handle may exist
    /// for it. For borrows, the value must outlive the handle.
    pub unsafe fn create(ptr: Ptr<T>, mode: OwnershipMode) -> Self {
        let owner = if mode.is_owned() {
            ledger::claim_global(T::NAME, ptr.addr());
            Some(Liveness::new())
        } else {
            None
        };

        Self {
            ptr,
            mode,
            live: true,
            owner,
            scopes: Vec::new(),
        }
    }

    /// Wrap a freshly constructed native value
    ///
    /// # Safety
    /// See [`Handle::create`].
    pub unsafe fn owned(ptr: Ptr<T>) -> Self {
        Self::create(ptr, OwnershipMode::Owned)
    }

    /// Wrap a read-only borrow
    ///
    /// # Safety
    /// See [`Handle::create`].
    pub unsafe fn shared(ptr: Ptr<T>) -> Self {
        Self::create(ptr, OwnershipMode::SharedRef)
    }

    /// Wrap a mutable borrow
    ///
    /// # Safety
    /// See [`Handle::create`].
    pub unsafe fn mutable(ptr: Ptr<T>) -> Self {
        Self::create(ptr, OwnershipMode::MutRef)
    }

    /// Get the ownership mode
    #[inline]
    pub fn mode(&self) -> OwnershipMode {
        self.mode
    }

    /// Get the schema name of the referenced type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        T::NAME
    }

    /// Check if the handle may still be accessed
    ///
    /// A borrow derived from an owner turns dead once the owner is
    /// disposed or stolen from, or once a scope it was projected through
    /// is closed.
    pub fn is_live(&self) -> bool {
        self.live
            && self.owner.as_ref().map_or(true, Liveness::is_alive)
            && self.scopes.iter().all(Liveness::is_alive)
    }

    /// Get the lifecycle state
    pub fn state(&self) -> HandleState {
        if self.is_live() {
            HandleState::Live(self.mode)
        } else {
            HandleState::Disposed
        }
    }

    fn check_live(&self, operation: &'static str) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(HandleError::use_after_dispose(T::NAME, operation))
        }
    }

    fn guard_mutable(&self, operation: &'static str) -> Result<()> {
        if !self.mode.allows_mutation() {
            return Err(HandleError::mutability(T::NAME, operation));
        }
        self.check_live(operation)
    }

    fn guard_owned(&self, operation: &'static str) -> Result<()> {
        if !self.mode.is_owned() {
            return Err(HandleError::ownership(T::NAME, operation, self.mode));
        }
        self.check_live(operation)
    }

    // ========== Access ==========

    /// Get the address for a read-only native call
    pub fn access(&self) -> Result<Ptr<T>> {
        self.check_live("access")?;
        Ok(self.ptr)
    }

    /// Get the address for a mutating native call
    pub fn access_mut(&self) -> Result<Ptr<T>> {
        self.guard_mutable("access_mut")?;
        Ok(self.ptr)
    }

    /// Fail unless the handle licenses mutation
    pub fn require_mutable(&self) -> Result<()> {
        self.guard_mutable("require_mutable")
    }

    /// Fail unless the handle owns its value
    pub fn require_owned(&self) -> Result<()> {
        self.guard_owned("require_owned")
    }

    // ========== Lifetime ==========

    /// Release the handle
    ///
    /// Owned handles free the native value; borrows only turn dead.
    /// Disposing a dead handle does nothing, so explicit disposal and
    /// `Drop` never free twice. The handle is poisoned before the
    /// destructor runs.
    pub fn dispose(&mut self) -> Result<()> {
        if !self.live {
            return Ok(());
        }

        let ptr = self.invalidate();
        if !self.mode.is_owned() {
            return Ok(());
        }

        ledger::release_global(T::NAME, ptr.addr());
        log::debug!("Dropping native '{}' at {:#x}", T::NAME, ptr.addr());

        // Safety: the handle owned `ptr` and is now dead, so this is the only free
        unsafe { T::drop_native(ptr) }
    }

    /// Move ownership out of the handle without freeing
    ///
    /// The caller becomes responsible for the returned address, usually by
    /// passing it to a consuming native call or wrapping it in a new owner.
    /// Borrows cannot be stolen from and are left untouched.
    pub fn steal(&mut self) -> Result<Ptr<T>> {
        self.guard_owned("steal")?;

        let ptr = self.invalidate();
        ledger::release_global(T::NAME, ptr.addr());
        log::debug!("Stole native '{}' at {:#x}", T::NAME, ptr.addr());

        Ok(ptr)
    }

    /// Steal the value, hand it to a consuming native call, and own the result
    ///
    /// # Safety
    /// `f` must take ownership of its argument and return a freshly owned
    /// native `U`.
    pub unsafe fn transfer<U, F>(&mut self, f: F) -> Result<Handle<U>>
    where
        U: NativeType,
        F: FnOnce(Ptr<T>) -> Ptr<U>,
    {
        let ptr = self.steal()?;
        Ok(Handle::owned(f(ptr)))
    }

    /// Convert into the compile-time owning type
    pub fn into_owned(mut self) -> Result<Owned<T>> {
        let ptr = self.steal()?;
        // Safety: the address was owned by this handle and ownership moved out
        Ok(unsafe { Owned::from_raw(ptr) })
    }

    fn invalidate(&mut self) -> Ptr<T> {
        self.live = false;
        if self.mode.is_owned() {
            if let Some(owner) = &self.owner {
                owner.revoke();
            }
        }
        core::mem::replace(&mut self.ptr, Ptr::null())
    }

    // ========== Derived borrows ==========

    /// Derive a read-only borrow of the same value
    pub fn borrow_shared(&self) -> Result<Handle<T>> {
        // Safety: identity projection of a live address
        unsafe { self.project_shared(|ptr| ptr) }
    }

    /// Derive a mutable borrow of the same value
    pub fn borrow_mut(&self) -> Result<Handle<T>> {
        // Safety: identity projection of a live address
        unsafe { self.project_mut(|ptr| ptr) }
    }

    /// Derive a read-only borrow of a value reachable from this one
    ///
    /// The borrow turns dead when this handle's owner is disposed.
    ///
    /// # Safety
    /// `f` must return the address of a live native `U` owned by the value
    /// behind this handle.
    pub unsafe fn project_shared<U, F>(&self, f: F) -> Result<Handle<U>>
    where
        U: NativeType,
        F: FnOnce(Ptr<T>) -> Ptr<U>,
    {
        self.check_live("borrow")?;
        Ok(self.derive(f(self.ptr), OwnershipMode::SharedRef, None))
    }

    /// Derive a mutable borrow of a value reachable from this one
    ///
    /// # Safety
    /// See [`Handle::project_shared`].
    pub unsafe fn project_mut<U, F>(&self, f: F) -> Result<Handle<U>>
    where
        U: NativeType,
        F: FnOnce(Ptr<T>) -> Ptr<U>,
    {
        self.guard_mutable("borrow_mut")?;
        Ok(self.derive(f(self.ptr), OwnershipMode::MutRef, None))
    }

    /// Like [`Handle::project_shared`], but the borrow also dies when
    /// `scope` is closed
    ///
    /// # Safety
    /// See [`Handle::project_shared`]. The returned address may only be
    /// invalidated by operations that close `scope`.
    pub unsafe fn project_shared_in<U, F>(&self, scope: &BorrowScope, f: F) -> Result<Handle<U>>
    where
        U: NativeType,
        F: FnOnce(Ptr<T>) -> Ptr<U>,
    {
        self.check_live("borrow")?;
        Ok(self.derive(f(self.ptr), OwnershipMode::SharedRef, Some(scope)))
    }

    /// Like [`Handle::project_mut`], but the borrow also dies when `scope`
    /// is closed
    ///
    /// # Safety
    /// See [`Handle::project_shared_in`].
    pub unsafe fn project_mut_in<U, F>(&self, scope: &BorrowScope, f: F) -> Result<Handle<U>>
    where
        U: NativeType,
        F: FnOnce(Ptr<T>) -> Ptr<U>,
    {
        self.guard_mutable("borrow_mut")?;
        Ok(self.derive(f(self.ptr), OwnershipMode::MutRef, Some(scope)))
    }

    fn derive<U: NativeType>(&self, ptr: Ptr<U>, mode: OwnershipMode, scope: Option<&BorrowScope>) -> Handle<U> {
        let mut scopes = self.scopes.clone();
        if let Some(scope) = scope {
            scopes.push(scope.token.clone());
        }

        Handle {
            ptr,
            mode,
            live: true,
            owner: self.owner.clone(),
            scopes,
        }
    }
}

impl<T: NativeType> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::error!("Failed to dispose native '{}': {}", T::NAME, e);
        }
    }
}

impl<T: NativeType> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            HandleState::Live(mode) => {
                write!(f, "Handle<{}>({:#x}, {})", T::NAME, self.ptr.addr(), mode)
            }
            HandleState::Disposed => write!(f, "Handle<{}>(disposed)", T::NAME),
        }
    }
}
