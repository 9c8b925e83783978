//! Handle-based wrappers over the exported functions
//!
//! These are what a binding layer looks like when written in Rust: every
//! wrapper owns a [`Handle`], routes each call through the handle's guards,
//! and only then crosses into native code.

use crate::boxes::{rsharp__Box_String__get, rsharp__Box_String__new, BoxValue, Boxed, StringBox};
use crate::string::{rsharp__String__copy_utf16, rsharp__String__copy_utf8, rsharp__String__value, NativeString};
use crate::vec::{NativeVec, VecValue};
use rsharp_core::{BorrowScope, Handle, OwnershipMode, Ptr, Result};

/// A boxed primitive
pub struct RBox<T: BoxValue> {
    handle: Handle<Boxed<T>>,
}

impl<T: BoxValue> RBox<T> {
    /// Box `value` on the native heap
    pub fn new(value: T) -> Self {
        let raw = T::box_new(value);
        // Safety: fresh allocation from the matching constructor
        let handle = unsafe { Handle::owned(Ptr::new(raw).cast::<Boxed<T>>()) };
        Self { handle }
    }

    /// Wrap an existing handle
    pub fn from_handle(handle: Handle<Boxed<T>>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle<Boxed<T>> {
        &self.handle
    }

    pub fn into_handle(self) -> Handle<Boxed<T>> {
        self.handle
    }

    pub fn mode(&self) -> OwnershipMode {
        self.handle.mode()
    }

    /// Read the value
    pub fn get(&self) -> Result<T> {
        let ptr = self.handle.access()?;
        Ok(unsafe { T::box_get(ptr.as_ptr().cast()) })
    }

    /// Overwrite the value
    pub fn set(&mut self, value: T) -> Result<()> {
        let ptr = self.handle.access_mut()?;
        unsafe { T::box_set(ptr.as_ptr().cast(), value) };
        Ok(())
    }

    /// Move the box out for a consuming native call
    pub fn steal(&mut self) -> Result<Ptr<Boxed<T>>> {
        self.handle.steal()
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.handle.dispose()
    }
}

/// A native string
pub struct RString {
    handle: Handle<NativeString>,
}

impl RString {
    /// Copy `value` onto the native heap
    pub fn new(value: &str) -> Self {
        let raw = NativeString::into_raw(value.to_owned());
        // Safety: fresh allocation from the native constructor
        let handle = unsafe { Handle::owned(Ptr::new(raw)) };
        Self { handle }
    }

    /// Copy a UTF-8 buffer through the exported constructor
    pub fn from_utf8(bytes: &[u8]) -> Option<Self> {
        let raw = unsafe { rsharp__String__copy_utf8(bytes.as_ptr(), bytes.len()) };
        Self::from_raw_owned(raw)
    }

    /// Copy a UTF-16 buffer through the exported constructor
    pub fn from_utf16(units: &[u16]) -> Option<Self> {
        let raw = unsafe { rsharp__String__copy_utf16(units.as_ptr(), units.len()) };
        Self::from_raw_owned(raw)
    }

    fn from_raw_owned(raw: *mut NativeString) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        // Safety: non-null result of a native constructor
        let handle = unsafe { Handle::owned(Ptr::new(raw)) };
        Some(Self { handle })
    }

    /// Wrap an existing handle
    pub fn from_handle(handle: Handle<NativeString>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle<NativeString> {
        &self.handle
    }

    pub fn mode(&self) -> OwnershipMode {
        self.handle.mode()
    }

    /// Move the string out for a consuming native call
    pub fn steal(&mut self) -> Result<Ptr<NativeString>> {
        self.handle.steal()
    }

    /// Copy the string back out
    pub fn value(&self) -> Result<String> {
        let ptr = self.handle.access()?;
        let bytes = unsafe { rsharp__String__value(ptr.as_ptr()).as_slice() };
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Length in UTF-8 bytes
    pub fn len(&self) -> Result<usize> {
        let ptr = self.handle.access()?;
        Ok(unsafe { rsharp__String__value(ptr.as_ptr()) }.len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.handle.dispose()
    }
}

/// Box a string, consuming it
pub struct RStringBox {
    handle: Handle<StringBox>,
}

impl RStringBox {
    /// Move `value` into a new box
    ///
    /// `value` must be an owner; on error it is left untouched.
    pub fn new(value: &mut RString) -> Result<Self> {
        let raw = value.steal()?;
        let boxed = unsafe { rsharp__Box_String__new(raw.as_ptr()) };
        // Safety: fresh allocation from the native constructor, non-null
        // because `raw` came from a live owner
        let handle = unsafe { Handle::owned(Ptr::new(boxed)) };
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &Handle<StringBox> {
        &self.handle
    }

    /// Read-only view of the boxed string, dead once the box is disposed
    pub fn get(&self) -> Result<RString> {
        // Safety: the string lives inside the box for as long as the box does
        let view = unsafe {
            self.handle
                .project_shared(|ptr| Ptr::new(rsharp__Box_String__get(ptr.as_ptr()) as *mut NativeString))
        }?;
        Ok(RString::from_handle(view))
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.handle.dispose()
    }
}

/// A native vector of value types
///
/// Element views die when the vector is disposed, and also when `push` or
/// `set` goes through, since either may move or replace what they point at.
pub struct RVec<T: VecValue> {
    handle: Handle<NativeVec<T>>,
    views: BorrowScope,
}

/// A native vector of `i32`
pub type RVecI32 = RVec<i32>;

impl<T: VecValue> RVec<T> {
    pub fn new() -> Self {
        let raw = T::vec_new();
        // Safety: fresh allocation from the native constructor
        let handle = unsafe { Handle::owned(Ptr::new(raw)) };
        Self {
            handle,
            views: BorrowScope::new(),
        }
    }

    pub fn handle(&self) -> &Handle<NativeVec<T>> {
        &self.handle
    }

    pub fn len(&self) -> Result<usize> {
        let ptr = self.handle.access()?;
        Ok(unsafe { T::vec_len(ptr.as_ptr()) })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read-only view of an element
    pub fn get(&self, index: usize) -> Result<Option<RBox<T>>> {
        let ptr = self.handle.access()?;
        let elem = unsafe { T::vec_get(ptr.as_ptr(), index) };
        if elem.is_null() {
            return Ok(None);
        }

        // Safety: `elem` points into the buffer, which only `push` and `set` move
        let view = unsafe {
            self.handle
                .project_shared_in(&self.views, |_| Ptr::new(elem as *mut T).cast::<Boxed<T>>())
        }?;
        Ok(Some(RBox::from_handle(view)))
    }

    /// Mutable view of an element
    pub fn get_mut(&mut self, index: usize) -> Result<Option<RBox<T>>> {
        let ptr = self.handle.access_mut()?;
        let elem = unsafe { T::vec_get_mut(ptr.as_ptr(), index) };
        if elem.is_null() {
            return Ok(None);
        }

        // Safety: as in `get`
        let view = unsafe {
            self.handle
                .project_mut_in(&self.views, |_| Ptr::new(elem).cast::<Boxed<T>>())
        }?;
        Ok(Some(RBox::from_handle(view)))
    }

    /// Overwrite an element, consuming `item`
    ///
    /// Returns false when `index` is out of range; `item` is consumed anyway.
    /// On error `item` is left untouched.
    pub fn set(&mut self, index: usize, item: &mut RBox<T>) -> Result<bool> {
        let vec = self.handle.access_mut()?;
        let raw = item.steal()?;
        let stored = unsafe { T::vec_set(vec.as_ptr(), index, raw.as_ptr().cast()) };
        self.views.close();
        Ok(stored)
    }

    /// Append an element, consuming `item`
    pub fn push(&mut self, item: &mut RBox<T>) -> Result<()> {
        let vec = self.handle.access_mut()?;
        let raw = item.steal()?;
        unsafe { T::vec_push(vec.as_ptr(), raw.as_ptr().cast()) };
        self.views.close();
        Ok(())
    }

    /// Copy all elements out
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let ptr = self.handle.access()?;
        let len = unsafe { T::vec_len(ptr.as_ptr()) };
        Ok((0..len)
            .map(|i| unsafe { *T::vec_get(ptr.as_ptr(), i) })
            .collect())
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.views.close();
        self.handle.dispose()
    }
}

impl<T: VecValue> Default for RVec<T> {
    fn default() -> Self {
        Self::new()
    }
}
