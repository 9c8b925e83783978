//! C ABI types shared by the exported functions
//!
//! All types use `#[repr(C)]` so the host runtime can mirror them.

#![allow(non_snake_case)]

use rsharp_core::naming::ABI_VERSION;

/// Module path every exported symbol is mangled under
pub const SYMBOL_PATH: &str = "rsharp";

/// Borrowed view of a byte buffer owned by the native side
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ByteSlice {
    pub ptr: *const u8,
    pub len: usize,
}

impl ByteSlice {
    pub const EMPTY: Self = Self {
        ptr: core::ptr::null(),
        len: 0,
    };

    pub fn new(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    /// View as a Rust slice
    ///
    /// # Safety
    /// The owner of the bytes must still be alive and unmodified.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        raw_slice(self.ptr, self.len).unwrap_or(&[])
    }
}

/// Build a slice from a pointer and length handed over the boundary
///
/// A zero length is always valid; a null pointer with a non-zero length is not.
///
/// # Safety
/// If `ptr` is non-null it must point at `len` initialized values.
pub(crate) unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        Some(&[])
    } else if ptr.is_null() {
        None
    } else {
        Some(core::slice::from_raw_parts(ptr, len))
    }
}

/// Report the version of the exported function set
#[no_mangle]
pub extern "C" fn rsharp__api_version() -> u32 {
    ABI_VERSION
}

/// Type alias for the api version function
pub type ApiVersionFn = extern "C" fn() -> u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_slice() {
        let data = [1u8, 2, 3];
        unsafe {
            assert_eq!(raw_slice(data.as_ptr(), 3), Some(&data[..]));
            assert_eq!(raw_slice::<u8>(core::ptr::null(), 0), Some(&[][..]));
            assert_eq!(raw_slice::<u8>(core::ptr::null(), 2), None);
            assert!(ByteSlice::EMPTY.as_slice().is_empty());
        }
    }
}
