//! Native strings
//!
//! Strings are copied in from UTF-8 or UTF-16 buffers and read back as
//! borrowed UTF-8 bytes. Invalid input yields a null pointer instead of
//! unwinding across the boundary.

#![allow(non_snake_case)]

use crate::ffi::{raw_slice, ByteSlice};
use rsharp_core::{NativeType, Ptr, Result};

/// A string owned by the native side
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeString {
    inner: String,
}

impl NativeString {
    /// Move a Rust string onto the native heap
    pub fn into_raw(inner: String) -> *mut NativeString {
        Box::into_raw(Box::new(NativeString { inner }))
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl NativeType for NativeString {
    const NAME: &'static str = "String";

    unsafe fn drop_native(ptr: Ptr<Self>) -> Result<()> {
        rsharp__String__drop(ptr.as_ptr());
        Ok(())
    }
}

/// Copy a UTF-8 buffer into a new string. Null if the bytes are not UTF-8.
///
/// # Safety
/// `utf8` must point at `len` readable bytes, or `len` must be zero.
#[no_mangle]
pub unsafe extern "C" fn rsharp__String__copy_utf8(utf8: *const u8, len: usize) -> *mut NativeString {
    let Some(bytes) = raw_slice(utf8, len) else {
        log::warn!("Rejected null UTF-8 buffer of length {}", len);
        return core::ptr::null_mut();
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => NativeString::into_raw(s.to_owned()),
        Err(e) => {
            log::warn!("Rejected invalid UTF-8 string: {}", e);
            core::ptr::null_mut()
        }
    }
}

/// Copy a UTF-16 buffer into a new string. Null if the units are not UTF-16.
///
/// # Safety
/// `utf16` must point at `len` readable code units, or `len` must be zero.
#[no_mangle]
pub unsafe extern "C" fn rsharp__String__copy_utf16(utf16: *const u16, len: usize) -> *mut NativeString {
    let Some(units) = raw_slice(utf16, len) else {
        log::warn!("Rejected null UTF-16 buffer of length {}", len);
        return core::ptr::null_mut();
    };

    match String::from_utf16(units) {
        Ok(s) => NativeString::into_raw(s),
        Err(e) => {
            log::warn!("Rejected invalid UTF-16 string: {}", e);
            core::ptr::null_mut()
        }
    }
}

/// Borrow the UTF-8 bytes of a string. Valid until the string is freed.
///
/// # Safety
/// `s` must be null or point at a live string.
#[no_mangle]
pub unsafe extern "C" fn rsharp__String__value(s: *const NativeString) -> ByteSlice {
    match s.as_ref() {
        Some(s) => ByteSlice::new(s.inner.as_bytes()),
        None => ByteSlice::EMPTY,
    }
}

/// # Safety
/// `s` must be null or come from one of the copy functions, and not have been freed.
#[no_mangle]
pub unsafe extern "C" fn rsharp__String__drop(s: *mut NativeString) {
    if !s.is_null() {
        drop(Box::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_utf8_rejects_invalid_bytes() {
        let bad = [0xffu8, 0xfe];
        assert!(unsafe { rsharp__String__copy_utf8(bad.as_ptr(), bad.len()) }.is_null());
        assert!(unsafe { rsharp__String__copy_utf8(core::ptr::null(), 4) }.is_null());
    }

    #[test]
    fn test_copy_utf16_and_read_back() {
        let units: Vec<u16> = "héllo".encode_utf16().collect();
        unsafe {
            let s = rsharp__String__copy_utf16(units.as_ptr(), units.len());
            assert!(!s.is_null());
            assert_eq!(rsharp__String__value(s).as_slice(), "héllo".as_bytes());
            rsharp__String__drop(s);
        }

        let lone_surrogate = [0xd800u16];
        assert!(unsafe { rsharp__String__copy_utf16(lone_surrogate.as_ptr(), 1) }.is_null());
    }

    #[test]
    fn test_empty_string_from_null_buffer() {
        unsafe {
            let s = rsharp__String__copy_utf8(core::ptr::null(), 0);
            assert_eq!((*s).as_str(), "");
            rsharp__String__drop(s);
            assert_eq!(rsharp__String__value(core::ptr::null()).len, 0);
        }
    }
}
