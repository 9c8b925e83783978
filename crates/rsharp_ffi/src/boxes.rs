//! Boxed value types
//!
//! Every primitive the schema knows gets `new`, `drop`, `get` and `set`
//! functions exported under `rsharp__Box_<T>__<op>`. Opaque types are boxed
//! by moving an existing value into the box.

#![allow(non_snake_case)]

use crate::string::NativeString;
use rsharp_core::{NativeType, Ptr, Result};

/// A primitive that can be boxed on the native heap
pub trait BoxValue: Copy + 'static {
    /// Schema name, e.g. `Box_I32`
    const SCHEMA: &'static str;

    fn box_new(value: Self) -> *mut Self;

    /// # Safety
    /// `ptr` must come from `box_new` and not have been freed.
    unsafe fn box_drop(ptr: *mut Self);

    /// # Safety
    /// `ptr` must point at a live value.
    unsafe fn box_get(ptr: *const Self) -> Self;

    /// # Safety
    /// `ptr` must point at a live value that may be written.
    unsafe fn box_set(ptr: *mut Self, value: Self);
}

/// Native-side view of a boxed `T`
#[repr(transparent)]
pub struct Boxed<T>(T);

impl<T: BoxValue> NativeType for Boxed<T> {
    const NAME: &'static str = T::SCHEMA;

    unsafe fn drop_native(ptr: Ptr<Self>) -> Result<()> {
        T::box_drop(ptr.as_ptr().cast());
        Ok(())
    }
}

macro_rules! box_values {
    ($($t:ty => $schema:literal { $new:ident, $drop:ident, $get:ident, $set:ident })+) => {
        $(
            #[no_mangle]
            pub extern "C" fn $new(value: $t) -> *mut $t {
                Box::into_raw(Box::new(value))
            }

            /// # Safety
            /// `value` must come from the matching `new` and not have been freed.
            #[no_mangle]
            pub unsafe extern "C" fn $drop(value: *mut $t) {
                if !value.is_null() {
                    drop(Box::from_raw(value));
                }
            }

            /// # Safety
            /// `value` must point at a live value.
            #[no_mangle]
            pub unsafe extern "C" fn $get(value: *const $t) -> $t {
                *value
            }

            /// # Safety
            /// `value` must point at a live value that may be written.
            #[no_mangle]
            pub unsafe extern "C" fn $set(value: *mut $t, new_value: $t) {
                *value = new_value;
            }

            impl BoxValue for $t {
                const SCHEMA: &'static str = $schema;

                fn box_new(value: Self) -> *mut Self {
                    $new(value)
                }

                unsafe fn box_drop(ptr: *mut Self) {
                    $drop(ptr)
                }

                unsafe fn box_get(ptr: *const Self) -> Self {
                    $get(ptr)
                }

                unsafe fn box_set(ptr: *mut Self, value: Self) {
                    $set(ptr, value)
                }
            }
        )+
    };
}

box_values! {
    u8 => "Box_U8" { rsharp__Box_U8__new, rsharp__Box_U8__drop, rsharp__Box_U8__get, rsharp__Box_U8__set }
    u16 => "Box_U16" { rsharp__Box_U16__new, rsharp__Box_U16__drop, rsharp__Box_U16__get, rsharp__Box_U16__set }
    u32 => "Box_U32" { rsharp__Box_U32__new, rsharp__Box_U32__drop, rsharp__Box_U32__get, rsharp__Box_U32__set }
    u64 => "Box_U64" { rsharp__Box_U64__new, rsharp__Box_U64__drop, rsharp__Box_U64__get, rsharp__Box_U64__set }
    i8 => "Box_I8" { rsharp__Box_I8__new, rsharp__Box_I8__drop, rsharp__Box_I8__get, rsharp__Box_I8__set }
    i16 => "Box_I16" { rsharp__Box_I16__new, rsharp__Box_I16__drop, rsharp__Box_I16__get, rsharp__Box_I16__set }
    i32 => "Box_I32" { rsharp__Box_I32__new, rsharp__Box_I32__drop, rsharp__Box_I32__get, rsharp__Box_I32__set }
    i64 => "Box_I64" { rsharp__Box_I64__new, rsharp__Box_I64__drop, rsharp__Box_I64__get, rsharp__Box_I64__set }
    bool => "Box_Bool" { rsharp__Box_Bool__new, rsharp__Box_Bool__drop, rsharp__Box_Bool__get, rsharp__Box_Bool__set }
    f32 => "Box_F32" { rsharp__Box_F32__new, rsharp__Box_F32__drop, rsharp__Box_F32__get, rsharp__Box_F32__set }
    f64 => "Box_F64" { rsharp__Box_F64__new, rsharp__Box_F64__drop, rsharp__Box_F64__get, rsharp__Box_F64__set }
}

/// A boxed string
#[derive(Debug)]
pub struct StringBox {
    value: NativeString,
}

impl StringBox {
    pub fn value(&self) -> &NativeString {
        &self.value
    }
}

impl NativeType for StringBox {
    const NAME: &'static str = "Box_String";

    unsafe fn drop_native(ptr: Ptr<Self>) -> Result<()> {
        rsharp__Box_String__drop(ptr.as_ptr());
        Ok(())
    }
}

/// Move a string into a new box, consuming `value`. Null if `value` is null.
///
/// # Safety
/// `value` must be null or come from one of the string constructors, and
/// not have been freed.
#[no_mangle]
pub unsafe extern "C" fn rsharp__Box_String__new(value: *mut NativeString) -> *mut StringBox {
    if value.is_null() {
        return core::ptr::null_mut();
    }
    let value = *Box::from_raw(value);
    Box::into_raw(Box::new(StringBox { value }))
}

/// Borrow the boxed string. Valid until the box is freed.
///
/// # Safety
/// `boxed` must point at a live box.
#[no_mangle]
pub unsafe extern "C" fn rsharp__Box_String__get(boxed: *const StringBox) -> *const NativeString {
    &(*boxed).value
}

/// # Safety
/// `boxed` must be null or come from `rsharp__Box_String__new`, and not have been freed.
#[no_mangle]
pub unsafe extern "C" fn rsharp__Box_String__drop(boxed: *mut StringBox) {
    if !boxed.is_null() {
        drop(Box::from_raw(boxed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsharp_core::naming;

    #[test]
    fn test_box_round_trip_through_exports() {
        unsafe {
            let ptr = rsharp__Box_I64__new(-7);
            assert_eq!(rsharp__Box_I64__get(ptr), -7);
            rsharp__Box_I64__set(ptr, 42);
            assert_eq!(rsharp__Box_I64__get(ptr), 42);
            rsharp__Box_I64__drop(ptr);

            rsharp__Box_F32__drop(core::ptr::null_mut());
        }
    }

    #[test]
    fn test_string_box_moves_the_string() {
        unsafe {
            let s = NativeString::into_raw("boxed".to_string());
            let boxed = rsharp__Box_String__new(s);
            assert_eq!((*rsharp__Box_String__get(boxed)).as_str(), "boxed");
            assert_eq!((*boxed).value().as_str(), "boxed");
            rsharp__Box_String__drop(boxed);

            assert!(rsharp__Box_String__new(core::ptr::null_mut()).is_null());
            rsharp__Box_String__drop(core::ptr::null_mut());
        }
    }

    #[test]
    fn test_schema_names_follow_symbol_scheme() {
        assert_eq!(<Boxed<bool> as NativeType>::NAME, "Box_Bool");
        assert_eq!(
            naming::symbol(crate::SYMBOL_PATH, <Boxed<u16> as NativeType>::NAME, naming::OP_DROP),
            "rsharp__Box_U16__drop"
        );
    }
}
